pub mod dto;
pub mod services;
pub mod session;
