pub mod auth;
pub mod cache;
pub mod config;
pub mod dates;
pub mod error;
pub mod flows;
pub mod http;
pub mod images;
pub mod meals;
pub mod reports;
pub mod state;
pub mod storage;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, Fetch};
