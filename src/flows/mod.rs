//! Screen view-models. Each flow reads through `AppState` and never sees
//! transport details, only `ApiError` messages.

pub mod add_meal;
pub mod auth;
pub mod home;
pub mod reports;
pub mod startup;

use thiserror::Error;

use crate::error::ApiError;

/// Screen the app should show next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Splash,
    Login,
    Register,
    Onboarding,
    Home,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}

impl FlowError {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            FlowError::Api(e) => Some(e),
            FlowError::InvalidTransition { .. } => None,
        }
    }
}
