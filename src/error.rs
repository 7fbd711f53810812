use thiserror::Error;

pub const TIMEOUT_MESSAGE: &str = "Request timeout: The server took too long to respond";
pub const NETWORK_MESSAGE: &str = "Network error: unable to reach the server";
pub const UNKNOWN_MESSAGE: &str = "An unknown error occurred";

/// Every failure of the data-access layer, normalized.
///
/// `Display` is the text shown to the user; callers above the request layer
/// never look at transport details.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("Request timeout: The server took too long to respond")]
    Timeout,
    #[error("Network error: unable to reach the server")]
    Network(String),
    #[error("An unknown error occurred")]
    Unknown,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() || e.is_body() {
            ApiError::Unknown
        } else if e.is_connect() || e.is_request() {
            ApiError::Network(e.to_string())
        } else {
            ApiError::Unknown
        }
    }
}

/// Error body the API sends with non-2xx responses.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
}
