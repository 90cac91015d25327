use thiserror::Error;

use wapi_store::StoreError;

use crate::routes::Route;

/// Failure of a call to the REST backend or the event catalog.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server responded {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Session storage error: {0}")]
    Session(#[from] StoreError),
}

/// How a screen should react to a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or expired token: send the user to the login screen.
    Auth,
    /// The request never got a usable answer.
    Transport,
    /// The backend answered with an error status.
    Rejected,
    /// The body did not have the expected shape.
    Malformed,
    /// Caught before any request was made.
    Input,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized(_) => ErrorKind::Auth,
            ApiError::Network(e) if e.is_decode() => ErrorKind::Malformed,
            ApiError::Network(_) | ApiError::Session(_) => ErrorKind::Transport,
            ApiError::Status { .. } => ErrorKind::Rejected,
            ApiError::Decode(_) => ErrorKind::Malformed,
            ApiError::Invalid(_) => ErrorKind::Input,
        }
    }

    /// Where to navigate after this error, if anywhere.
    pub fn redirect(&self) -> Option<Route> {
        match self.kind() {
            ErrorKind::Auth => Some(Route::Login),
            _ => None,
        }
    }

    /// Message suitable for an inline error or a toast.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Unauthorized(_) => "Your session expired. Please log in again.".to_string(),
            ApiError::Status { detail, .. } if !detail.is_empty() => detail.clone(),
            ApiError::Invalid(reason) => reason.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure of a chat operation.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Chat store error: {0}")]
    Store(#[from] StoreError),

    #[error("Only the sender can delete this message")]
    NotDeletable,

    #[error("Message not found in the current feed")]
    UnknownMessage,
}
