use thiserror::Error;

#[derive(Error, Debug)]
pub enum WapiError {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is not a three-part JWT")]
    Malformed,

    #[error("Token payload is not valid base64")]
    Encoding,

    #[error("Token payload is not valid JSON")]
    Payload,

    #[error("Token payload has no user_id claim")]
    MissingUserId,
}
