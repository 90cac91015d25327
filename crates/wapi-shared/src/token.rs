//! Access-token inspection.
//!
//! The backend issues JWTs whose payload carries a `user_id` claim. The
//! client never verifies the signature (the backend does); it only reads the
//! claim to learn who is logged in.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::error::TokenError;
use crate::types::UserId;

#[derive(Deserialize)]
struct Claims {
    user_id: Option<UserId>,
}

/// Extract the `user_id` claim from a JWT without verifying it.
pub fn user_id_from_jwt(token: &str) -> Result<UserId, TokenError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(TokenError::Malformed),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| TokenError::Encoding)?;

    let claims: Claims = serde_json::from_slice(&bytes).map_err(|_| TokenError::Payload)?;
    claims.user_id.ok_or(TokenError::MissingUserId)
}
