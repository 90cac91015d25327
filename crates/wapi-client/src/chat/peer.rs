use async_trait::async_trait;
use tracing::{debug, warn};

use wapi_shared::constants::FALLBACK_PEER_NAME;
use wapi_shared::UserId;

use crate::error::ApiError;

/// Looks up how a chat counterpart should be addressed.
#[async_trait]
pub trait PeerDirectory: Send + Sync + 'static {
    async fn display_name(&self, peer: &UserId) -> Result<String, ApiError>;
}

/// Resolve `peer`'s display name. Never fails: any error, or a blank name,
/// yields the fallback name.
pub async fn resolve_peer_name<P: PeerDirectory + ?Sized>(directory: &P, peer: &UserId) -> String {
    match directory.display_name(peer).await {
        Ok(name) if !name.trim().is_empty() => {
            debug!(peer = %peer, name = %name, "Peer resolved");
            name
        }
        Ok(_) => FALLBACK_PEER_NAME.to_string(),
        Err(e) => {
            warn!(peer = %peer, error = %e, "Peer lookup failed");
            FALLBACK_PEER_NAME.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<&'static str, u16>);

    #[async_trait]
    impl PeerDirectory for Fixed {
        async fn display_name(&self, _peer: &UserId) -> Result<String, ApiError> {
            self.0.map(str::to_string).map_err(|status| ApiError::Status {
                status,
                detail: String::new(),
            })
        }
    }

    fn peer() -> UserId {
        UserId::new("2").unwrap()
    }

    #[tokio::test]
    async fn name_is_used_when_found() {
        assert_eq!(resolve_peer_name(&Fixed(Ok("Baraka")), &peer()).await, "Baraka");
    }

    #[tokio::test]
    async fn failures_and_blanks_fall_back() {
        assert_eq!(resolve_peer_name(&Fixed(Err(500)), &peer()).await, "Friend");
        assert_eq!(resolve_peer_name(&Fixed(Ok("  ")), &peer()).await, "Friend");
    }
}
