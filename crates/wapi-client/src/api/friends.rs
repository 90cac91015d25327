//! Friends, user search and friend requests.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use wapi_shared::UserId;

use super::{flexible_id, ApiClient};
use crate::chat::peer::PeerDirectory;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserSummary {
    /// Name to show: the display name, else the username.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.username.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FriendRequest {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub sender: UserSummary,
    pub receiver: UserSummary,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FriendEvent {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub venue: String,
}

#[derive(Serialize)]
struct SenderRef<'a> {
    sender_id: &'a UserId,
}

impl ApiClient {
    pub async fn list_friends(&self) -> ApiResult<Vec<UserSummary>> {
        self.require_auth()?;
        self.get_list("friends/", &[], None).await
    }

    pub async fn get_friend(&self, id: &UserId) -> ApiResult<UserSummary> {
        self.require_auth()?;
        self.get_json(&format!("friends/{id}/"), &[]).await
    }

    /// Unfriend, then return the refreshed friend list.
    pub async fn remove_friend(&self, id: &UserId) -> ApiResult<Vec<UserSummary>> {
        self.require_auth()?;
        self.send_unit::<()>(Method::DELETE, &format!("friends/{id}/"), None)
            .await?;
        info!(friend = %id, "Friend removed");
        self.list_friends().await
    }

    /// Users matching `query`. A blank query returns nothing without a
    /// request.
    pub async fn search_users(&self, query: &str) -> ApiResult<Vec<UserSummary>> {
        self.require_auth()?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.get_list("users/search/", &[("q", query)], None).await
    }

    pub async fn friend_events(&self) -> ApiResult<Vec<FriendEvent>> {
        self.require_auth()?;
        self.get_list("friend-events/", &[], None).await
    }

    pub async fn list_friend_requests(&self) -> ApiResult<Vec<FriendRequest>> {
        self.require_auth()?;
        self.get_list("friend-requests/", &[], None).await
    }

    /// Receivers of the pending requests `me` has sent.
    pub async fn pending_sent_requests(&self, me: &UserId) -> ApiResult<Vec<UserId>> {
        Ok(self
            .list_friend_requests()
            .await?
            .into_iter()
            .filter(|r| &r.sender.id == me && r.status == RequestStatus::Pending)
            .map(|r| r.receiver.id)
            .collect())
    }

    pub async fn send_friend_request(&self, receiver: &UserId) -> ApiResult<()> {
        self.require_auth()?;
        self.send_unit(
            Method::POST,
            "friend-requests/",
            Some(&serde_json::json!({ "receiver": receiver })),
        )
        .await?;
        info!(receiver = %receiver, "Friend request sent");
        Ok(())
    }

    pub async fn cancel_friend_request(&self, receiver: &UserId) -> ApiResult<()> {
        self.require_auth()?;
        self.send_unit::<()>(Method::DELETE, &format!("friend-requests/{receiver}/"), None)
            .await?;
        info!(receiver = %receiver, "Friend request cancelled");
        Ok(())
    }

    pub async fn accept_friend_request(&self, sender: &UserId) -> ApiResult<()> {
        self.require_auth()?;
        self.send_unit(
            Method::POST,
            "friend-requests/accept/",
            Some(&SenderRef { sender_id: sender }),
        )
        .await
    }

    pub async fn reject_friend_request(&self, sender: &UserId) -> ApiResult<()> {
        self.require_auth()?;
        self.send_unit(
            Method::POST,
            "friend-requests/reject/",
            Some(&SenderRef { sender_id: sender }),
        )
        .await
    }
}

#[async_trait]
impl PeerDirectory for ApiClient {
    async fn display_name(&self, peer: &UserId) -> Result<String, ApiError> {
        let friend = self.get_friend(peer).await?;
        friend
            .display_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Decode("friend has no name".into()))
    }
}
