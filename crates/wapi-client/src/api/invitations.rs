use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{flexible_id, ApiClient};
use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Invitation {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Invitation {
    pub fn sender_label(&self) -> &str {
        self.sender_name.as_deref().unwrap_or("Unknown")
    }

    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("Pending")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteAction {
    Accept,
    Ignore,
}

#[derive(Serialize)]
struct ActionBody {
    action: InviteAction,
}

impl ApiClient {
    pub async fn get_invitation(&self, id: &str) -> ApiResult<Invitation> {
        self.require_auth()?;
        self.get_json(&format!("invitations/{id}/"), &[]).await
    }

    pub async fn accept_invitation(&self, id: &str) -> ApiResult<Invitation> {
        self.respond_to_invitation(id, InviteAction::Accept).await
    }

    pub async fn ignore_invitation(&self, id: &str) -> ApiResult<Invitation> {
        self.respond_to_invitation(id, InviteAction::Ignore).await
    }

    async fn respond_to_invitation(&self, id: &str, action: InviteAction) -> ApiResult<Invitation> {
        self.require_auth()?;
        let updated: Invitation = self
            .send_json(
                Method::PATCH,
                &format!("invitations/{id}/"),
                &ActionBody { action },
            )
            .await?;
        info!(invite = %id, ?action, "Invitation answered");
        Ok(updated)
    }
}
