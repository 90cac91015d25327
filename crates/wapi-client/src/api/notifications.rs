use reqwest::Method;
use serde::Deserialize;
use tracing::info;

use super::{flexible_id, ApiClient};
use crate::error::ApiResult;

/// A backend notification as shown on the notifications screen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendNotification {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default, alias = "text")]
    pub message: String,
    #[serde(default)]
    pub sender_id: Option<wapi_shared::UserId>,
    #[serde(default, alias = "read")]
    pub is_read: bool,
    #[serde(default, alias = "timestamp")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl ApiClient {
    pub async fn list_notifications(&self) -> ApiResult<Vec<BackendNotification>> {
        self.require_auth()?;
        self.get_list("notifications/", &[], Some("notifications"))
            .await
    }

    pub async fn mark_all_read(&self) -> ApiResult<()> {
        self.require_auth()?;
        self.send_unit(
            Method::POST,
            "notifications/mark-all-read/",
            Some(&serde_json::json!({})),
        )
        .await?;
        info!("Notifications marked read");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::tests::client;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn notifications_are_listed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "message": "Baraka sent you a friend request", "sender_id": 4, "is_read": false },
                { "id": 2, "text": "Hi", "read": true }
            ])))
            .mount(&server)
            .await;

        let api = client(&server.uri(), true);
        let list = api.list_notifications().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].sender_id.as_ref().map(|u| u.as_str()), Some("4"));
        assert!(list[1].is_read);
        assert_eq!(list[1].message, "Hi");
    }

    #[tokio::test]
    async fn forbidden_mark_all_is_a_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notifications/mark-all-read/"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "detail": "nope" })))
            .mount(&server)
            .await;

        let api = client(&server.uri(), true);
        let err = api.mark_all_read().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert!(err.redirect().is_none());
    }
}
