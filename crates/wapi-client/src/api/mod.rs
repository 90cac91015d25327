//! REST backend client.
//!
//! Each sub-module adds the endpoints of one domain to [`ApiClient`]. This
//! module owns the plumbing shared by all of them: URL building, bearer
//! authentication from the [`Session`], error classification, and the
//! normalization of loosely shaped list bodies into typed vectors.

pub mod auth;
pub mod friends;
pub mod invitations;
pub mod notifications;
pub mod payments;
pub mod profile;
pub mod wishlist;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::session::Session;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// `backend_url` is the server root; requests go to `{backend_url}/api/...`.
    pub fn new(backend_url: &str, session: Session) -> Self {
        Self::with_http(reqwest::Client::new(), backend_url, session)
    }

    pub fn with_http(http: reqwest::Client, backend_url: &str, session: Session) -> Self {
        Self {
            http,
            base_url: format!("{}/api", backend_url.trim_end_matches('/')),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.session.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fail fast on screens that need a session.
    fn require_auth(&self) -> ApiResult<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::Unauthorized("no access token".into()))
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "api response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body);
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(detail));
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<T> {
        let response = self
            .execute(self.request(Method::GET, path).query(query))
            .await?;
        decode(response).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self
            .execute(self.request(method, path).json(body))
            .await?;
        decode(response).await
    }

    /// Send a request whose response body is irrelevant.
    async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<()> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder).await?;
        Ok(())
    }

    /// GET a list endpoint. Bare arrays, `{ "<key>": [...] }` and paginated
    /// `{ "results": [...] }` bodies are all accepted; anything else yields an
    /// empty list and a warning.
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        wrapper_key: Option<&str>,
    ) -> ApiResult<Vec<T>> {
        let body: Value = self.get_json(path, query).await?;
        Ok(normalize_list(path, body, wrapper_key))
    }
}

/// Ids arrive as numbers from some endpoints and strings from others.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {other}"))),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    // Empty 2xx bodies decode like `null` so `Value` / `Option` targets work.
    let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull the human-readable reason out of an error body.
pub(crate) fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

pub(crate) fn normalize_list<T: DeserializeOwned>(
    endpoint: &str,
    body: Value,
    wrapper_key: Option<&str>,
) -> Vec<T> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let found = wrapper_key
                .into_iter()
                .chain(["results"])
                .find_map(|key| match map.remove(key) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                });
            match found {
                Some(items) => items,
                None => {
                    warn!(endpoint, "Expected a list response, got an object");
                    return Vec::new();
                }
            }
        }
        other => {
            warn!(endpoint, body = %other, "Expected a list response");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(endpoint, error = %e, "Skipping malformed list item");
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use wapi_store::Database;

    use super::*;

    /// Client against `server_uri` with a fresh in-memory session.
    pub(crate) fn client(server_uri: &str, logged_in: bool) -> ApiClient {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let session = Session::open(db).unwrap();
        if logged_in {
            session
                .store_tokens(&crate::session::tests::token_for(1), "refresh")
                .unwrap();
        }
        ApiClient::new(server_uri, session)
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn list_shapes_normalize() {
        let bare: Vec<Item> = normalize_list("x", json!([{ "id": 1 }]), None);
        let wrapped: Vec<Item> =
            normalize_list("x", json!({ "wishlist": [{ "id": 2 }] }), Some("wishlist"));
        let paged: Vec<Item> = normalize_list("x", json!({ "results": [{ "id": 3 }] }), None);
        assert_eq!(bare, vec![Item { id: 1 }]);
        assert_eq!(wrapped, vec![Item { id: 2 }]);
        assert_eq!(paged, vec![Item { id: 3 }]);
    }

    #[test]
    fn unexpected_shapes_become_empty() {
        let obj: Vec<Item> = normalize_list("x", json!({ "detail": "nope" }), Some("wishlist"));
        let null: Vec<Item> = normalize_list("x", Value::Null, None);
        let mixed: Vec<Item> = normalize_list("x", json!([{ "id": 1 }, "junk", { "id": 2 }]), None);
        assert!(obj.is_empty());
        assert!(null.is_empty());
        assert_eq!(mixed, vec![Item { id: 1 }, Item { id: 2 }]);
    }

    #[test]
    fn error_detail_prefers_known_fields() {
        assert_eq!(error_detail(r#"{"detail":"Bad creds"}"#), "Bad creds");
        assert_eq!(error_detail(r#"{"message":"Payment failed"}"#), "Payment failed");
        assert_eq!(error_detail(r#"{"error":"expired"}"#), "expired");
        assert_eq!(error_detail(r#"{"email":["taken"]}"#), r#"{"email":["taken"]}"#);
        assert_eq!(error_detail(" plain "), "plain");
    }
}
