//! Login, registration and password recovery.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use wapi_shared::UserId;

use super::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::routes::Route;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
}

impl Registration {
    /// Checks that can fail before the backend is involved.
    pub fn validate(&self) -> ApiResult<()> {
        if self.username.trim().is_empty() || self.email.trim().is_empty() {
            return Err(ApiError::Invalid("Username and email are required".into()));
        }
        if self.password != self.confirm_password {
            return Err(ApiError::Invalid("Passwords do not match".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenPair {
    access: Option<String>,
    refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Availability {
    #[serde(default)]
    available: bool,
}

#[derive(Debug, Default, Deserialize)]
struct StatusMessage {
    message: Option<String>,
}

/// Where the user lands after authenticating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub user_id: Option<UserId>,
    pub next: Route,
}

impl ApiClient {
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<AuthOutcome> {
        let pair: Option<TokenPair> = self
            .send_json(Method::POST, "auth/login/", &Credentials { username, password })
            .await?;

        match pair.unwrap_or_default() {
            TokenPair {
                access: Some(access),
                refresh: Some(refresh),
            } => {
                let user_id = self.session.store_tokens(&access, &refresh)?;
                info!(user = ?user_id, "Logged in");
                Ok(AuthOutcome {
                    user_id,
                    next: Route::Dashboard,
                })
            }
            _ => Err(ApiError::Decode("Login failed: Invalid response".into())),
        }
    }

    /// Register and, when the backend hands out tokens straight away, log in.
    /// Otherwise the user is sent to the login screen.
    pub async fn register(&self, registration: &Registration) -> ApiResult<AuthOutcome> {
        registration.validate()?;

        let pair: Option<TokenPair> = self
            .send_json(Method::POST, "register/", registration)
            .await?;

        match pair.unwrap_or_default() {
            TokenPair {
                access: Some(access),
                refresh: Some(refresh),
            } => {
                let user_id = self.session.store_tokens(&access, &refresh)?;
                info!(user = ?user_id, "Registered and logged in");
                Ok(AuthOutcome {
                    user_id,
                    next: Route::Dashboard,
                })
            }
            _ => {
                info!(username = %registration.username, "Registered, login required");
                Ok(AuthOutcome {
                    user_id: None,
                    next: Route::Login,
                })
            }
        }
    }

    pub async fn check_username(&self, username: &str) -> ApiResult<bool> {
        let availability: Availability = self
            .get_json("check-username/", &[("username", username)])
            .await?;
        Ok(availability.available)
    }

    pub async fn check_email(&self, email: &str) -> ApiResult<bool> {
        let availability: Availability =
            self.get_json("check-email/", &[("email", email)]).await?;
        Ok(availability.available)
    }

    /// Ask the backend to mail a reset link. Returns the backend's message.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<String> {
        let reply: Option<StatusMessage> = self
            .send_json(
                Method::POST,
                "forgot-password/",
                &serde_json::json!({ "email": email }),
            )
            .await?;
        Ok(reply
            .and_then(|r| r.message)
            .unwrap_or_else(|| "Check your inbox for a reset link.".to_string()))
    }

    pub async fn reset_password(
        &self,
        uid: &str,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> ApiResult<String> {
        if password != confirm_password {
            return Err(ApiError::Invalid("Passwords do not match".into()));
        }

        let reply: Option<StatusMessage> = self
            .send_json(
                Method::POST,
                &format!("reset-password/{uid}/{token}/"),
                &serde_json::json!({ "password": password }),
            )
            .await?;
        Ok(reply
            .and_then(|r| r.message)
            .unwrap_or_else(|| "Password reset successful.".to_string()))
    }

    /// Drop the local session. The backend keeps no session state to revoke.
    pub fn logout(&self) -> Route {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session on logout");
        }
        Route::Login
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::tests::client;
    use crate::error::ErrorKind;
    use crate::session::tests::token_for;

    #[tokio::test]
    async fn login_stores_tokens_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .and(body_json(json!({ "username": "amina", "password": "pw" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access": token_for(7), "refresh": "r" })),
            )
            .mount(&server)
            .await;

        let api = client(&server.uri(), false);
        let outcome = api.login("amina", "pw").await.unwrap();

        assert_eq!(outcome.next, Route::Dashboard);
        assert_eq!(outcome.user_id.unwrap().as_str(), "7");
        assert_eq!(api.session().refresh_token().as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn login_rejected_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "detail": "No active account found" })),
            )
            .mount(&server)
            .await;

        let api = client(&server.uri(), false);
        let err = api.login("amina", "bad").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(!api.session().is_authenticated());
    }

    #[tokio::test]
    async fn login_without_tokens_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let api = client(&server.uri(), false);
        let err = api.login("amina", "pw").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn register_without_tokens_goes_to_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register/"))
            .and(body_json(json!({ "username": "u", "email": "e@x.io", "password": "p" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 3 })))
            .mount(&server)
            .await;

        let api = client(&server.uri(), false);
        let outcome = api
            .register(&Registration {
                username: "u".into(),
                email: "e@x.io".into(),
                password: "p".into(),
                confirm_password: "p".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.next, Route::Login);
        assert!(!api.session().is_authenticated());
    }

    #[tokio::test]
    async fn register_checks_passwords_locally() {
        let api = client("http://127.0.0.1:9", false);
        let err = api
            .register(&Registration {
                username: "u".into(),
                email: "e@x.io".into(),
                password: "p".into(),
                confirm_password: "q".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[tokio::test]
    async fn availability_checks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/check-username/"))
            .and(query_param("username", "taken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "available": false })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/check-email/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "available": true })))
            .mount(&server)
            .await;

        let api = client(&server.uri(), false);
        assert!(!api.check_username("taken").await.unwrap());
        assert!(api.check_email("new@x.io").await.unwrap());
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let api = client("http://127.0.0.1:9", true);
        assert!(api.session().is_authenticated());
        assert_eq!(api.logout(), Route::Login);
        assert!(!api.session().is_authenticated());
    }
}
