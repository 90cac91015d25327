//! Client-side route table.

use std::fmt;

use serde::Serialize;

use wapi_shared::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Card => "card",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mpesa" => Some(PaymentMethod::Mpesa),
            "card" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every screen the client can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    EventDetail { event_id: String },
    Dashboard,
    FriendProfile,
    Chat { with: UserId },
    Login,
    Register,
    ForgotPassword,
    ResetPassword { uid: String, token: String },
    Payment { method: PaymentMethod, event_id: String },
    Notifications,
    Wishlist,
    AcceptInvite { invite_id: String },
    NotFound,
}

impl Route {
    /// Resolve a URL path. Query strings and trailing slashes are ignored;
    /// anything unknown is [`Route::NotFound`].
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Landing,
            ["event", id] => Route::EventDetail {
                event_id: id.to_string(),
            },
            ["dashboard"] => Route::Dashboard,
            ["friendprofile"] => Route::FriendProfile,
            ["chat", peer] => match UserId::new(*peer) {
                Ok(with) => Route::Chat { with },
                Err(_) => Route::NotFound,
            },
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["forgot-password"] => Route::ForgotPassword,
            ["reset-password", uid, token] => Route::ResetPassword {
                uid: uid.to_string(),
                token: token.to_string(),
            },
            ["payment", method, id] => match PaymentMethod::parse(method) {
                Some(method) => Route::Payment {
                    method,
                    event_id: id.to_string(),
                },
                None => Route::NotFound,
            },
            ["notifications"] => Route::Notifications,
            ["wishlist"] => Route::Wishlist,
            ["invite", id] => Route::AcceptInvite {
                invite_id: id.to_string(),
            },
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::EventDetail { event_id } => format!("/event/{event_id}"),
            Route::Dashboard => "/dashboard".to_string(),
            Route::FriendProfile => "/friendprofile".to_string(),
            Route::Chat { with } => format!("/chat/{with}"),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::ForgotPassword => "/forgot-password".to_string(),
            Route::ResetPassword { uid, token } => format!("/reset-password/{uid}/{token}"),
            Route::Payment { method, event_id } => format!("/payment/{method}/{event_id}"),
            Route::Notifications => "/notifications".to_string(),
            Route::Wishlist => "/wishlist".to_string(),
            Route::AcceptInvite { invite_id } => format!("/invite/{invite_id}"),
            Route::NotFound => "/404".to_string(),
        }
    }

    /// Screens that bounce to login without a session.
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::Dashboard
                | Route::FriendProfile
                | Route::Chat { .. }
                | Route::Notifications
                | Route::Wishlist
                | Route::AcceptInvite { .. }
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
