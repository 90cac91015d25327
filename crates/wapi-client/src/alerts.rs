//! Transient, dismissable alerts ("toasts").
//!
//! Screens never own toasts directly: they emit an [`AlertRequest`] and the
//! [`Toaster`] keeps the visible stack, expiring entries after a fixed TTL.

use std::time::{Duration, Instant};

use serde::Serialize;

use wapi_shared::constants::ALERT_TTL_SECS;

use crate::routes::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertLevel {
    Info,
    Success,
    Error,
    /// An incoming chat message.
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRequest {
    pub level: AlertLevel,
    pub title: String,
    pub body: String,
    /// Where clicking the alert navigates.
    pub link: Option<Route>,
}

impl AlertRequest {
    pub fn info(body: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Info,
            title: String::new(),
            body: body.into(),
            link: None,
        }
    }

    pub fn success(body: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Success,
            ..Self::info(body)
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Error,
            ..Self::info(body)
        }
    }

    pub fn message(sender_name: impl Into<String>, content: impl Into<String>, link: Route) -> Self {
        Self {
            level: AlertLevel::Message,
            title: sender_name.into(),
            body: content.into(),
            link: Some(link),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub request: AlertRequest,
    pub expires_at: Instant,
}

/// Visible alert stack, oldest first.
#[derive(Debug)]
pub struct Toaster {
    ttl: Duration,
    next_id: u64,
    toasts: Vec<Toast>,
}

impl Default for Toaster {
    fn default() -> Self {
        Self::new(Duration::from_secs(ALERT_TTL_SECS))
    }
}

impl Toaster {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            toasts: Vec::new(),
        }
    }

    pub fn push(&mut self, request: AlertRequest, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            request,
            expires_at: now + self.ttl,
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    /// Dismiss the toast and return where it links to.
    pub fn click(&mut self, id: u64) -> Option<Route> {
        let idx = self.toasts.iter().position(|t| t.id == id)?;
        self.toasts.remove(idx).request.link
    }

    /// Drop every toast whose TTL has elapsed. Returns how many went away.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.expires_at > now);
        before - self.toasts.len()
    }

    pub fn active(&self) -> &[Toast] {
        &self.toasts
    }

    /// When the next toast expires, for scheduling a wake-up.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.toasts.iter().map(|t| t.expires_at).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wapi_shared::UserId;

    #[test]
    fn toasts_expire_after_ttl() {
        let mut toaster = Toaster::new(Duration::from_secs(6));
        let t0 = Instant::now();
        toaster.push(AlertRequest::info("a"), t0);
        toaster.push(AlertRequest::info("b"), t0 + Duration::from_secs(3));

        assert_eq!(toaster.expire(t0 + Duration::from_secs(5)), 0);
        assert_eq!(toaster.expire(t0 + Duration::from_secs(6)), 1);
        assert_eq!(toaster.active().len(), 1);
        assert_eq!(toaster.active()[0].request.body, "b");
        assert_eq!(toaster.next_expiry(), Some(t0 + Duration::from_secs(9)));
    }

    #[test]
    fn dismiss_and_click() {
        let mut toaster = Toaster::default();
        let now = Instant::now();
        let chat = Route::Chat {
            with: UserId::new("2").unwrap(),
        };
        let a = toaster.push(AlertRequest::message("Amina", "hi", chat.clone()), now);
        let b = toaster.push(AlertRequest::error("failed"), now);

        assert_eq!(toaster.click(a), Some(chat));
        assert!(toaster.dismiss(b));
        assert!(!toaster.dismiss(b));
        assert!(toaster.active().is_empty());
        assert_eq!(toaster.click(a), None);
    }
}
