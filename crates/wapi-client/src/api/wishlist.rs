use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{flexible_id, ApiClient};
use crate::catalog::EventDetail;
use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    #[serde(alias = "id", deserialize_with = "flexible_id")]
    pub event_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
}

impl From<&EventDetail> for WishlistItem {
    fn from(event: &EventDetail) -> Self {
        Self {
            event_id: event.id.clone(),
            name: event.name.clone(),
            image: event.image.clone().unwrap_or_default(),
            date: event.local_date.clone(),
            time: event.local_time.clone(),
            venue: event.venue.clone(),
        }
    }
}

impl ApiClient {
    pub async fn list_wishlist(&self) -> ApiResult<Vec<WishlistItem>> {
        self.require_auth()?;
        self.get_list("wishlist", &[], Some("wishlist")).await
    }

    pub async fn add_to_wishlist(&self, item: &WishlistItem) -> ApiResult<()> {
        self.require_auth()?;
        self.send_unit(Method::POST, "wishlist/", Some(item)).await?;
        info!(event = %item.event_id, "Added to wishlist");
        Ok(())
    }

    pub async fn remove_from_wishlist(&self, event_id: &str) -> ApiResult<()> {
        self.require_auth()?;
        self.send_unit::<()>(Method::DELETE, &format!("wishlist/{event_id}"), None)
            .await?;
        info!(event = %event_id, "Removed from wishlist");
        Ok(())
    }
}
