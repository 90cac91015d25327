//! The logged-in user's profile and attended events.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{flexible_id, ApiClient};
use crate::error::ApiResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, alias = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Everything the dashboard screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub profile: Profile,
    pub attended: Vec<AttendedEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttendedEvent {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
}

impl ApiClient {
    /// Fetch the profile and cache its picture URL in the session.
    pub async fn get_profile(&self) -> ApiResult<Profile> {
        self.require_auth()?;
        let profile: Profile = self.get_json("profile/", &[]).await?;
        self.remember_picture(&profile);
        Ok(profile)
    }

    pub async fn update_profile(&self, profile: &Profile) -> ApiResult<Profile> {
        self.require_auth()?;
        let saved: Profile = self.send_json(Method::PUT, "profile/", profile).await?;
        self.remember_picture(&saved);
        Ok(saved)
    }

    pub async fn attended_events(&self) -> ApiResult<Vec<AttendedEvent>> {
        self.require_auth()?;
        self.get_list("attended-events/", &[], None).await
    }

    /// Load the profile and attended events concurrently.
    pub async fn dashboard(&self) -> ApiResult<Dashboard> {
        let (profile, attended) = futures::try_join!(self.get_profile(), self.attended_events())?;
        Ok(Dashboard { profile, attended })
    }

    fn remember_picture(&self, profile: &Profile) {
        if let Some(url) = profile.profile_picture.as_deref() {
            if let Err(e) = self.session.set_profile_picture(url) {
                warn!(error = %e, "Could not cache profile picture");
            }
        }
    }
}
