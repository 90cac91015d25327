//! Persistent session state.
//!
//! The [`Session`] is the only component that touches the `session` table.
//! Values are loaded once when the session is opened and every change is
//! written through, so reads never hit the database.

use std::sync::{Arc, Mutex, RwLock};

use tracing::{info, warn};

use wapi_shared::token::user_id_from_jwt;
use wapi_shared::UserId;
use wapi_store::{Database, StoreError};

const KEY_ACCESS_TOKEN: &str = "access_token";
const KEY_REFRESH_TOKEN: &str = "refresh_token";
const KEY_USER_ID: &str = "userId";
const KEY_PROFILE_PICTURE: &str = "profilePicture";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SessionValues {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user_id: Option<UserId>,
    profile_picture: Option<String>,
}

/// Cheap-to-clone handle on the logged-in user's persisted session.
#[derive(Clone)]
pub struct Session {
    db: Arc<Mutex<Database>>,
    values: Arc<RwLock<SessionValues>>,
}

impl Session {
    /// Load the stored session from `db`.
    pub fn open(db: Arc<Mutex<Database>>) -> Result<Self, StoreError> {
        let stored = db.lock().map_err(|_| StoreError::LockPoisoned)?.session_values()?;

        let user_id = stored.get(KEY_USER_ID).and_then(|raw| match UserId::new(raw.as_str()) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable stored user id");
                None
            }
        });

        let values = SessionValues {
            access_token: stored.get(KEY_ACCESS_TOKEN).cloned(),
            refresh_token: stored.get(KEY_REFRESH_TOKEN).cloned(),
            user_id,
            profile_picture: stored.get(KEY_PROFILE_PICTURE).cloned(),
        };

        Ok(Self {
            db,
            values: Arc::new(RwLock::new(values)),
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(|v| v.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(|v| v.refresh_token.clone())
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.read(|v| v.user_id.clone())
    }

    pub fn profile_picture(&self) -> Option<String> {
        self.read(|v| v.profile_picture.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|v| v.access_token.is_some())
    }

    /// Persist a fresh token pair and derive the user id from the access
    /// token. A token without a readable `user_id` claim is still stored.
    pub fn store_tokens(&self, access: &str, refresh: &str) -> Result<Option<UserId>, StoreError> {
        let user_id = match user_id_from_jwt(access) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Could not extract userId from token");
                None
            }
        };

        {
            let db = self.lock_db()?;
            db.set_session_value(KEY_ACCESS_TOKEN, access)?;
            db.set_session_value(KEY_REFRESH_TOKEN, refresh)?;
            match &user_id {
                Some(id) => db.set_session_value(KEY_USER_ID, id.as_str())?,
                None => {
                    db.remove_session_value(KEY_USER_ID)?;
                }
            }
        }

        self.write(|v| {
            v.access_token = Some(access.to_string());
            v.refresh_token = Some(refresh.to_string());
            v.user_id = user_id.clone();
        });

        info!(user = ?user_id.as_ref().map(UserId::as_str), "Session tokens stored");
        Ok(user_id)
    }

    pub fn set_profile_picture(&self, url: &str) -> Result<(), StoreError> {
        self.lock_db()?.set_session_value(KEY_PROFILE_PICTURE, url)?;
        self.write(|v| v.profile_picture = Some(url.to_string()));
        Ok(())
    }

    /// Forget everything (logout).
    pub fn clear(&self) -> Result<(), StoreError> {
        let removed = self.lock_db()?.clear_session()?;
        self.write(|v| *v = SessionValues::default());
        info!(removed, "Session cleared");
        Ok(())
    }

    fn lock_db(&self) -> Result<std::sync::MutexGuard<'_, Database>, StoreError> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn read<T>(&self, f: impl FnOnce(&SessionValues) -> T) -> T {
        match self.values.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write(&self, f: impl FnOnce(&mut SessionValues)) {
        match self.values.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("user_id", &self.user_id())
            .finish()
    }
}
