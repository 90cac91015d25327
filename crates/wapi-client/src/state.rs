//! Application state shared by every screen.
//!
//! [`AppState`] owns the single database handle and hands clones of it to
//! the session and the chat document store, so logout and chat history live
//! in the same file.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::info;

use wapi_shared::UserId;
use wapi_store::{Database, LocalDocumentStore, StoreError};

use crate::alerts::{AlertRequest, Toaster};
use crate::api::ApiClient;
use crate::catalog::{CatalogClient, EventQuery};
use crate::chat::ChatScreen;
use crate::config::ClientConfig;
use crate::events::{EventSender, UiEvent};
use crate::routes::Route;
use crate::session::Session;

pub type LocalChatScreen = ChatScreen<LocalDocumentStore, ApiClient>;

/// Central application state.
pub struct AppState {
    pub config: ClientConfig,

    /// Shared local database (session table, chat documents, notifications).
    pub database: Arc<Mutex<Database>>,

    /// Persisted tokens and user id.
    pub session: Session,

    /// REST backend client, authenticated from `session`.
    pub api: ApiClient,

    /// Event catalog client.
    pub catalog: CatalogClient,

    /// Real-time chat document store.
    pub chat_store: Arc<LocalDocumentStore>,

    /// Visible transient alerts.
    pub toaster: Mutex<Toaster>,
}

impl AppState {
    /// Open the database named by `config` (or the platform default) and
    /// build every client on top of it.
    pub fn open(config: ClientConfig) -> Result<Self, StoreError> {
        let db = match &config.data_dir {
            Some(dir) => Database::open_at(&dir.join("wapi.db"))?,
            None => Database::new()?,
        };
        Self::with_database(config, db)
    }

    pub fn with_database(config: ClientConfig, db: Database) -> Result<Self, StoreError> {
        let database = Arc::new(Mutex::new(db));
        let session = Session::open(database.clone())?;
        let api = ApiClient::new(&config.backend_url, session.clone());
        let catalog = CatalogClient::new(&config);
        let chat_store = Arc::new(LocalDocumentStore::with_shared(database.clone()));
        let toaster = Mutex::new(Toaster::new(config.alert_ttl));

        info!(
            backend = %config.backend_url,
            logged_in = session.is_authenticated(),
            "Client state ready"
        );

        Ok(Self {
            config,
            database,
            session,
            api,
            catalog,
            chat_store,
            toaster,
        })
    }

    /// Where navigating to `route` actually lands: protected screens send
    /// anonymous users to the login screen.
    pub fn guard(&self, route: Route) -> Route {
        if route.requires_auth() && !self.session.is_authenticated() {
            Route::Login
        } else {
            route
        }
    }

    /// First landing-page query, sized from the configuration.
    pub fn event_query(&self) -> EventQuery {
        EventQuery::new(self.config.page_size)
    }

    /// A chat screen with `peer` for the logged-in user.
    pub fn chat_screen(&self, peer: Option<UserId>, events: EventSender) -> LocalChatScreen {
        ChatScreen::new(
            self.session.user_id(),
            peer,
            self.chat_store.clone(),
            Arc::new(self.api.clone()),
            events,
        )
    }

    fn lock_toaster(&self) -> MutexGuard<'_, Toaster> {
        self.toaster.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show an alert. Returns its toast id.
    ///
    /// Toasts whose TTL has already run out are dropped first, so the stack
    /// stays bounded even if nobody drives [`expire_alerts`](Self::expire_alerts).
    pub fn alert(&self, request: AlertRequest) -> u64 {
        let now = Instant::now();
        let mut toaster = self.lock_toaster();
        toaster.expire(now);
        toaster.push(request, now)
    }

    /// Drop expired toasts. Returns how many went away.
    pub fn expire_alerts(&self, now: Instant) -> usize {
        self.lock_toaster().expire(now)
    }

    /// When the oldest visible toast expires.
    pub fn next_alert_expiry(&self) -> Option<Instant> {
        self.lock_toaster().next_expiry()
    }

    /// Number of toasts still on screen.
    pub fn visible_alerts(&self) -> usize {
        self.lock_toaster().active().len()
    }

    /// Click a toast: it is dismissed, and its link (if any) is returned
    /// after the auth guard.
    pub fn click_alert(&self, id: u64) -> Option<Route> {
        let link = self.lock_toaster().click(id)?;
        let route = self.guard(link);
        info!(toast = id, route = %route, "Alert clicked");
        Some(route)
    }

    /// Apply a UI event to shared state. Returns the route to navigate to,
    /// if the event asks for one.
    pub fn handle_event(&self, event: UiEvent) -> Option<Route> {
        match event {
            UiEvent::Alert(request) => {
                self.alert(request);
                None
            }
            UiEvent::Navigate(route) => Some(self.guard(route)),
            UiEvent::FeedUpdated { .. } | UiEvent::PeerResolved { .. } => None,
        }
    }
}
