//! # wapi-client
//!
//! Client-side core of Wapi Na Lini: the persistent session, the REST API
//! and event-catalog clients, the route table, transient alerts, and the
//! real-time friend chat screen.

pub mod alerts;
pub mod api;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod routes;
pub mod session;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wapi_client=debug,wapi_store=info,warn"));

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
