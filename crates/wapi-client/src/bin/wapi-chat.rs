//! # wapi-chat
//!
//! Terminal chat with one friend on top of the local document store.
//!
//! ```text
//! wapi-chat <peer-id> [--as <user-id>]
//! ```
//!
//! Lines typed on stdin are sent. `/delete <message-id>` soft-deletes one of
//! your messages after a y/n prompt, `/open <alert-id>` follows an alert's
//! link, `/quit` leaves. Alerts disappear after the configured TTL.

use std::io::Write;
use std::time::Instant;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use wapi_client::chat::FeedState;
use wapi_client::config::ClientConfig;
use wapi_client::events::{emit_event, event_channel, EventSender, UiEvent};
use wapi_client::init_logging;
use wapi_client::routes::Route;
use wapi_client::state::AppState;
use wapi_shared::{Message, MessageId, UserId};

fn parse_args() -> anyhow::Result<(UserId, Option<UserId>)> {
    let mut args = std::env::args().skip(1);
    let Some(peer) = args.next() else {
        bail!("usage: wapi-chat <peer-id> [--as <user-id>]");
    };
    let peer = UserId::new(peer).context("invalid peer id")?;

    let me = match (args.next().as_deref(), args.next()) {
        (Some("--as"), Some(id)) => Some(UserId::new(id).context("invalid user id")?),
        (None, _) => None,
        _ => bail!("usage: wapi-chat <peer-id> [--as <user-id>]"),
    };
    Ok((peer, me))
}

fn print_feed(me: &UserId, messages: &[Message]) {
    println!("---");
    for m in messages {
        let who = if &m.sender == me { "you" } else { m.sender.as_str() };
        let ticks = match (m.sender == *me, m.seen) {
            (true, true) => " ✓✓",
            (true, false) => " ✓",
            _ => "",
        };
        println!(
            "[{}] {}: {}{}  ({})",
            m.timestamp.format("%H:%M"),
            who,
            m.content,
            ticks,
            m.id
        );
    }
}

/// Resolves when the next alert is due to expire; never, if none is showing.
async fn next_expiry(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending().await,
    }
}

/// Print unread local notifications for `me`, then mark them read.
fn print_inbox(state: &AppState, me: &UserId) -> anyhow::Result<()> {
    let unread: Vec<_> = state
        .chat_store
        .notifications_for(me)
        .context("failed to read notifications")?
        .into_iter()
        .filter(|n| !n.read)
        .collect();
    if unread.is_empty() {
        return Ok(());
    }

    println!("{} new notification(s):", unread.len());
    for n in unread.iter().rev() {
        println!("  [{}] {}", n.timestamp.format("%d %b %H:%M"), n.text);
    }
    state
        .chat_store
        .mark_notifications_read(me)
        .context("failed to mark notifications read")?;
    Ok(())
}

fn open_alert(state: &AppState, events: &EventSender, raw_id: &str) {
    let Ok(id) = raw_id.trim().parse::<u64>() else {
        println!("Bad alert id");
        return;
    };
    match state.click_alert(id) {
        Some(route) => emit_event(events, UiEvent::Navigate(route)),
        None => println!("No such alert, or nothing to open"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let (peer, me_override) = parse_args()?;
    let config = ClientConfig::from_env();
    let state = AppState::open(config).context("failed to open local database")?;

    let Some(me) = me_override.or_else(|| state.session.user_id()) else {
        bail!("not logged in; pass --as <user-id> to chat as a local user");
    };
    info!(me = %me, peer = %peer, "Starting chat");
    print_inbox(&state, &me)?;

    let (events_tx, mut events_rx) = event_channel();
    let mut screen = wapi_client::chat::ChatScreen::new(
        Some(me.clone()),
        Some(peer),
        state.chat_store.clone(),
        std::sync::Arc::new(state.api.clone()),
        events_tx.clone(),
    );
    screen.mount().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    UiEvent::FeedUpdated { messages, .. } => print_feed(&me, &messages),
                    UiEvent::PeerResolved { name } => println!("Chatting with {name}"),
                    UiEvent::Alert(alert) => {
                        let line = if alert.title.is_empty() {
                            alert.body.clone()
                        } else {
                            format!("{}: {}", alert.title, alert.body)
                        };
                        let id = state.alert(alert);
                        println!("!! [{id}] {line}");
                    }
                    nav @ UiEvent::Navigate(_) => match state.handle_event(nav) {
                        Some(Route::Chat { with }) if screen.peer() == Some(&with) => {
                            println!("Already in this chat");
                        }
                        Some(Route::Chat { with }) => println!("Open it with: wapi-chat {with}"),
                        Some(route) => println!("-> {}", route.path()),
                        None => {}
                    },
                }
            }
            () = next_expiry(state.next_alert_expiry()) => {
                let gone = state.expire_alerts(Instant::now());
                info!(expired = gone, "Alerts expired");
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();

                if line == "/quit" {
                    break;
                }
                if let Some(raw_id) = line.strip_prefix("/open ") {
                    open_alert(&state, &events_tx, raw_id);
                    continue;
                }
                if let Some(raw_id) = line.strip_prefix("/delete ") {
                    let id: MessageId = match raw_id.trim().parse() {
                        Ok(id) => id,
                        Err(e) => {
                            println!("Bad message id: {e}");
                            continue;
                        }
                    };
                    match screen.messages().iter().find(|m| m.id == id) {
                        Some(m) if m.can_be_deleted_by(&me) => {}
                        Some(_) => {
                            println!("You can only delete your own messages");
                            continue;
                        }
                        None => {
                            println!("No such message");
                            continue;
                        }
                    }
                    print!("Delete this message? [y/N] ");
                    std::io::stdout().flush()?;
                    let answer = lines.next_line().await?.unwrap_or_default();
                    let yes = matches!(answer.trim(), "y" | "Y" | "yes");
                    match screen.request_delete(id, &|_: &str| yes).await {
                        Ok(true) => {}
                        Ok(false) => println!("Cancelled"),
                        Err(e) => println!("Could not delete: {e}"),
                    }
                    continue;
                }

                if let Err(e) = screen.send_text(line).await {
                    warn!(error = %e, "Send failed");
                    println!("Message not sent");
                }
            }
        }

        if screen.feed_state() == FeedState::Unsubscribed {
            warn!("Feed ended");
            break;
        }
    }

    screen.unmount().await;
    info!("Chat closed");
    Ok(())
}
