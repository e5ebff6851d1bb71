//! Polymarket market-data stream.
//!
//! One task owns the WebSocket for the lifetime of a run: connect, subscribe,
//! forward book events, answer pings, and reconnect with exponential backoff
//! when the connection drops. Every lost connection surfaces as a
//! [`VenueEvent::Disconnected`] so the pipeline can count it against the
//! kill-switch budget. After a reconnect the stream resubscribes and, when
//! configured, reseeds the books over REST.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::domain::TokenId;
use crate::venue::VenueEvent;

use super::client::ClobClient;
use super::messages::{SubscribeMessage, WsMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Stream settings derived from the websocket config section.
pub(super) struct StreamSettings {
    pub ws_url: String,
    pub heartbeat: Duration,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    pub backoff_factor: f64,
    pub snapshot_on_reconnect: bool,
}

/// Spawn the market-data task. It runs until `stop` flips to true or the
/// event receiver is dropped.
pub(super) fn spawn(
    settings: StreamSettings,
    token_ids: Vec<TokenId>,
    client: Arc<ClobClient>,
    events: mpsc::Sender<VenueEvent>,
    stop: watch::Receiver<bool>,
    clock: Arc<dyn Clock>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(settings, token_ids, client, events, stop, clock))
}

async fn run(
    settings: StreamSettings,
    token_ids: Vec<TokenId>,
    client: Arc<ClobClient>,
    events: mpsc::Sender<VenueEvent>,
    mut stop: watch::Receiver<bool>,
    clock: Arc<dyn Clock>,
) {
    let mut attempt: u32 = 0;
    let mut delay = settings.reconnect_initial;

    loop {
        if *stop.borrow() {
            break;
        }

        match connect_async(&settings.ws_url).await {
            Ok((mut ws, response)) => {
                info!(status = %response.status(), "WebSocket connected");
                delay = settings.reconnect_initial;

                if attempt > 0 && settings.snapshot_on_reconnect {
                    reseed(&client, &token_ids, &events, clock.as_ref()).await;
                }

                if let Err(e) = subscribe(&mut ws, &token_ids).await {
                    warn!(error = %e, "Subscription failed");
                } else if read_until_close(&mut ws, &events, &mut stop, &settings, clock.as_ref())
                    .await
                {
                    // Clean shutdown requested.
                    let _ = ws.close(None).await;
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "WebSocket connection failed");
            }
        }

        if *stop.borrow() {
            break;
        }

        attempt += 1;
        if events
            .send(VenueEvent::Disconnected { attempt })
            .await
            .is_err()
        {
            // Pipeline is gone; nothing left to stream to.
            break;
        }

        info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
        tokio::select! {
            () = sleep(delay) => {}
            _ = stop.changed() => break,
        }
        delay = Duration::from_secs_f64(
            (delay.as_secs_f64() * settings.backoff_factor).min(settings.reconnect_max.as_secs_f64()),
        );
    }

    debug!("Market-data task stopped");
}

async fn subscribe(
    ws: &mut WsStream,
    token_ids: &[TokenId],
) -> crate::error::Result<()> {
    let msg = SubscribeMessage::new(token_ids.iter().map(ToString::to_string).collect());
    let json = serde_json::to_string(&msg)?;
    info!(tokens = token_ids.len(), "Subscribing to tokens");
    ws.send(Message::Text(json)).await?;
    Ok(())
}

/// Read messages until the connection dies or shutdown is requested.
/// Returns true on requested shutdown, false on connection loss.
async fn read_until_close(
    ws: &mut WsStream,
    events: &mpsc::Sender<VenueEvent>,
    stop: &mut watch::Receiver<bool>,
    settings: &StreamSettings,
    clock: &dyn Clock,
) -> bool {
    let mut heartbeat = tokio::time::interval(settings.heartbeat);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = stop.changed() => return true,
            _ = heartbeat.tick() => {
                if let Err(e) = ws.send(Message::Ping(Vec::new())).await {
                    warn!(error = %e, "Heartbeat failed");
                    return false;
                }
            }
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&text, events, clock).await;
                }
                Some(Ok(Message::Ping(payload))) => {
                    if ws.send(Message::Pong(payload)).await.is_err() {
                        return false;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "Server closed connection");
                    return false;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read error");
                    return false;
                }
                None => {
                    info!("WebSocket stream ended");
                    return false;
                }
            }
        }
    }
}

async fn handle_text(text: &str, events: &mpsc::Sender<VenueEvent>, clock: &dyn Clock) {
    // Malformed messages are dropped, never fatal.
    let parsed: Result<WsMessage, _> = serde_json::from_str(text);
    match parsed {
        Ok(WsMessage::Book(book)) => {
            let snapshot = book.into_snapshot(clock.now());
            if events.send(VenueEvent::Book(snapshot)).await.is_err() {
                debug!("Event receiver dropped");
            }
        }
        // Price-change deltas carry no sizes worth trusting for depth
        // gating; the next book event supersedes them.
        Ok(WsMessage::PriceChange(_) | WsMessage::LastTradePrice(_)) => {}
        Ok(WsMessage::TickSizeChange(_) | WsMessage::Unknown) => {}
        Err(e) => {
            let preview = text.get(..text.len().min(120)).unwrap_or(text);
            warn!(error = %e, raw = preview, "Malformed message dropped");
        }
    }
}

async fn reseed(
    client: &ClobClient,
    token_ids: &[TokenId],
    events: &mpsc::Sender<VenueEvent>,
    clock: &dyn Clock,
) {
    for token_id in token_ids {
        match client.book(token_id, clock.now()).await {
            Ok(Some(snapshot)) => {
                if events.send(VenueEvent::Book(snapshot)).await.is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(token_id = %token_id, error = %e, "Reseed fetch failed"),
        }
    }
}
