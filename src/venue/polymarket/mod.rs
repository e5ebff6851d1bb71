//! Polymarket CLOB adapter: REST order operations + WebSocket market data.

mod auth;
mod client;
mod messages;
mod websocket;

pub use auth::ApiCredentials;
pub use client::ClobClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::clock::Clock;
use crate::config::{Credentials, VenueConfig, WebSocketConfig};
use crate::domain::{BookSnapshot, MarketId, MarketInfo, Order, OrderId, OrderRequest};
use crate::error::{Error, Result};

use super::{VenueAdapter, VenueEvent};

/// Taker fee rate charged on fills.
const FEE_RATE: Decimal = dec!(0.02);

/// Polymarket venue adapter.
pub struct PolymarketVenue {
    client: Arc<ClobClient>,
    ws_url: String,
    ws_config: WebSocketConfig,
    clock: Arc<dyn Clock>,
    stop: Mutex<Option<watch::Sender<bool>>>,
}

impl PolymarketVenue {
    pub fn new(
        venue_config: &VenueConfig,
        ws_config: &WebSocketConfig,
        credentials: &Credentials,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let api_credentials = ApiCredentials::from_config(credentials);
        let client = ClobClient::new(
            &venue_config.api_url,
            venue_config.proxy_url.as_deref(),
            api_credentials,
            FEE_RATE,
            clock.clone(),
        )?;

        Ok(Self {
            client: Arc::new(client),
            ws_url: venue_config.ws_url.clone(),
            ws_config: ws_config.clone(),
            clock,
            stop: Mutex::new(None),
        })
    }
}

#[async_trait]
impl VenueAdapter for PolymarketVenue {
    fn venue_name(&self) -> &str {
        "polymarket"
    }

    fn fee_rate(&self) -> Decimal {
        FEE_RATE
    }

    async fn connect(&self) -> Result<()> {
        // REST is connectionless and the market-data task starts on
        // subscribe; nothing to do eagerly.
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(stop) = self.stop.lock().take() {
            let _ = stop.send(true);
        }
        Ok(())
    }

    async fn list_markets(&self, active_only: bool) -> Result<Vec<MarketInfo>> {
        self.client.markets(active_only).await
    }

    async fn market_info(&self, market_id: &MarketId) -> Result<Option<MarketInfo>> {
        self.client.market(market_id).await
    }

    async fn book_snapshot(&self, market_id: &MarketId) -> Result<Option<BookSnapshot>> {
        let Some(info) = self.client.market(market_id).await? else {
            return Ok(None);
        };
        self.client
            .book(&info.yes_token_id, self.clock.now())
            .await
    }

    async fn subscribe(&self, market_ids: &[MarketId]) -> Result<mpsc::Receiver<VenueEvent>> {
        let mut token_ids = Vec::with_capacity(market_ids.len() * 2);
        for market_id in market_ids {
            match self.client.market(market_id).await? {
                Some(info) => {
                    token_ids.push(info.yes_token_id);
                    token_ids.push(info.no_token_id);
                }
                None => warn!(market_id = %market_id, "Skipping unknown market"),
            }
        }
        if token_ids.is_empty() {
            return Err(Error::Venue("no subscribable tokens".into()));
        }

        let (events_tx, events_rx) = mpsc::channel(256);
        let (stop_tx, stop_rx) = watch::channel(false);
        *self.stop.lock() = Some(stop_tx);

        let settings = websocket::StreamSettings {
            ws_url: self.ws_url.clone(),
            heartbeat: Duration::from_secs_f64(self.ws_config.heartbeat_interval),
            reconnect_initial: Duration::from_secs_f64(self.ws_config.reconnect_delay_initial),
            reconnect_max: Duration::from_secs_f64(self.ws_config.reconnect_delay_max),
            backoff_factor: self.ws_config.reconnect_backoff_factor,
            snapshot_on_reconnect: self.ws_config.snapshot_on_reconnect,
        };
        // The task detaches; the stop channel is its lifeline.
        let _stream_task = websocket::spawn(
            settings,
            token_ids,
            self.client.clone(),
            events_tx,
            stop_rx,
            self.clock.clone(),
        );

        Ok(events_rx)
    }

    async fn place_order(&self, request: OrderRequest) -> Result<Order> {
        self.client.place_order(&request).await
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<bool> {
        self.client.cancel_order(order_id).await
    }

    async fn order_status(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.client.order_status(order_id).await
    }
}
