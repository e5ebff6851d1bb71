//! Polymarket WebSocket message types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{BookLevel, BookSnapshot, MarketId, TokenId};

/// Subscription request sent to the market channel.
#[derive(Debug, Serialize)]
pub struct SubscribeMessage {
    pub assets_ids: Vec<String>,
    #[serde(rename = "type")]
    pub msg_type: String,
}

impl SubscribeMessage {
    #[must_use]
    pub fn new(asset_ids: Vec<String>) -> Self {
        Self {
            assets_ids: asset_ids,
            msg_type: "market".into(),
        }
    }
}

/// Messages received from the market channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "event_type")]
pub enum WsMessage {
    #[serde(rename = "book")]
    Book(BookMessage),

    #[serde(rename = "price_change")]
    PriceChange(serde_json::Value),

    #[serde(rename = "last_trade_price")]
    LastTradePrice(serde_json::Value),

    #[serde(rename = "tick_size_change")]
    TickSizeChange(serde_json::Value),

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct BookMessage {
    pub asset_id: String,
    pub market: Option<String>,
    pub bids: Vec<WsPriceLevel>,
    pub asks: Vec<WsPriceLevel>,
    /// Milliseconds since the epoch, as a string.
    pub timestamp: Option<String>,
    pub hash: Option<String>,
}

/// Price level as received from the wire (strings, not decimals).
#[derive(Debug, Clone, Deserialize)]
pub struct WsPriceLevel {
    pub price: String,
    pub size: String,
}

impl BookMessage {
    /// Convert a wire book into a domain snapshot.
    ///
    /// Unparseable levels are dropped with a warning; `fallback_now` stands
    /// in when the message carries no usable timestamp. The venue does not
    /// guarantee a monotonic sequence, so none is attached.
    #[must_use]
    pub fn into_snapshot(self, fallback_now: DateTime<Utc>) -> BookSnapshot {
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or(fallback_now);

        BookSnapshot {
            market_id: self.market.map(MarketId::new),
            token_id: TokenId::new(self.asset_id),
            bids: parse_levels(&self.bids),
            asks: parse_levels(&self.asks),
            timestamp,
            sequence: None,
        }
    }
}

fn parse_levels(levels: &[WsPriceLevel]) -> Vec<BookLevel> {
    levels
        .iter()
        .filter_map(|level| {
            let price = level.price.parse().ok();
            let size = level.size.parse().ok();
            match (price, size) {
                (Some(price), Some(size)) => Some(BookLevel::new(price, size)),
                _ => {
                    warn!(price = %level.price, size = %level.size, "Dropping unparseable level");
                    None
                }
            }
        })
        .collect()
}
