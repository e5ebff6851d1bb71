//! Venue adapters: the boundary between the engine and an exchange.
//!
//! The core consumes a [`VenueAdapter`]: market metadata and order
//! operations over request/response calls, plus a single event stream
//! carrying book snapshots, fills and disconnect notices. Adapters talk to
//! the pipeline through that channel only; nothing in the core calls back
//! into an adapter from the stream.

pub mod mock;
pub mod polymarket;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::domain::{BookSnapshot, Fill, MarketId, MarketInfo, Order, OrderId, OrderRequest};
use crate::error::Result;

pub use mock::{MockVenue, OrderScript};
pub use polymarket::PolymarketVenue;

/// Events a venue pushes into the pipeline.
#[derive(Debug, Clone)]
pub enum VenueEvent {
    /// Order book update for one token.
    Book(BookSnapshot),
    /// Execution report for one of our orders.
    Fill(Fill),
    /// The market-data connection dropped; the adapter is reconnecting.
    Disconnected { attempt: u32 },
}

/// Venue abstraction: subscribe, deliver book updates, place/cancel/query
/// orders, report fills.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Venue name for logging and persistence.
    fn venue_name(&self) -> &str;

    /// Taker fee rate, e.g. 0.02 for 2%.
    fn fee_rate(&self) -> Decimal;

    /// Establish venue connections. Idempotent.
    async fn connect(&self) -> Result<()>;

    /// Tear down venue connections and stop the event stream.
    async fn disconnect(&self) -> Result<()>;

    /// List markets available on the venue.
    async fn list_markets(&self, active_only: bool) -> Result<Vec<MarketInfo>>;

    /// Metadata for one market, including its outcome token IDs.
    async fn market_info(&self, market_id: &MarketId) -> Result<Option<MarketInfo>>;

    /// Current book snapshot via REST, for reseeding.
    async fn book_snapshot(&self, market_id: &MarketId) -> Result<Option<BookSnapshot>>;

    /// Subscribe to book updates for the given markets and return the event
    /// stream. Call once per run.
    async fn subscribe(&self, market_ids: &[MarketId]) -> Result<mpsc::Receiver<VenueEvent>>;

    /// Place an order. The returned order carries the venue-assigned id and
    /// initial status.
    async fn place_order(&self, request: OrderRequest) -> Result<Order>;

    /// Cancel an open order. True when the venue accepted the cancel.
    async fn cancel_order(&self, order_id: &OrderId) -> Result<bool>;

    /// Current status of an order, or `None` if the venue does not know it.
    async fn order_status(&self, order_id: &OrderId) -> Result<Option<Order>>;
}
