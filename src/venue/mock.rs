//! Deterministic mock venue for tests, paper runs and the demo mode.
//!
//! Everything is scripted: book events are queued up front and drained into
//! the subscriber channel, order outcomes are dequeued per token, and order
//! ids are sequential. No randomness anywhere, so the same script and clock
//! always produce the same ledger.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::domain::{
    BookLevel, BookSnapshot, Fill, MarketId, MarketInfo, Order, OrderId, OrderRequest, OrderStatus,
    TokenId,
};
use crate::error::{Error, Result};

use super::{VenueAdapter, VenueEvent};

/// Scripted outcome for the next order placed on a token.
#[derive(Debug, Clone, Copy)]
pub enum OrderScript {
    /// Fill immediately at the requested price.
    Fill,
    /// Fill the given fraction of the requested size, then sit.
    PartialFill(Decimal),
    /// Reject the placement.
    Reject,
    /// Accept and rest on the book without filling.
    Open,
}

#[derive(Default)]
struct MockState {
    markets: HashMap<MarketId, MarketInfo>,
    events: VecDeque<VenueEvent>,
    order_scripts: HashMap<TokenId, VecDeque<OrderScript>>,
    orders: HashMap<OrderId, Order>,
    next_order_id: u64,
    connected: bool,
}

/// In-process venue with scripted behavior.
pub struct MockVenue {
    clock: Arc<dyn Clock>,
    fee_rate: Decimal,
    state: Mutex<MockState>,
}

impl MockVenue {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            fee_rate: dec!(0.02),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Mock with a demo market pre-registered, used by `venue.name = "mock"`.
    #[must_use]
    pub fn with_demo_market(clock: Arc<dyn Clock>) -> Self {
        let venue = Self::new(clock.clone());
        let info = MarketInfo {
            market_id: MarketId::new("demo-market"),
            condition_id: "demo-condition".into(),
            question: "Will the demo market settle YES?".into(),
            yes_token_id: TokenId::new("demo-yes"),
            no_token_id: TokenId::new("demo-no"),
            min_tick: dec!(0.01),
            active: true,
            end_date: None,
        };
        venue.add_market(info.clone());

        // A short fixed tape: one arbitrageable quote pair, one fair pair.
        let now = clock.now();
        for (yes_ask, no_ask) in [(dec!(0.45), dec!(0.50)), (dec!(0.52), dec!(0.50))] {
            venue.push_book(book(&info.yes_token_id, yes_ask, dec!(100), now));
            venue.push_book(book(&info.no_token_id, no_ask, dec!(100), now));
        }
        venue
    }

    pub fn add_market(&self, info: MarketInfo) {
        self.state.lock().markets.insert(info.market_id.clone(), info);
    }

    /// Queue a book snapshot for delivery on subscribe.
    pub fn push_book(&self, snapshot: BookSnapshot) {
        self.state.lock().events.push_back(VenueEvent::Book(snapshot));
    }

    /// Queue an arbitrary event (fills, disconnects) for delivery.
    pub fn push_event(&self, event: VenueEvent) {
        self.state.lock().events.push_back(event);
    }

    /// Script the outcome of the next placement on `token_id`. Unscripted
    /// placements fill immediately.
    pub fn script_order(&self, token_id: &TokenId, script: OrderScript) {
        self.state
            .lock()
            .order_scripts
            .entry(token_id.clone())
            .or_default()
            .push_back(script);
    }

    /// Orders the venue has seen, in placement order.
    #[must_use]
    pub fn placed_orders(&self) -> Vec<Order> {
        let state = self.state.lock();
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        orders
    }

    /// Whether a cancel was accepted for the given order.
    #[must_use]
    pub fn is_cancelled(&self, order_id: &OrderId) -> bool {
        self.state
            .lock()
            .orders
            .get(order_id)
            .is_some_and(|order| order.status == OrderStatus::Cancelled)
    }
}

/// Build a single-level snapshot around an ask quote.
#[must_use]
pub fn book(
    token_id: &TokenId,
    ask: Decimal,
    size: Decimal,
    timestamp: chrono::DateTime<chrono::Utc>,
) -> BookSnapshot {
    BookSnapshot {
        market_id: None,
        token_id: token_id.clone(),
        bids: vec![BookLevel::new(ask - dec!(0.02), size)],
        asks: vec![BookLevel::new(ask, size)],
        timestamp,
        sequence: None,
    }
}

#[async_trait]
impl VenueAdapter for MockVenue {
    fn venue_name(&self) -> &str {
        "mock"
    }

    fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }

    async fn connect(&self) -> Result<()> {
        self.state.lock().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.state.lock().connected = false;
        Ok(())
    }

    async fn list_markets(&self, active_only: bool) -> Result<Vec<MarketInfo>> {
        let state = self.state.lock();
        let mut markets: Vec<MarketInfo> = state
            .markets
            .values()
            .filter(|info| !active_only || info.active)
            .cloned()
            .collect();
        markets.sort_by(|a, b| a.market_id.as_str().cmp(b.market_id.as_str()));
        Ok(markets)
    }

    async fn market_info(&self, market_id: &MarketId) -> Result<Option<MarketInfo>> {
        Ok(self.state.lock().markets.get(market_id).cloned())
    }

    async fn book_snapshot(&self, market_id: &MarketId) -> Result<Option<BookSnapshot>> {
        // The scripted tape is the only book source; REST reseeds are not
        // part of any mock scenario.
        let _ = market_id;
        Ok(None)
    }

    async fn subscribe(&self, _market_ids: &[MarketId]) -> Result<mpsc::Receiver<VenueEvent>> {
        let events: Vec<VenueEvent> = {
            let mut state = self.state.lock();
            state.events.drain(..).collect()
        };
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.try_send(event)
                .map_err(|e| Error::Venue(format!("mock event queue overflow: {e}")))?;
        }
        // Dropping tx closes the stream once the queue drains, which ends
        // the pipeline loop cleanly.
        Ok(rx)
    }

    async fn place_order(&self, request: OrderRequest) -> Result<Order> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let script = state
            .order_scripts
            .get_mut(&request.token_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(OrderScript::Fill);

        state.next_order_id += 1;
        let id = OrderId::new(format!("mock-{:04}", state.next_order_id));
        let mut order = Order::from_request(id.clone(), &request, OrderStatus::Pending, now);

        match script {
            OrderScript::Fill => {
                order.status = OrderStatus::Filled;
                order.filled_size = request.size;
                order.avg_fill_price = Some(request.price);
                order.fee = request.size * request.price * self.fee_rate;
            }
            OrderScript::PartialFill(fraction) => {
                order.status = OrderStatus::PartiallyFilled;
                order.filled_size = request.size * fraction;
                order.avg_fill_price = Some(request.price);
                order.fee = order.filled_size * request.price * self.fee_rate;
            }
            OrderScript::Reject => {
                order.status = OrderStatus::Rejected;
            }
            OrderScript::Open => {
                order.status = OrderStatus::Open;
            }
        }

        state.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<bool> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        match state.orders.get_mut(order_id) {
            Some(order) if order.status.is_cancellable() => {
                order.status = OrderStatus::Cancelled;
                order.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn order_status(&self, order_id: &OrderId) -> Result<Option<Order>> {
        Ok(self.state.lock().orders.get(order_id).cloned())
    }
}

/// Deterministic fill derived from an order, for scripting fill events.
#[must_use]
pub fn fill_for(order: &Order, timestamp: chrono::DateTime<chrono::Utc>) -> Fill {
    Fill {
        fill_id: format!("fill-{}", order.id),
        order_id: order.id.clone(),
        price: order.avg_fill_price.unwrap_or(order.price),
        size: order.filled_size,
        fee: order.fee,
        timestamp,
    }
}
