#![allow(dead_code)]

//! Shared harness: a full pipeline over the scripted mock venue and a
//! simulated clock, driven event-by-event without sockets.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pairlock::app::Orchestrator;
use pairlock::book::BookState;
use pairlock::clock::{Clock, SimClock};
use pairlock::config::{ExecutionConfig, RiskConfig, StrategyConfig};
use pairlock::domain::{BookLevel, BookSnapshot, MarketId, MarketInfo, TokenId};
use pairlock::execution::ExecutionEngine;
use pairlock::ledger::Ledger;
use pairlock::risk::KillSwitch;
use pairlock::signal::SignalEngine;
use pairlock::venue::{MockVenue, VenueAdapter, VenueEvent};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap()
}

pub fn market_info() -> MarketInfo {
    MarketInfo {
        market_id: MarketId::new("mkt-1"),
        condition_id: "cond-1".into(),
        question: "Will it settle YES?".into(),
        yes_token_id: TokenId::new("yes-1"),
        no_token_id: TokenId::new("no-1"),
        min_tick: dec!(0.01),
        active: true,
        end_date: None,
    }
}

pub struct PipelineOptions {
    pub paper_mode: bool,
    pub strategy: StrategyConfig,
    pub execution: ExecutionConfig,
    pub risk: RiskConfig,
    pub auto_advance: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            paper_mode: true,
            strategy: StrategyConfig::default(),
            execution: ExecutionConfig::default(),
            risk: RiskConfig::default(),
            auto_advance: None,
        }
    }
}

pub struct Pipeline {
    pub clock: Arc<SimClock>,
    pub venue: Arc<MockVenue>,
    pub books: Arc<BookState>,
    pub signals: Arc<SignalEngine>,
    pub executor: Arc<ExecutionEngine>,
    pub kill_switch: Arc<KillSwitch>,
    pub ledger: Arc<Ledger>,
    pub orchestrator: Orchestrator,
}

impl Pipeline {
    /// Feed one top-of-book quote pair through the pipeline (two events,
    /// YES leg first), stamped at the current sim time.
    pub async fn feed_quotes(
        &self,
        yes_ask: Decimal,
        yes_size: Decimal,
        no_ask: Decimal,
        no_size: Decimal,
    ) {
        let info = market_info();
        let now = self.clock.now();
        self.orchestrator
            .handle_event(VenueEvent::Book(snapshot(
                &info.yes_token_id,
                yes_ask,
                yes_size,
                now,
            )))
            .await;
        self.orchestrator
            .handle_event(VenueEvent::Book(snapshot(
                &info.no_token_id,
                no_ask,
                no_size,
                now,
            )))
            .await;
    }
}

pub fn snapshot(
    token_id: &TokenId,
    ask: Decimal,
    size: Decimal,
    timestamp: DateTime<Utc>,
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

pub fn build_pipeline(options: PipelineOptions) -> Pipeline {
    let mut clock = SimClock::new(start_time());
    if let Some(step) = options.auto_advance {
        clock = clock.with_auto_advance(step);
    }
    let clock = Arc::new(clock);
    let clock_dyn: Arc<dyn Clock> = clock.clone();

    let venue = Arc::new(MockVenue::new(clock_dyn.clone()));
    venue.add_market(market_info());

    let ledger = Arc::new(Ledger::in_memory(clock_dyn.clone()).expect("in-memory ledger"));
    let books = Arc::new(BookState::new());
    books.register(&market_info());

    let signals = Arc::new(SignalEngine::new(options.strategy, venue.fee_rate()));
    let kill_switch = Arc::new(KillSwitch::new(ledger.clone(), options.risk.clone()));
    let executor = Arc::new(ExecutionEngine::new(
        venue.clone(),
        signals.clone(),
        ledger.clone(),
        kill_switch.clone(),
        options.execution,
        options.risk,
        clock_dyn.clone(),
        options.paper_mode,
    ));

    let orchestrator = Orchestrator::new(
        books.clone(),
        signals.clone(),
        executor.clone(),
        kill_switch.clone(),
        ledger.clone(),
        clock_dyn,
    );

    Pipeline {
        clock,
        venue,
        books,
        signals,
        executor,
        kill_switch,
        ledger,
        orchestrator,
    }
}

/// Decisions of every recorded opportunity, in insertion order.
pub fn recorded_decisions(ledger: &Ledger) -> Vec<String> {
    use diesel::prelude::*;
    use pairlock::ledger::schema::opportunities::dsl;

    let mut conn = ledger.pool().get().expect("ledger connection");
    dsl::opportunities
        .order_by(dsl::id.asc())
        .select(dsl::decision)
        .load(&mut conn)
        .expect("load decisions")
}

/// (decision, reason) pairs of every recorded opportunity.
pub fn recorded_reasons(ledger: &Ledger) -> Vec<(String, String)> {
    use diesel::prelude::*;
    use pairlock::ledger::schema::opportunities::dsl;

    let mut conn = ledger.pool().get().expect("ledger connection");
    dsl::opportunities
        .order_by(dsl::id.asc())
        .select((dsl::decision, dsl::reason))
        .load(&mut conn)
        .expect("load reasons")
}

/// Raw dump of the audit tables, for byte-for-byte replay comparison.
pub fn dump_ledger(ledger: &Ledger) -> String {
    use diesel::prelude::*;
    use pairlock::ledger::schema::{opportunities, orders, risk_events, tradesets};

    let mut conn = ledger.pool().get().expect("ledger connection");
    let mut out = String::new();

    let opps: Vec<(Option<i32>, String, String, Option<String>, Option<String>, String)> =
        opportunities::dsl::opportunities
            .order_by(opportunities::dsl::id.asc())
            .select((
                opportunities::dsl::id,
                opportunities::dsl::market_id,
                opportunities::dsl::decision,
                opportunities::dsl::edge,
                opportunities::dsl::sum_cost,
                opportunities::dsl::timestamp,
            ))
            .load(&mut conn)
            .expect("dump opportunities");
    out.push_str(&format!("{opps:?}\n"));

    let sets: Vec<(Option<i32>, String, String, Option<String>, Option<String>)> =
        tradesets::dsl::tradesets
            .order_by(tradesets::dsl::id.asc())
            .select((
                tradesets::dsl::id,
                tradesets::dsl::market_id,
                tradesets::dsl::status,
                tradesets::dsl::realized_pnl,
                tradesets::dsl::total_fees,
            ))
            .load(&mut conn)
            .expect("dump tradesets");
    out.push_str(&format!("{sets:?}\n"));

    let orders: Vec<(String, String, String, String)> = orders::dsl::orders
        .order_by(orders::dsl::id.asc())
        .select((
            orders::dsl::order_id,
            orders::dsl::token_id,
            orders::dsl::status,
            orders::dsl::filled_size,
        ))
        .load(&mut conn)
        .expect("dump orders");
    out.push_str(&format!("{orders:?}\n"));

    let events: Vec<(String, Option<String>, String)> = risk_events::dsl::risk_events
        .order_by(risk_events::dsl::id.asc())
        .select((
            risk_events::dsl::event_type,
            risk_events::dsl::market_id,
            risk_events::dsl::created_at,
        ))
        .load(&mut conn)
        .expect("dump risk events");
    out.push_str(&format!("{events:?}\n"));

    out
}
