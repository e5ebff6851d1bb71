//! Signal engine: the complete-set arbitrage predicate.
//!
//! A complete-set opportunity exists when buying one unit of both outcome
//! tokens costs less than the 1.00 they jointly pay at resolution, after
//! fees and a slippage buffer:
//!
//! ```text
//! sum_cost  = yes.ask + no.ask
//! total_fee = sum_cost * fee_rate
//! edge      = 1 - sum_cost - total_fee - cost_buffer
//! ```
//!
//! Evaluation is a pure function of the market book, the gating state and
//! the configuration; the gates run in a fixed order and the first failing
//! gate names the recorded decision.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::StrategyConfig;
use crate::domain::{MarketBook, MarketId, SignalDecision, TradeSignal};

#[derive(Default)]
struct Gating {
    in_flight: HashSet<MarketId>,
    cooldown_until: HashMap<MarketId, DateTime<Utc>>,
}

/// Evaluates markets and owns the cooldown / in-flight gating state.
///
/// The gating state is mutated only by the execution engine, through the
/// setter methods, from the single pipeline task.
pub struct SignalEngine {
    config: StrategyConfig,
    fee_rate: Decimal,
    gating: Mutex<Gating>,
}

impl SignalEngine {
    #[must_use]
    pub fn new(config: StrategyConfig, fee_rate: Decimal) -> Self {
        Self {
            config,
            fee_rate,
            gating: Mutex::new(Gating::default()),
        }
    }

    /// Evaluate one market. Emits exactly one signal per call.
    #[must_use]
    pub fn evaluate(&self, market: &MarketBook, now: DateTime<Utc>) -> TradeSignal {
        let mut signal = TradeSignal {
            market_id: market.market_id.clone(),
            timestamp: now,
            decision: SignalDecision::Trade,
            yes_ask: market.yes.ask_price(),
            no_ask: market.no.ask_price(),
            yes_size: market.yes.ask_size(),
            no_size: market.no.ask_size(),
            sum_cost: None,
            edge: None,
            cost_buffer: self.config.cost_buffer,
            reason: String::new(),
        };

        if !market.active {
            signal.decision = SignalDecision::SkipMarketInactive;
            signal.reason = "market is inactive".into();
            return self.emit(signal);
        }

        let (Some(yes), Some(no)) = (market.yes.best_ask, market.no.best_ask) else {
            signal.decision = SignalDecision::SkipNoQuotes;
            signal.reason = "missing ask quote on one or both legs".into();
            return self.emit(signal);
        };

        let sum_cost = yes.price + no.price;
        signal.sum_cost = Some(sum_cost);

        {
            let gating = self.gating.lock();

            if gating.in_flight.contains(&market.market_id) {
                signal.decision = SignalDecision::SkipInFlight;
                signal.reason = "orders currently in flight".into();
                drop(gating);
                return self.emit(signal);
            }

            if let Some(&until) = gating.cooldown_until.get(&market.market_id) {
                if now < until {
                    signal.decision = SignalDecision::SkipInCooldown;
                    signal.reason = format!("in cooldown until {}", until.to_rfc3339());
                    drop(gating);
                    return self.emit(signal);
                }
            }
        }

        let total_fee = sum_cost * self.fee_rate;
        let edge = Decimal::ONE - sum_cost - total_fee - self.config.cost_buffer;
        signal.edge = Some(edge);

        if edge < self.config.min_edge {
            signal.decision = SignalDecision::SkipInsufficientEdge;
            signal.reason = format!("edge {edge} below min_edge {}", self.config.min_edge);
            return self.emit(signal);
        }

        let min_size = yes.size.min(no.size);
        if min_size < self.config.min_depth {
            signal.decision = SignalDecision::SkipInsufficientDepth;
            signal.reason = format!("depth {min_size} below min_depth {}", self.config.min_depth);
            return self.emit(signal);
        }

        signal.reason = format!("edge {edge} with depth {min_size}");
        self.emit(signal)
    }

    fn emit(&self, signal: TradeSignal) -> TradeSignal {
        debug!(
            market_id = %signal.market_id,
            decision = signal.decision.as_str(),
            sum_cost = ?signal.sum_cost,
            edge = ?signal.edge,
            reason = %signal.reason,
            "Signal evaluated"
        );
        signal
    }

    /// Mark a market as having outstanding orders.
    pub fn set_in_flight(&self, market_id: &MarketId) {
        self.gating.lock().in_flight.insert(market_id.clone());
    }

    /// Clear in-flight status after a trade set reaches a terminal state.
    pub fn clear_in_flight(&self, market_id: &MarketId) {
        self.gating.lock().in_flight.remove(market_id);
    }

    /// Start a cooldown window for a market.
    pub fn set_cooldown(&self, market_id: &MarketId, now: DateTime<Utc>, duration: Duration) {
        self.gating
            .lock()
            .cooldown_until
            .insert(market_id.clone(), now + duration);
    }

    pub fn clear_cooldown(&self, market_id: &MarketId) {
        self.gating.lock().cooldown_until.remove(market_id);
    }

    /// Markets currently gated as in-flight.
    #[must_use]
    pub fn in_flight_markets(&self) -> Vec<MarketId> {
        self.gating.lock().in_flight.iter().cloned().collect()
    }

    #[must_use]
    pub fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookLevel, TokenId};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn engine() -> SignalEngine {
        SignalEngine::new(StrategyConfig::default(), dec!(0.02))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap()
    }

    fn market(yes_ask: Decimal, yes_size: Decimal, no_ask: Decimal, no_size: Decimal) -> MarketBook {
        let mut book = MarketBook::new(
            MarketId::new("mkt-1"),
            "Will it settle YES?",
            TokenId::new("yes-1"),
            TokenId::new("no-1"),
        );
        book.yes.best_ask = Some(BookLevel::new(yes_ask, yes_size));
        book.no.best_ask = Some(BookLevel::new(no_ask, no_size));
        book
    }

    #[test]
    fn clear_arbitrage_trades() {
        let signal = engine().evaluate(&market(dec!(0.45), dec!(100), dec!(0.50), dec!(100)), now());

        assert_eq!(signal.decision, SignalDecision::Trade);
        assert_eq!(signal.sum_cost, Some(dec!(0.95)));
        assert_eq!(signal.edge, Some(dec!(0.026)));
    }

    #[test]
    fn edge_identity_holds_for_trades() {
        let engine = engine();
        let market = market(dec!(0.45), dec!(100), dec!(0.50), dec!(100));
        let signal = engine.evaluate(&market, now());

        // yes + no + fee + buffer + edge == 1
        let sum_cost = signal.sum_cost.unwrap();
        let total = sum_cost + sum_cost * engine.fee_rate() + signal.cost_buffer
            + signal.edge.unwrap();
        assert_eq!(total, Decimal::ONE);
    }

    #[test]
    fn negative_edge_is_skipped() {
        let signal = engine().evaluate(&market(dec!(0.55), dec!(100), dec!(0.50), dec!(100)), now());

        assert_eq!(signal.decision, SignalDecision::SkipInsufficientEdge);
        assert_eq!(signal.sum_cost, Some(dec!(1.05)));
        assert!(signal.edge.unwrap() < Decimal::ZERO);
    }

    #[test]
    fn shallow_book_is_skipped_and_reason_names_depth() {
        let signal = engine().evaluate(&market(dec!(0.40), dec!(5), dec!(0.45), dec!(100)), now());

        assert_eq!(signal.decision, SignalDecision::SkipInsufficientDepth);
        assert!(signal.reason.contains('5'), "reason: {}", signal.reason);
        // Edge was computed before the depth gate.
        assert!(signal.edge.is_some());
    }

    #[test]
    fn inactive_market_wins_over_every_other_gate() {
        let engine = engine();
        let mut book = market(dec!(0.40), dec!(5), dec!(0.45), dec!(100));
        book.active = false;
        engine.set_in_flight(&book.market_id);

        let signal = engine.evaluate(&book, now());
        assert_eq!(signal.decision, SignalDecision::SkipMarketInactive);
    }

    #[test]
    fn missing_quote_wins_over_in_flight() {
        let engine = engine();
        let mut book = market(dec!(0.45), dec!(100), dec!(0.50), dec!(100));
        book.no.best_ask = None;
        engine.set_in_flight(&book.market_id);

        let signal = engine.evaluate(&book, now());
        assert_eq!(signal.decision, SignalDecision::SkipNoQuotes);
    }

    #[test]
    fn in_flight_wins_over_cooldown() {
        let engine = engine();
        let book = market(dec!(0.45), dec!(100), dec!(0.50), dec!(100));
        engine.set_in_flight(&book.market_id);
        engine.set_cooldown(&book.market_id, now(), Duration::seconds(60));

        let signal = engine.evaluate(&book, now());
        assert_eq!(signal.decision, SignalDecision::SkipInFlight);

        engine.clear_in_flight(&book.market_id);
        let signal = engine.evaluate(&book, now());
        assert_eq!(signal.decision, SignalDecision::SkipInCooldown);
    }

    #[test]
    fn cooldown_expires_and_the_market_trades_again() {
        let engine = engine();
        let book = market(dec!(0.45), dec!(100), dec!(0.50), dec!(100));
        engine.set_cooldown(&book.market_id, now(), Duration::seconds(2));

        let during = engine.evaluate(&book, now() + Duration::seconds(1));
        assert_eq!(during.decision, SignalDecision::SkipInCooldown);

        let after = engine.evaluate(&book, now() + Duration::seconds(2));
        assert_eq!(after.decision, SignalDecision::Trade);
    }

    #[test]
    fn gating_skips_do_not_compute_edge() {
        let engine = engine();
        let book = market(dec!(0.45), dec!(100), dec!(0.50), dec!(100));
        engine.set_in_flight(&book.market_id);

        let signal = engine.evaluate(&book, now());
        assert_eq!(signal.sum_cost, Some(dec!(0.95)));
        assert!(signal.edge.is_none());
    }
}
