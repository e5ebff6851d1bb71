//! Trade signals: the immutable record of one arbitrage evaluation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::MarketId;
use super::money::{Price, Size};

/// Outcome of evaluating one market against the arbitrage predicate.
///
/// The variants are ordered the way the gates are checked; the first failing
/// gate names the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDecision {
    Trade,
    SkipMarketInactive,
    SkipNoQuotes,
    SkipInFlight,
    SkipInCooldown,
    SkipInsufficientEdge,
    SkipInsufficientDepth,
}

impl SignalDecision {
    /// Stable wire name, used in the ledger and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trade => "TRADE",
            Self::SkipMarketInactive => "SKIP_MARKET_INACTIVE",
            Self::SkipNoQuotes => "SKIP_NO_QUOTES",
            Self::SkipInFlight => "SKIP_IN_FLIGHT",
            Self::SkipInCooldown => "SKIP_IN_COOLDOWN",
            Self::SkipInsufficientEdge => "SKIP_INSUFFICIENT_EDGE",
            Self::SkipInsufficientDepth => "SKIP_INSUFFICIENT_DEPTH",
        }
    }
}

/// The audit unit of what the engine saw and why it did or didn't act.
///
/// Created once per evaluation, written straight to the ledger, never
/// mutated.
#[derive(Debug, Clone)]
pub struct TradeSignal {
    pub market_id: MarketId,
    pub timestamp: DateTime<Utc>,
    pub decision: SignalDecision,
    pub yes_ask: Option<Price>,
    pub no_ask: Option<Price>,
    pub yes_size: Option<Size>,
    pub no_size: Option<Size>,
    pub sum_cost: Option<Decimal>,
    pub edge: Option<Decimal>,
    pub cost_buffer: Decimal,
    pub reason: String,
}

impl TradeSignal {
    #[must_use]
    pub fn is_tradeable(&self) -> bool {
        self.decision == SignalDecision::Trade
    }
}
