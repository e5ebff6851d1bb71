//! Trade sets: the paired YES/NO orders of one complete-set attempt.

use super::id::MarketId;

/// Lifecycle of a trade set. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSetStatus {
    Pending,
    Filled,
    PartialFill,
    Failed,
    Resolved,
}

impl TradeSetStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Filled => "filled",
            Self::PartialFill => "partial_fill",
            Self::Failed => "failed",
            Self::Resolved => "resolved",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "filled" => Some(Self::Filled),
            "partial_fill" => Some(Self::PartialFill),
            "failed" => Some(Self::Failed),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }

    /// Whether moving to `next` respects the forward-only lifecycle.
    ///
    /// `pending` may move anywhere; `filled` may only resolve; the other
    /// terminal states are final.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => next != Self::Pending,
            Self::Filled => next == Self::Resolved,
            Self::PartialFill | Self::Failed | Self::Resolved => false,
        }
    }
}

/// One complete-set acquisition attempt, as reconstructed from the ledger.
#[derive(Debug, Clone)]
pub struct TradeSet {
    pub id: i32,
    pub market_id: MarketId,
    pub status: TradeSetStatus,
    pub yes_order_id: Option<String>,
    pub no_order_id: Option<String>,
    pub yes_cost: Option<rust_decimal::Decimal>,
    pub no_cost: Option<rust_decimal::Decimal>,
    pub total_fees: Option<rust_decimal::Decimal>,
    pub expected_payout: Option<rust_decimal::Decimal>,
    pub realized_pnl: Option<rust_decimal::Decimal>,
    pub resolution_outcome: Option<String>,
}
