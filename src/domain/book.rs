//! Top-of-book state for binary market outcome tokens.
//!
//! A [`MarketBook`] pairs the YES and NO [`TokenBook`]s of one market and
//! derives the quantities the arbitrage predicate needs: the cost of a
//! complete set (`sum_ask_cost`) and the executable depth
//! (`min_available_size`). Only the best level of each side is tracked; the
//! strategy never needs more.

use chrono::{DateTime, Utc};

use super::id::{MarketId, TokenId};
use super::money::{Price, Size};

/// A single price level: price and total size available at that price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookLevel {
    pub price: Price,
    pub size: Size,
}

impl BookLevel {
    #[must_use]
    pub const fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }
}

/// Order book snapshot as delivered by a venue adapter.
///
/// Carries full bid/ask ladders on the wire; the book state consumes only
/// the top level of each side.
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub market_id: Option<MarketId>,
    pub token_id: TokenId,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub timestamp: DateTime<Utc>,
    pub sequence: Option<i64>,
}

/// Best bid/ask state for one outcome token.
#[derive(Debug, Clone)]
pub struct TokenBook {
    pub token_id: TokenId,
    pub best_bid: Option<BookLevel>,
    pub best_ask: Option<BookLevel>,
    pub last_update: Option<DateTime<Utc>>,
    pub sequence: Option<i64>,
}

impl TokenBook {
    #[must_use]
    pub const fn new(token_id: TokenId) -> Self {
        Self {
            token_id,
            best_bid: None,
            best_ask: None,
            last_update: None,
            sequence: None,
        }
    }

    #[must_use]
    pub fn ask_price(&self) -> Option<Price> {
        self.best_ask.map(|level| level.price)
    }

    #[must_use]
    pub fn ask_size(&self) -> Option<Size> {
        self.best_ask.map(|level| level.size)
    }
}

/// A market plus its two token books.
#[derive(Debug, Clone)]
pub struct MarketBook {
    pub market_id: MarketId,
    pub question: String,
    pub active: bool,
    pub yes: TokenBook,
    pub no: TokenBook,
}

impl MarketBook {
    #[must_use]
    pub fn new(
        market_id: MarketId,
        question: impl Into<String>,
        yes_token_id: TokenId,
        no_token_id: TokenId,
    ) -> Self {
        Self {
            market_id,
            question: question.into(),
            active: true,
            yes: TokenBook::new(yes_token_id),
            no: TokenBook::new(no_token_id),
        }
    }

    /// True when both legs have a best ask.
    #[must_use]
    pub fn has_quotes(&self) -> bool {
        self.yes.best_ask.is_some() && self.no.best_ask.is_some()
    }

    /// Cost of buying one complete set at the ask: `yes.ask + no.ask`.
    ///
    /// Defined only when both asks are present.
    #[must_use]
    pub fn sum_ask_cost(&self) -> Option<Price> {
        Some(self.yes.ask_price()? + self.no.ask_price()?)
    }

    /// Executable depth: the smaller of the two ask sizes.
    #[must_use]
    pub fn min_available_size(&self) -> Option<Size> {
        Some(self.yes.ask_size()?.min(self.no.ask_size()?))
    }

    /// Most recent update from either leg.
    #[must_use]
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        match (self.yes.last_update, self.no.last_update) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}
