//! Market metadata as reported by a venue.

use rust_decimal::Decimal;

use super::id::{MarketId, TokenId};

/// Metadata for one binary market: the question and its two outcome tokens.
#[derive(Debug, Clone)]
pub struct MarketInfo {
    pub market_id: MarketId,
    pub condition_id: String,
    pub question: String,
    pub yes_token_id: TokenId,
    pub no_token_id: TokenId,
    /// Minimum price increment, typically 0.01.
    pub min_tick: Decimal,
    pub active: bool,
    pub end_date: Option<String>,
}

impl MarketInfo {
    /// Both outcome token IDs, YES first.
    #[must_use]
    pub fn token_ids(&self) -> [&TokenId; 2] {
        [&self.yes_token_id, &self.no_token_id]
    }
}
