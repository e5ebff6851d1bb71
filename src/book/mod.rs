//! Streaming order-book state, keyed by market and outcome token.
//!
//! One lock guards the whole map; a snapshot application is the atomic unit.
//! Venue messages arrive keyed by token, so an auxiliary token→market index
//! demultiplexes them onto the owning market.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{BookSnapshot, MarketBook, MarketId, MarketInfo, TokenId};

/// Result of applying one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The snapshot was applied to this market.
    Updated(MarketId),
    /// The snapshot was older than the stored state and was discarded.
    Stale,
    /// The token is not registered.
    Unknown,
}

impl ApplyOutcome {
    /// The affected market, when the snapshot was accepted.
    #[must_use]
    pub fn market_id(&self) -> Option<&MarketId> {
        match self {
            Self::Updated(market_id) => Some(market_id),
            Self::Stale | Self::Unknown => None,
        }
    }
}

#[derive(Default)]
struct BookStateInner {
    markets: HashMap<MarketId, MarketBook>,
    token_to_market: HashMap<TokenId, MarketId>,
}

/// Tracks top-of-book state for every registered market.
#[derive(Default)]
pub struct BookState {
    inner: RwLock<BookStateInner>,
}

impl BookState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a market to track. Idempotent: re-registering resets the
    /// token books.
    pub fn register(&self, info: &MarketInfo) {
        let mut inner = self.inner.write();
        let mut book = MarketBook::new(
            info.market_id.clone(),
            info.question.clone(),
            info.yes_token_id.clone(),
            info.no_token_id.clone(),
        );
        book.active = info.active;
        inner
            .token_to_market
            .insert(info.yes_token_id.clone(), info.market_id.clone());
        inner
            .token_to_market
            .insert(info.no_token_id.clone(), info.market_id.clone());
        inner.markets.insert(info.market_id.clone(), book);
    }

    /// Apply one snapshot to the owning token book.
    ///
    /// The top level of each side replaces the stored best bid/ask; a side
    /// with no levels clears. Out-of-order delivery is gated: a sequence no
    /// newer than the stored one loses, and without sequences an older
    /// timestamp loses (an equal timestamp accepts the later arrival).
    pub fn apply_snapshot(&self, snapshot: &BookSnapshot) -> ApplyOutcome {
        let mut inner = self.inner.write();

        let Some(market_id) = inner.token_to_market.get(&snapshot.token_id).cloned() else {
            return ApplyOutcome::Unknown;
        };
        let Some(market) = inner.markets.get_mut(&market_id) else {
            return ApplyOutcome::Unknown;
        };

        let token = if snapshot.token_id == market.yes.token_id {
            &mut market.yes
        } else {
            &mut market.no
        };

        match (snapshot.sequence, token.sequence) {
            (Some(new_seq), Some(cur_seq)) if new_seq <= cur_seq => {
                debug!(
                    token_id = %snapshot.token_id,
                    new_seq,
                    cur_seq,
                    "Discarding stale snapshot by sequence"
                );
                return ApplyOutcome::Stale;
            }
            (Some(_), _) => {}
            (None, _) => {
                if let Some(last) = token.last_update {
                    if snapshot.timestamp < last {
                        debug!(
                            token_id = %snapshot.token_id,
                            "Discarding stale snapshot by timestamp"
                        );
                        return ApplyOutcome::Stale;
                    }
                }
            }
        }

        token.best_ask = snapshot.asks.first().copied();
        token.best_bid = snapshot.bids.first().copied();
        token.last_update = Some(snapshot.timestamp);
        token.sequence = snapshot.sequence;

        ApplyOutcome::Updated(market_id)
    }

    /// Immutable copy of a market's current state, suitable for evaluation.
    #[must_use]
    pub fn read(&self, market_id: &MarketId) -> Option<MarketBook> {
        self.inner.read().markets.get(market_id).cloned()
    }

    /// All tracked token IDs, for subscription.
    #[must_use]
    pub fn token_ids(&self) -> Vec<TokenId> {
        self.inner.read().token_to_market.keys().cloned().collect()
    }

    /// The market owning a token, if registered.
    #[must_use]
    pub fn market_for_token(&self, token_id: &TokenId) -> Option<MarketId> {
        self.inner.read().token_to_market.get(token_id).cloned()
    }

    #[must_use]
    pub fn market_count(&self) -> usize {
        self.inner.read().markets.len()
    }
}
