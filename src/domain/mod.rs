//! Pure domain types.
//!
//! No I/O here: identifiers, money, book state, orders, signals, trade sets
//! and risk events, shared by every other module.

pub mod book;
pub mod id;
pub mod market;
pub mod money;
pub mod order;
pub mod risk;
pub mod signal;
pub mod tradeset;

pub use book::{BookLevel, BookSnapshot, MarketBook, TokenBook};
pub use id::{MarketId, OrderId, TokenId};
pub use market::MarketInfo;
pub use money::{Price, Size};
pub use order::{Fill, Order, OrderRequest, OrderSide, OrderStatus, OrderType};
pub use risk::RiskEventKind;
pub use signal::{SignalDecision, TradeSignal};
pub use tradeset::{TradeSet, TradeSetStatus};
