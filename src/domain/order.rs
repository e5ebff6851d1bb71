//! Order and fill types shared by the venue adapters and the execution
//! engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::{MarketId, OrderId, TokenId};
use super::money::{Price, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Ioc,
}

impl OrderType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Limit => "LIMIT",
            Self::Ioc => "IOC",
        }
    }
}

/// Venue-reported order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Open,
    Filled,
    PartiallyFilled,
    Cancelled,
    Rejected,
    Expired,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Open => "OPEN",
            Self::Filled => "FILLED",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Cancelled => "CANCELLED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        }
    }

    /// True for statuses where the venue will accept a cancel.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Open | Self::PartiallyFilled)
    }

    /// True once the order can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired
        )
    }
}

/// Parameters for a new order, as handed to a venue adapter.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Price,
    pub size: Size,
}

/// An order as tracked through its lifecycle.
///
/// Created by the execution engine from an [`OrderRequest`]; mutated only by
/// venue status reports.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Price,
    pub size: Size,
    pub status: OrderStatus,
    pub filled_size: Size,
    pub avg_fill_price: Option<Price>,
    pub fee: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build an order in `status` from a request and a venue-assigned id.
    #[must_use]
    pub fn from_request(
        id: OrderId,
        request: &OrderRequest,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            market_id: request.market_id.clone(),
            token_id: request.token_id.clone(),
            side: request.side,
            order_type: request.order_type,
            price: request.price,
            size: request.size,
            status,
            filled_size: Decimal::ZERO,
            avg_fill_price: None,
            fee: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Notional actually filled: `filled_size * avg_fill_price`.
    #[must_use]
    pub fn filled_cost(&self) -> Decimal {
        self.avg_fill_price
            .map_or(Decimal::ZERO, |price| self.filled_size * price)
    }
}

/// A single execution report for an order.
#[derive(Debug, Clone)]
pub struct Fill {
    pub fill_id: String,
    pub order_id: OrderId,
    pub price: Price,
    pub size: Size,
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cancellable_statuses() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Open.is_cancellable());
        assert!(OrderStatus::PartiallyFilled.is_cancellable());
        assert!(!OrderStatus::Filled.is_cancellable());
        assert!(!OrderStatus::Rejected.is_cancellable());
    }

    #[test]
    fn filled_cost_uses_average_price() {
        let request = OrderRequest {
            market_id: MarketId::new("mkt-1"),
            token_id: TokenId::new("yes-1"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            price: dec!(0.45),
            size: dec!(10),
        };
        let mut order = Order::from_request(
            OrderId::new("ord-1"),
            &request,
            OrderStatus::Filled,
            Utc::now(),
        );
        assert_eq!(order.filled_cost(), Decimal::ZERO);

        order.filled_size = dec!(10);
        order.avg_fill_price = Some(dec!(0.45));
        assert_eq!(order.filled_cost(), dec!(4.50));
    }
}
