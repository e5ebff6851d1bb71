//! Database row types for the Diesel ledger.
//!
//! Prices, sizes and PnL are stored as decimal strings so replays round-trip
//! exactly; timestamps are fixed-width RFC 3339 so string comparison matches
//! chronological order.

use diesel::prelude::*;

use super::schema::{fills, opportunities, orders, risk_events, tradesets};

/// Opportunity row (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = opportunities)]
pub struct NewOpportunityRow {
    pub market_id: String,
    pub timestamp: String,
    pub yes_ask: Option<String>,
    pub no_ask: Option<String>,
    pub yes_size: Option<String>,
    pub no_size: Option<String>,
    pub sum_cost: Option<String>,
    pub edge: Option<String>,
    pub cost_buffer: String,
    pub decision: String,
    pub reason: String,
    pub created_at: String,
}

/// Opportunity row (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = opportunities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OpportunityRow {
    pub id: Option<i32>,
    pub market_id: String,
    pub timestamp: String,
    pub yes_ask: Option<String>,
    pub no_ask: Option<String>,
    pub yes_size: Option<String>,
    pub no_size: Option<String>,
    pub sum_cost: Option<String>,
    pub edge: Option<String>,
    pub cost_buffer: String,
    pub decision: String,
    pub reason: String,
    pub created_at: String,
}

/// Trade set row (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tradesets)]
pub struct NewTradeSetRow {
    pub market_id: String,
    pub status: String,
    pub expected_payout: Option<String>,
    pub created_at: String,
}

/// Trade set row (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = tradesets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TradeSetRow {
    pub id: Option<i32>,
    pub market_id: String,
    pub status: String,
    pub yes_order_id: Option<String>,
    pub no_order_id: Option<String>,
    pub yes_cost: Option<String>,
    pub no_cost: Option<String>,
    pub total_cost: Option<String>,
    pub total_fees: Option<String>,
    pub expected_payout: Option<String>,
    pub realized_pnl: Option<String>,
    pub resolution_outcome: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Order row (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub order_id: String,
    pub tradeset_id: Option<i32>,
    pub market_id: String,
    pub token_id: String,
    pub side: String,
    pub order_type: String,
    pub price: String,
    pub size: String,
    pub status: String,
    pub filled_size: String,
    pub avg_fill_price: Option<String>,
    pub fee: String,
    pub created_at: String,
}

/// Order row (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub id: Option<i32>,
    pub order_id: String,
    pub tradeset_id: Option<i32>,
    pub market_id: String,
    pub token_id: String,
    pub side: String,
    pub order_type: String,
    pub price: String,
    pub size: String,
    pub status: String,
    pub filled_size: String,
    pub avg_fill_price: Option<String>,
    pub fee: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Fill row (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = fills)]
pub struct NewFillRow {
    pub fill_id: String,
    pub order_id: String,
    pub price: String,
    pub size: String,
    pub fee: String,
    pub timestamp: String,
    pub created_at: String,
}

/// Fill row (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = fills)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FillRow {
    pub id: Option<i32>,
    pub fill_id: String,
    pub order_id: String,
    pub price: String,
    pub size: String,
    pub fee: String,
    pub timestamp: String,
    pub created_at: String,
}

/// Risk event row (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = risk_events)]
pub struct NewRiskEventRow {
    pub event_type: String,
    pub market_id: Option<String>,
    pub details: Option<String>,
    pub created_at: String,
}

/// Risk event row (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = risk_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RiskEventRow {
    pub id: Option<i32>,
    pub event_type: String,
    pub market_id: Option<String>,
    pub details: Option<String>,
    pub created_at: String,
}
