//! Append-only audit ledger backed by SQLite (Diesel).
//!
//! Five tables: `opportunities`, `orders`, `fills`, `tradesets`,
//! `risk_events`. All writes are appends or forward-only updates (a trade
//! set's status never moves backwards). Timestamps come from the injected
//! [`Clock`], never from the database, so a scripted run replays to an
//! identical ledger.

pub mod model;
pub mod schema;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rust_decimal::Decimal;
use tracing::warn;

use crate::clock::Clock;
use crate::domain::{
    Fill, MarketId, Order, RiskEventKind, TradeSet, TradeSetStatus, TradeSignal,
};
use crate::error::{Error, Result};
use model::{
    NewFillRow, NewOpportunityRow, NewOrderRow, NewRiskEventRow, NewTradeSetRow, TradeSetRow,
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Create a single-connection pool for the given database path.
///
/// The ledger has a single writer; one pooled connection also keeps
/// in-memory test databases coherent.
pub fn create_pool(database_path: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_path);
    Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Run embedded migrations against the pool.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Database(e.to_string()))?;
    Ok(())
}

/// Fixed-width RFC 3339 (microseconds, Z) so lexicographic order in SQL
/// matches chronological order.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn fmt_dec(value: Decimal) -> String {
    value.to_string()
}

fn fmt_dec_opt(value: Option<Decimal>) -> Option<String> {
    value.map(|v| v.to_string())
}

fn parse_dec(value: &str) -> Option<Decimal> {
    value.parse().ok()
}

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    #[diesel(column_name = "id")]
    id: i32,
}

/// Partial update for a trade set row. Unset fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct TradeSetPatch {
    pub status: Option<TradeSetStatus>,
    pub yes_order_id: Option<String>,
    pub no_order_id: Option<String>,
    pub yes_cost: Option<Decimal>,
    pub no_cost: Option<Decimal>,
    pub total_fees: Option<Decimal>,
    pub expected_payout: Option<Decimal>,
    pub realized_pnl: Option<Decimal>,
    pub resolution_outcome: Option<String>,
}

/// Rolling-window risk event counts, keyed by event kind.
#[derive(Debug, Clone, Default)]
pub struct RiskEventCounts {
    counts: HashMap<String, i64>,
}

impl RiskEventCounts {
    #[must_use]
    pub fn get(&self, kind: RiskEventKind) -> i64 {
        self.counts.get(kind.as_str()).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Aggregates over the opportunities table.
#[derive(Debug, Clone, Default)]
pub struct OpportunitySummary {
    pub total: i64,
    pub traded: i64,
    pub by_decision: Vec<(String, i64)>,
    pub mean_edge: Option<Decimal>,
    pub mean_sum_cost: Option<Decimal>,
}

impl OpportunitySummary {
    #[must_use]
    pub fn skipped(&self) -> i64 {
        self.total - self.traded
    }
}

/// Aggregates over the tradesets table.
#[derive(Debug, Clone, Default)]
pub struct TradeSetSummary {
    pub total: i64,
    pub by_status: Vec<(String, i64)>,
    pub total_pnl: Decimal,
    pub total_fees: Decimal,
}

/// The audit store every other component reads and writes.
pub struct Ledger {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Open (or create) the ledger at `path` and run migrations.
    pub fn open(path: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let pool = create_pool(path)?;
        run_migrations(&pool)?;
        Ok(Self { pool, clock })
    }

    /// In-memory ledger for tests and dry runs.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        Self::open(":memory:", clock)
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>> {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    /// Append one signal to `opportunities`. Every evaluation lands here,
    /// skips included.
    pub fn record_opportunity(&self, signal: &TradeSignal) -> Result<i32> {
        use schema::opportunities;

        let row = NewOpportunityRow {
            market_id: signal.market_id.to_string(),
            timestamp: fmt_ts(signal.timestamp),
            yes_ask: fmt_dec_opt(signal.yes_ask),
            no_ask: fmt_dec_opt(signal.no_ask),
            yes_size: fmt_dec_opt(signal.yes_size),
            no_size: fmt_dec_opt(signal.no_size),
            sum_cost: fmt_dec_opt(signal.sum_cost),
            edge: fmt_dec_opt(signal.edge),
            cost_buffer: fmt_dec(signal.cost_buffer),
            decision: signal.decision.as_str().to_string(),
            reason: signal.reason.clone(),
            created_at: fmt_ts(self.clock.now()),
        };

        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            diesel::insert_into(opportunities::table)
                .values(&row)
                .execute(conn)?;
            diesel::sql_query("SELECT last_insert_rowid() AS id")
                .get_result::<LastInsertRowId>(conn)
                .map(|row| row.id)
        })
        .map_err(|e| Error::Database(e.to_string()))
    }

    /// Open a new trade set in `pending`.
    pub fn create_tradeset(&self, market_id: &MarketId) -> Result<i32> {
        use schema::tradesets;

        let row = NewTradeSetRow {
            market_id: market_id.to_string(),
            status: TradeSetStatus::Pending.as_str().to_string(),
            expected_payout: None,
            created_at: fmt_ts(self.clock.now()),
        };

        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            diesel::insert_into(tradesets::table)
                .values(&row)
                .execute(conn)?;
            diesel::sql_query("SELECT last_insert_rowid() AS id")
                .get_result::<LastInsertRowId>(conn)
                .map(|row| row.id)
        })
        .map_err(|e| Error::Database(e.to_string()))
    }

    /// Apply a partial update to a trade set.
    ///
    /// Status changes are checked against the forward-only lifecycle; a
    /// backward transition is an error and leaves the row untouched.
    pub fn update_tradeset(&self, tradeset_id: i32, patch: &TradeSetPatch) -> Result<()> {
        use schema::tradesets::dsl;

        let mut conn = self.conn()?;

        if let Some(next) = patch.status {
            let current: String = dsl::tradesets
                .filter(dsl::id.eq(Some(tradeset_id)))
                .select(dsl::status)
                .first(&mut conn)
                .map_err(|e| Error::Database(e.to_string()))?;
            let current = TradeSetStatus::parse(&current)
                .ok_or_else(|| Error::Database(format!("unknown tradeset status: {current}")))?;
            if current != next && !current.can_transition_to(next) {
                return Err(Error::Database(format!(
                    "illegal tradeset transition {} -> {} for id {tradeset_id}",
                    current.as_str(),
                    next.as_str()
                )));
            }
        }

        let total_cost = match (patch.yes_cost, patch.no_cost) {
            (Some(yes), Some(no)) => Some(yes + no),
            _ => None,
        };

        let target = dsl::tradesets.filter(dsl::id.eq(Some(tradeset_id)));
        let now = fmt_ts(self.clock.now());

        // Diesel's changeset skips None fields, which is exactly the
        // partial-update contract wanted here.
        diesel::update(target)
            .set((
                patch
                    .status
                    .map(|s| dsl::status.eq(s.as_str().to_string())),
                patch.yes_order_id.clone().map(|v| dsl::yes_order_id.eq(v)),
                patch.no_order_id.clone().map(|v| dsl::no_order_id.eq(v)),
                fmt_dec_opt(patch.yes_cost).map(|v| dsl::yes_cost.eq(v)),
                fmt_dec_opt(patch.no_cost).map(|v| dsl::no_cost.eq(v)),
                fmt_dec_opt(total_cost).map(|v| dsl::total_cost.eq(v)),
                fmt_dec_opt(patch.total_fees).map(|v| dsl::total_fees.eq(v)),
                fmt_dec_opt(patch.expected_payout).map(|v| dsl::expected_payout.eq(v)),
                fmt_dec_opt(patch.realized_pnl).map(|v| dsl::realized_pnl.eq(v)),
                patch
                    .resolution_outcome
                    .clone()
                    .map(|v| dsl::resolution_outcome.eq(v)),
                dsl::updated_at.eq(Some(now)),
            ))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Record a market resolution on a filled trade set.
    pub fn record_resolution(
        &self,
        tradeset_id: i32,
        outcome: &str,
        realized_pnl: Option<Decimal>,
    ) -> Result<()> {
        self.update_tradeset(
            tradeset_id,
            &TradeSetPatch {
                status: Some(TradeSetStatus::Resolved),
                resolution_outcome: Some(outcome.to_string()),
                realized_pnl,
                ..TradeSetPatch::default()
            },
        )
    }

    /// Append a placed order.
    pub fn record_order(&self, order: &Order, tradeset_id: i32) -> Result<()> {
        use schema::orders;

        let row = NewOrderRow {
            order_id: order.id.to_string(),
            tradeset_id: Some(tradeset_id),
            market_id: order.market_id.to_string(),
            token_id: order.token_id.to_string(),
            side: order.side.as_str().to_string(),
            order_type: order.order_type.as_str().to_string(),
            price: fmt_dec(order.price),
            size: fmt_dec(order.size),
            status: order.status.as_str().to_string(),
            filled_size: fmt_dec(order.filled_size),
            avg_fill_price: fmt_dec_opt(order.avg_fill_price),
            fee: fmt_dec(order.fee),
            created_at: fmt_ts(self.clock.now()),
        };

        let mut conn = self.conn()?;
        diesel::insert_into(orders::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Reflect a venue status report onto an order row.
    pub fn update_order(&self, order: &Order) -> Result<()> {
        use schema::orders::dsl;

        let mut conn = self.conn()?;
        diesel::update(dsl::orders.filter(dsl::order_id.eq(order.id.as_str())))
            .set((
                dsl::status.eq(order.status.as_str().to_string()),
                dsl::filled_size.eq(fmt_dec(order.filled_size)),
                dsl::avg_fill_price.eq(fmt_dec_opt(order.avg_fill_price)),
                dsl::fee.eq(fmt_dec(order.fee)),
                dsl::updated_at.eq(Some(fmt_ts(self.clock.now()))),
            ))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Append an execution report.
    pub fn record_fill(&self, fill: &Fill) -> Result<()> {
        use schema::fills;

        let row = NewFillRow {
            fill_id: fill.fill_id.clone(),
            order_id: fill.order_id.to_string(),
            price: fmt_dec(fill.price),
            size: fmt_dec(fill.size),
            fee: fmt_dec(fill.fee),
            timestamp: fmt_ts(fill.timestamp),
            created_at: fmt_ts(self.clock.now()),
        };

        let mut conn = self.conn()?;
        diesel::insert_into(fills::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Append a typed risk event.
    pub fn record_risk_event(
        &self,
        kind: RiskEventKind,
        market_id: Option<&MarketId>,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        use schema::risk_events;

        let row = NewRiskEventRow {
            event_type: kind.as_str().to_string(),
            market_id: market_id.map(ToString::to_string),
            details: details.as_ref().map(ToString::to_string),
            created_at: fmt_ts(self.clock.now()),
        };

        let mut conn = self.conn()?;
        diesel::insert_into(risk_events::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Risk event counts within the trailing `window`, grouped by kind.
    pub fn risk_event_counts(&self, window: Duration) -> Result<RiskEventCounts> {
        use schema::risk_events::dsl;

        let cutoff = fmt_ts(self.clock.now() - window);
        let mut conn = self.conn()?;
        let rows: Vec<(String, i64)> = dsl::risk_events
            .filter(dsl::created_at.gt(cutoff))
            .group_by(dsl::event_type)
            .select((dsl::event_type, count_star()))
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(RiskEventCounts {
            counts: rows.into_iter().collect(),
        })
    }

    /// Totals by decision plus mean edge / sum cost over all evaluations.
    pub fn opportunity_summary(&self) -> Result<OpportunitySummary> {
        use schema::opportunities::dsl;

        let mut conn = self.conn()?;

        let by_decision: Vec<(String, i64)> = dsl::opportunities
            .group_by(dsl::decision)
            .select((dsl::decision, count_star()))
            .order_by(dsl::decision.asc())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        let total: i64 = by_decision.iter().map(|(_, n)| n).sum();
        let traded = by_decision
            .iter()
            .find(|(decision, _)| decision == "TRADE")
            .map_or(0, |(_, n)| *n);

        let edges: Vec<Option<String>> = dsl::opportunities
            .filter(dsl::edge.is_not_null())
            .select(dsl::edge)
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        let costs: Vec<Option<String>> = dsl::opportunities
            .filter(dsl::sum_cost.is_not_null())
            .select(dsl::sum_cost)
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(OpportunitySummary {
            total,
            traded,
            by_decision,
            mean_edge: mean_of(&edges),
            mean_sum_cost: mean_of(&costs),
        })
    }

    /// Totals by status plus realized PnL and fee sums.
    pub fn tradeset_summary(&self) -> Result<TradeSetSummary> {
        use schema::tradesets::dsl;

        let mut conn = self.conn()?;

        let by_status: Vec<(String, i64)> = dsl::tradesets
            .group_by(dsl::status)
            .select((dsl::status, count_star()))
            .order_by(dsl::status.asc())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        let total: i64 = by_status.iter().map(|(_, n)| n).sum();

        let pnls: Vec<Option<String>> = dsl::tradesets
            .filter(dsl::realized_pnl.is_not_null())
            .select(dsl::realized_pnl)
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        let fees: Vec<Option<String>> = dsl::tradesets
            .filter(dsl::total_fees.is_not_null())
            .select(dsl::total_fees)
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(TradeSetSummary {
            total,
            by_status,
            total_pnl: sum_of(&pnls),
            total_fees: sum_of(&fees),
        })
    }

    /// Load one trade set by id.
    pub fn tradeset(&self, tradeset_id: i32) -> Result<Option<TradeSet>> {
        use schema::tradesets::dsl;

        let mut conn = self.conn()?;
        let row: Option<TradeSetRow> = dsl::tradesets
            .filter(dsl::id.eq(Some(tradeset_id)))
            .select(TradeSetRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(|row| {
            let status = TradeSetStatus::parse(&row.status)
                .ok_or_else(|| Error::Database(format!("unknown tradeset status: {}", row.status)))?;
            Ok(TradeSet {
                id: row.id.unwrap_or(tradeset_id),
                market_id: MarketId::new(row.market_id),
                status,
                yes_order_id: row.yes_order_id,
                no_order_id: row.no_order_id,
                yes_cost: row.yes_cost.as_deref().and_then(parse_dec),
                no_cost: row.no_cost.as_deref().and_then(parse_dec),
                total_fees: row.total_fees.as_deref().and_then(parse_dec),
                expected_payout: row.expected_payout.as_deref().and_then(parse_dec),
                realized_pnl: row.realized_pnl.as_deref().and_then(parse_dec),
                resolution_outcome: row.resolution_outcome,
            })
        })
        .transpose()
    }

    /// Total opportunity row count.
    pub fn opportunity_count(&self) -> Result<i64> {
        use schema::opportunities::dsl;

        let mut conn = self.conn()?;
        dsl::opportunities
            .count()
            .get_result(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))
    }
}

fn decimals_of(values: &[Option<String>]) -> Vec<Decimal> {
    values
        .iter()
        .flatten()
        .filter_map(|raw| {
            let parsed = parse_dec(raw);
            if parsed.is_none() {
                warn!(raw = %raw, "Unparseable decimal in ledger");
            }
            parsed
        })
        .collect()
}

fn mean_of(values: &[Option<String>]) -> Option<Decimal> {
    let decimals = decimals_of(values);
    if decimals.is_empty() {
        return None;
    }
    let count = Decimal::from(decimals.len() as u64);
    Some(decimals.iter().sum::<Decimal>() / count)
}

fn sum_of(values: &[Option<String>]) -> Decimal {
    decimals_of(values).iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Integration-level coverage lives in tests/ledger_tests.rs.

    #[test]
    fn timestamps_are_fixed_width() {
        let ts = chrono::Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap();
        assert_eq!(fmt_ts(ts), "2025-06-20T12:00:00.000000Z");
    }

    #[test]
    fn mean_ignores_unparseable_rows() {
        let values = vec![
            Some("0.01".to_string()),
            Some("0.03".to_string()),
            Some("bogus".to_string()),
            None,
        ];
        assert_eq!(mean_of(&values), Some(Decimal::new(2, 2)));
    }

    #[test]
    fn sum_is_zero_for_empty_input() {
        assert_eq!(sum_of(&[]), Decimal::ZERO);
    }
}
