//! Ledger behavior: summaries, rolling windows, forward-only trade set
//! lifecycle, and order/fill persistence.

mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};
use diesel::prelude::*;
use pairlock::clock::{Clock, SimClock};
use pairlock::domain::{
    Fill, MarketId, Order, OrderId, OrderRequest, OrderSide, OrderStatus, OrderType,
    RiskEventKind, SignalDecision, TokenId, TradeSetStatus, TradeSignal,
};
use pairlock::ledger::{Ledger, TradeSetPatch};
use rust_decimal_macros::dec;

fn ledger() -> (Arc<SimClock>, Ledger) {
    let clock = Arc::new(SimClock::new(support::start_time()));
    let ledger = Ledger::in_memory(clock.clone() as Arc<dyn Clock>).unwrap();
    (clock, ledger)
}

fn signal(decision: SignalDecision, edge: Option<rust_decimal::Decimal>) -> TradeSignal {
    TradeSignal {
        market_id: MarketId::new("mkt-1"),
        timestamp: support::start_time(),
        decision,
        yes_ask: Some(dec!(0.45)),
        no_ask: Some(dec!(0.50)),
        yes_size: Some(dec!(100)),
        no_size: Some(dec!(100)),
        sum_cost: Some(dec!(0.95)),
        edge,
        cost_buffer: dec!(0.005),
        reason: "test".into(),
    }
}

#[test]
fn opportunity_summary_aggregates_by_decision() {
    let (_clock, ledger) = ledger();

    ledger
        .record_opportunity(&signal(SignalDecision::Trade, Some(dec!(0.026))))
        .unwrap();
    ledger
        .record_opportunity(&signal(SignalDecision::SkipInsufficientEdge, Some(dec!(-0.02))))
        .unwrap();
    ledger
        .record_opportunity(&signal(SignalDecision::SkipInCooldown, None))
        .unwrap();

    let summary = ledger.opportunity_summary().unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.traded, 1);
    assert_eq!(summary.skipped(), 2);
    // Mean over the two rows that carry an edge.
    assert_eq!(summary.mean_edge, Some(dec!(0.003)));
    assert_eq!(summary.mean_sum_cost, Some(dec!(0.95)));
    assert!(summary
        .by_decision
        .iter()
        .any(|(d, n)| d == "SKIP_IN_COOLDOWN" && *n == 1));
}

#[test]
fn zero_edge_rows_are_stored_not_dropped() {
    let (_clock, ledger) = ledger();
    ledger
        .record_opportunity(&signal(SignalDecision::Trade, Some(dec!(0))))
        .unwrap();

    let summary = ledger.opportunity_summary().unwrap();
    assert_eq!(summary.mean_edge, Some(dec!(0)));
}

#[test]
fn tradeset_lifecycle_is_forward_only() {
    let (_clock, ledger) = ledger();
    let id = ledger.create_tradeset(&MarketId::new("mkt-1")).unwrap();

    ledger
        .update_tradeset(
            id,
            &TradeSetPatch {
                status: Some(TradeSetStatus::Filled),
                yes_cost: Some(dec!(4.5)),
                no_cost: Some(dec!(5.0)),
                ..TradeSetPatch::default()
            },
        )
        .unwrap();

    // Backwards and sideways transitions are refused.
    for bad in [TradeSetStatus::Pending, TradeSetStatus::PartialFill, TradeSetStatus::Failed] {
        let result = ledger.update_tradeset(
            id,
            &TradeSetPatch {
                status: Some(bad),
                ..TradeSetPatch::default()
            },
        );
        assert!(result.is_err(), "transition to {bad:?} should fail");
    }
    let row = ledger.tradeset(id).unwrap().unwrap();
    assert_eq!(row.status, TradeSetStatus::Filled);
    assert_eq!(row.yes_cost, Some(dec!(4.5)));

    // Filled -> resolved is the one legal continuation.
    ledger.record_resolution(id, "YES", Some(dec!(0.31))).unwrap();
    let row = ledger.tradeset(id).unwrap().unwrap();
    assert_eq!(row.status, TradeSetStatus::Resolved);
    assert_eq!(row.resolution_outcome.as_deref(), Some("YES"));
}

#[test]
fn tradeset_total_cost_is_derived_from_both_legs() {
    let (_clock, ledger) = ledger();
    let id = ledger.create_tradeset(&MarketId::new("mkt-1")).unwrap();
    ledger
        .update_tradeset(
            id,
            &TradeSetPatch {
                status: Some(TradeSetStatus::Filled),
                yes_cost: Some(dec!(4.5)),
                no_cost: Some(dec!(5.0)),
                total_fees: Some(dec!(0.19)),
                realized_pnl: Some(dec!(0.31)),
                ..TradeSetPatch::default()
            },
        )
        .unwrap();

    use pairlock::ledger::schema::tradesets::dsl;
    let mut conn = ledger.pool().get().unwrap();
    let total_cost: Option<String> = dsl::tradesets
        .filter(dsl::id.eq(Some(id)))
        .select(dsl::total_cost)
        .first(&mut conn)
        .unwrap();
    assert_eq!(total_cost.as_deref(), Some("9.5"));
}

#[test]
fn risk_event_window_slides_with_the_clock() {
    let (clock, ledger) = ledger();

    ledger
        .record_risk_event(RiskEventKind::Reject, None, None)
        .unwrap();
    clock.advance(Duration::minutes(30));
    ledger
        .record_risk_event(RiskEventKind::Reject, None, None)
        .unwrap();

    let counts = ledger.risk_event_counts(Duration::hours(1)).unwrap();
    assert_eq!(counts.get(RiskEventKind::Reject), 2);

    // 45 minutes later the first event has left the window.
    clock.advance(Duration::minutes(45));
    let counts = ledger.risk_event_counts(Duration::hours(1)).unwrap();
    assert_eq!(counts.get(RiskEventKind::Reject), 1);

    clock.advance(Duration::hours(1));
    let counts = ledger.risk_event_counts(Duration::hours(1)).unwrap();
    assert_eq!(counts.get(RiskEventKind::Reject), 0);
}

#[test]
fn orders_and_fills_round_trip() {
    let (_clock, ledger) = ledger();
    let tradeset_id = ledger.create_tradeset(&MarketId::new("mkt-1")).unwrap();

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
        OrderStatus::Open,
        support::start_time(),
    );
    ledger.record_order(&order, tradeset_id).unwrap();

    order.status = OrderStatus::Filled;
    order.filled_size = dec!(10);
    order.avg_fill_price = Some(dec!(0.45));
    order.fee = dec!(0.09);
    ledger.update_order(&order).unwrap();

    ledger
        .record_fill(&Fill {
            fill_id: "fill-1".into(),
            order_id: order.id.clone(),
            price: dec!(0.45),
            size: dec!(10),
            fee: dec!(0.09),
            timestamp: Utc::now(),
        })
        .unwrap();

    use pairlock::ledger::schema::{fills, orders};
    let mut conn = ledger.pool().get().unwrap();
    let (status, filled): (String, String) = orders::dsl::orders
        .filter(orders::dsl::order_id.eq("ord-1"))
        .select((orders::dsl::status, orders::dsl::filled_size))
        .first(&mut conn)
        .unwrap();
    assert_eq!(status, "FILLED");
    assert_eq!(filled, "10");

    let fill_count: i64 = fills::dsl::fills
        .filter(fills::dsl::order_id.eq("ord-1"))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(fill_count, 1);
}

#[test]
fn tradeset_summary_sums_pnl_and_fees() {
    let (_clock, ledger) = ledger();
    for (pnl, fees) in [(dec!(0.31), dec!(0.19)), (dec!(0.10), dec!(0.05))] {
        let id = ledger.create_tradeset(&MarketId::new("mkt-1")).unwrap();
        ledger
            .update_tradeset(
                id,
                &TradeSetPatch {
                    status: Some(TradeSetStatus::Filled),
                    realized_pnl: Some(pnl),
                    total_fees: Some(fees),
                    ..TradeSetPatch::default()
                },
            )
            .unwrap();
    }

    let summary = ledger.tradeset_summary().unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.total_pnl, dec!(0.41));
    assert_eq!(summary.total_fees, dec!(0.24));
    assert!(summary
        .by_status
        .iter()
        .any(|(status, n)| status == "filled" && *n == 2));
}
