//! End-to-end pipeline scenarios over the scripted mock venue.

mod support;

use chrono::Duration;
use pairlock::clock::Clock;
use pairlock::domain::{TokenId, TradeSetStatus};
use pairlock::venue::VenueEvent;
use rust_decimal_macros::dec;
use support::{build_pipeline, snapshot, PipelineOptions};

#[tokio::test]
async fn clear_arbitrage_executes_a_paper_complete_set() {
    let pipeline = build_pipeline(PipelineOptions::default());

    // YES ask 0.45, NO ask 0.50: sum 0.95, fees 0.019, edge 0.026.
    pipeline
        .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
        .await;

    let decisions = support::recorded_decisions(&pipeline.ledger);
    assert_eq!(decisions, vec!["SKIP_NO_QUOTES", "TRADE"]);

    let tradeset = pipeline.ledger.tradeset(1).unwrap().expect("tradeset row");
    assert_eq!(tradeset.status, TradeSetStatus::Filled);
    // 10 * 1 - 4.5 - 5.0 - (4.5 + 5.0) * 0.02 = 0.31
    assert_eq!(tradeset.realized_pnl, Some(dec!(0.31)));
    assert_eq!(tradeset.yes_cost, Some(dec!(4.50)));
    assert_eq!(tradeset.no_cost, Some(dec!(5.00)));
    assert_eq!(tradeset.total_fees, Some(dec!(0.190)));
    assert_eq!(tradeset.expected_payout, Some(dec!(10)));
    assert_eq!(tradeset.yes_order_id.as_deref(), Some("paper-yes-1"));
    assert_eq!(tradeset.no_order_id.as_deref(), Some("paper-no-1"));

    let summary = pipeline.ledger.tradeset_summary().unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.total_pnl, dec!(0.31));
}

#[tokio::test]
async fn fair_quotes_are_skipped_for_edge() {
    let pipeline = build_pipeline(PipelineOptions::default());

    pipeline
        .feed_quotes(dec!(0.55), dec!(100), dec!(0.50), dec!(100))
        .await;

    let decisions = support::recorded_decisions(&pipeline.ledger);
    assert_eq!(decisions.last().unwrap(), "SKIP_INSUFFICIENT_EDGE");
    assert_eq!(pipeline.ledger.tradeset_summary().unwrap().total, 0);
}

#[tokio::test]
async fn shallow_quotes_are_skipped_for_depth_and_name_it() {
    let pipeline = build_pipeline(PipelineOptions::default());

    pipeline
        .feed_quotes(dec!(0.40), dec!(5), dec!(0.45), dec!(100))
        .await;

    let reasons = support::recorded_reasons(&pipeline.ledger);
    let (decision, reason) = reasons.last().unwrap();
    assert_eq!(decision, "SKIP_INSUFFICIENT_DEPTH");
    assert!(reason.contains('5'), "reason should name the depth: {reason}");
    assert_eq!(pipeline.ledger.tradeset_summary().unwrap().total, 0);
}

#[tokio::test]
async fn cooldown_gates_the_retry_then_expires() {
    let pipeline = build_pipeline(PipelineOptions::default());

    pipeline
        .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
        .await;
    assert_eq!(pipeline.ledger.tradeset_summary().unwrap().total, 1);

    // Identical arb quote inside cooldown_seconds: skipped.
    pipeline.clock.advance(Duration::seconds(1));
    pipeline
        .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
        .await;
    let decisions = support::recorded_decisions(&pipeline.ledger);
    assert_eq!(decisions.last().unwrap(), "SKIP_IN_COOLDOWN");
    assert_eq!(pipeline.ledger.tradeset_summary().unwrap().total, 1);

    // After expiry the same quote trades again (liveness). The trailing NO
    // event lands inside the fresh cooldown, so count TRADE decisions
    // rather than looking at the last row.
    pipeline.clock.advance(Duration::seconds(2));
    pipeline
        .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
        .await;
    let decisions = support::recorded_decisions(&pipeline.ledger);
    assert_eq!(decisions.iter().filter(|d| *d == "TRADE").count(), 2);
    assert_eq!(pipeline.ledger.tradeset_summary().unwrap().total, 2);
}

#[tokio::test]
async fn every_accepted_update_lands_one_opportunity_row() {
    let pipeline = build_pipeline(PipelineOptions::default());
    let now = pipeline.clock.now();

    // Two accepted updates.
    pipeline
        .feed_quotes(dec!(0.55), dec!(100), dec!(0.50), dec!(100))
        .await;
    // Unregistered token: dropped.
    pipeline
        .orchestrator
        .handle_event(VenueEvent::Book(snapshot(
            &TokenId::new("stranger"),
            dec!(0.40),
            dec!(100),
            now,
        )))
        .await;
    // Stale (older timestamp): dropped.
    pipeline
        .orchestrator
        .handle_event(VenueEvent::Book(snapshot(
            &support::market_info().yes_token_id,
            dec!(0.10),
            dec!(100),
            now - Duration::seconds(30),
        )))
        .await;

    assert_eq!(pipeline.ledger.opportunity_count().unwrap(), 2);
}

#[tokio::test]
async fn disconnect_events_become_risk_events() {
    let pipeline = build_pipeline(PipelineOptions::default());

    pipeline
        .orchestrator
        .handle_event(VenueEvent::Disconnected { attempt: 1 })
        .await;
    pipeline
        .orchestrator
        .handle_event(VenueEvent::Disconnected { attempt: 2 })
        .await;

    let counts = pipeline
        .ledger
        .risk_event_counts(Duration::hours(1))
        .unwrap();
    assert_eq!(counts.get(pairlock::domain::RiskEventKind::WsDisconnect), 2);
}

#[tokio::test]
async fn fill_events_land_in_the_fills_table() {
    use pairlock::domain::{MarketId, OrderRequest, OrderSide, OrderType};
    use pairlock::venue::VenueAdapter;

    let pipeline = build_pipeline(PipelineOptions::default());

    // A fill report the venue would emit for one of our orders.
    let order = pipeline
        .venue
        .place_order(OrderRequest {
            market_id: MarketId::new("mkt-1"),
            token_id: TokenId::new("yes-1"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            price: dec!(0.45),
            size: dec!(10),
        })
        .await
        .unwrap();
    let fill = pairlock::venue::mock::fill_for(&order, pipeline.clock.now());

    pipeline
        .orchestrator
        .handle_event(VenueEvent::Fill(fill))
        .await;

    use diesel::prelude::*;
    use pairlock::ledger::schema::fills::dsl;
    let mut conn = pipeline.ledger.pool().get().unwrap();
    let count: i64 = dsl::fills.count().get_result(&mut conn).unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn identical_scripts_replay_to_identical_ledgers() {
    let mut dumps = Vec::new();
    for _ in 0..2 {
        let pipeline = build_pipeline(PipelineOptions::default());
        pipeline
            .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
            .await;
        pipeline.clock.advance(Duration::seconds(5));
        pipeline
            .feed_quotes(dec!(0.52), dec!(80), dec!(0.50), dec!(60))
            .await;
        pipeline.clock.advance(Duration::seconds(5));
        pipeline
            .feed_quotes(dec!(0.44), dec!(90), dec!(0.50), dec!(90))
            .await;
        dumps.push(support::dump_ledger(&pipeline.ledger));
    }
    assert_eq!(dumps[0], dumps[1]);
}

#[tokio::test]
async fn trade_signal_edge_arithmetic_closes() {
    let pipeline = build_pipeline(PipelineOptions::default());
    pipeline
        .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
        .await;

    use diesel::prelude::*;
    use pairlock::ledger::schema::opportunities::dsl;
    let mut conn = pipeline.ledger.pool().get().unwrap();
    let (yes_ask, no_ask, edge, cost_buffer): (
        Option<String>,
        Option<String>,
        Option<String>,
        String,
    ) = dsl::opportunities
        .filter(dsl::decision.eq("TRADE"))
        .select((dsl::yes_ask, dsl::no_ask, dsl::edge, dsl::cost_buffer))
        .first(&mut conn)
        .unwrap();

    let yes: rust_decimal::Decimal = yes_ask.unwrap().parse().unwrap();
    let no: rust_decimal::Decimal = no_ask.unwrap().parse().unwrap();
    let edge: rust_decimal::Decimal = edge.unwrap().parse().unwrap();
    let buffer: rust_decimal::Decimal = cost_buffer.parse().unwrap();
    let fee = (yes + no) * dec!(0.02);

    assert_eq!(yes + no + fee + buffer + edge, dec!(1));
}
