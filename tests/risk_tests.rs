//! Kill-switch scenarios: threshold latching, idempotent trigger events,
//! reset semantics, and the interaction with halt_on_partial_fill.

mod support;

use chrono::Duration;
use pairlock::config::{ExecutionConfig, RiskConfig};
use pairlock::domain::{RiskEventKind, TokenId};
use pairlock::venue::OrderScript;
use rust_decimal_macros::dec;
use support::{build_pipeline, PipelineOptions};

fn live_options(risk: RiskConfig) -> PipelineOptions {
    PipelineOptions {
        paper_mode: false,
        execution: ExecutionConfig {
            poll_interval_ms: 5,
            ..ExecutionConfig::default()
        },
        risk,
        ..PipelineOptions::default()
    }
}

#[tokio::test]
async fn repeated_rejects_latch_the_kill_switch() {
    // halt_on_partial_fill stays off so the reject threshold, not the
    // per-incident halt, is what stops the engine.
    let pipeline = build_pipeline(live_options(RiskConfig {
        max_rejects_per_hour: 3,
        halt_on_partial_fill: false,
        ..RiskConfig::default()
    }));
    let no_token = TokenId::new("no-1");

    // Three attempts, each rejected on the NO leg.
    for round in 0..3 {
        pipeline.venue.script_order(&no_token, OrderScript::Reject);
        pipeline
            .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
            .await;
        pipeline.clock.advance(Duration::seconds(3));
        assert_eq!(
            pipeline.ledger.tradeset_summary().unwrap().total,
            i64::from(round) + 1
        );
    }

    let counts = pipeline
        .ledger
        .risk_event_counts(Duration::hours(1))
        .unwrap();
    assert_eq!(counts.get(RiskEventKind::Reject), 3);

    // The threshold is evaluated on the next book update, which latches the
    // switch and halts the engine before the signal can execute.
    pipeline
        .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
        .await;
    assert!(pipeline.kill_switch.is_triggered());
    assert!(pipeline.executor.is_halted());
    assert_eq!(pipeline.ledger.tradeset_summary().unwrap().total, 3);

    let counts = pipeline
        .ledger
        .risk_event_counts(Duration::hours(1))
        .unwrap();
    assert_eq!(counts.get(RiskEventKind::KillSwitch), 1);
}

#[tokio::test]
async fn latched_switch_records_one_event_across_many_updates() {
    let pipeline = build_pipeline(live_options(RiskConfig {
        max_ws_disconnects_per_hour: 1,
        ..RiskConfig::default()
    }));

    pipeline
        .orchestrator
        .handle_event(pairlock::venue::VenueEvent::Disconnected { attempt: 1 })
        .await;

    for _ in 0..5 {
        pipeline.clock.advance(Duration::seconds(1));
        pipeline
            .feed_quotes(dec!(0.55), dec!(100), dec!(0.50), dec!(100))
            .await;
    }

    assert!(pipeline.kill_switch.is_triggered());
    let counts = pipeline
        .ledger
        .risk_event_counts(Duration::hours(1))
        .unwrap();
    assert_eq!(counts.get(RiskEventKind::KillSwitch), 1);
}

#[tokio::test]
async fn partial_fill_threshold_is_authoritative_without_the_halt_flag() {
    // halt_on_partial_fill = false: individual partial fills do not halt,
    // but the rolling threshold still latches the switch.
    let pipeline = build_pipeline(live_options(RiskConfig {
        halt_on_partial_fill: false,
        max_partial_fills_per_hour: 2,
        ..RiskConfig::default()
    }));
    let no_token = TokenId::new("no-1");

    for _ in 0..2 {
        pipeline
            .venue
            .script_order(&no_token, OrderScript::PartialFill(dec!(0.4)));
        pipeline
            .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
            .await;
        pipeline.clock.advance(Duration::seconds(3));
    }
    // No immediate halt from the flag itself.
    let counts = pipeline
        .ledger
        .risk_event_counts(Duration::hours(1))
        .unwrap();
    assert_eq!(counts.get(RiskEventKind::PartialFill), 2);

    pipeline
        .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
        .await;
    assert!(pipeline.kill_switch.is_triggered());
    assert!(pipeline.executor.is_halted());
}

#[tokio::test]
async fn reset_lets_the_engine_trade_again() {
    let pipeline = build_pipeline(live_options(RiskConfig::default()));

    pipeline.kill_switch.trip_manual("operator drill");
    pipeline.executor.halt();
    pipeline
        .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
        .await;
    assert_eq!(pipeline.ledger.tradeset_summary().unwrap().total, 0);

    pipeline.kill_switch.reset();
    pipeline.executor.resume();
    pipeline.clock.advance(Duration::seconds(3));
    pipeline
        .feed_quotes(dec!(0.45), dec!(100), dec!(0.50), dec!(100))
        .await;
    assert_eq!(pipeline.ledger.tradeset_summary().unwrap().total, 1);
}
