//! Kill switch: latching global halt driven by rolling risk-event counts.
//!
//! Reads the last hour of risk events from the ledger on every check (the
//! counts are cheap indexed aggregates). Once tripped it stays tripped until
//! an operator reset; the trip itself is recorded as a `kill_switch` event,
//! exactly once per latched cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::config::RiskConfig;
use crate::domain::RiskEventKind;
use crate::ledger::Ledger;

/// Latching halt trigger.
pub struct KillSwitch {
    ledger: Arc<Ledger>,
    config: RiskConfig,
    triggered: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl KillSwitch {
    #[must_use]
    pub fn new(ledger: Arc<Ledger>, config: RiskConfig) -> Self {
        Self {
            ledger,
            config,
            triggered: AtomicBool::new(false),
            reason: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn trigger_reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Evaluate the rolling-hour thresholds; trip when any is met.
    /// Returns the latched state.
    pub fn check(&self) -> bool {
        if self.is_triggered() {
            return true;
        }

        let counts = match self.ledger.risk_event_counts(Duration::hours(1)) {
            Ok(counts) => counts,
            Err(e) => {
                // Fail towards trading: a broken ledger read should not halt
                // the engine on its own, it just loses this check.
                warn!(error = %e, "Kill-switch count query failed");
                return false;
            }
        };

        let partial_fills = counts.get(RiskEventKind::PartialFill);
        if partial_fills >= self.config.max_partial_fills_per_hour {
            self.trip(format!("too many partial fills: {partial_fills} in the last hour"));
            return true;
        }

        let rejects = counts.get(RiskEventKind::Reject);
        if rejects >= self.config.max_rejects_per_hour {
            self.trip(format!("too many order rejects: {rejects} in the last hour"));
            return true;
        }

        let disconnects = counts.get(RiskEventKind::WsDisconnect);
        if disconnects >= self.config.max_ws_disconnects_per_hour {
            self.trip(format!(
                "too many websocket disconnects: {disconnects} in the last hour"
            ));
            return true;
        }

        false
    }

    /// Operator-initiated trip.
    pub fn trip_manual(&self, reason: impl Into<String>) {
        self.trip(reason.into());
    }

    fn trip(&self, reason: String) {
        // Idempotent: only the first trip per cycle records the event.
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }

        error!(reason = %reason, "KILL SWITCH TRIGGERED");
        *self.reason.write() = Some(reason.clone());

        if let Err(e) = self.ledger.record_risk_event(
            RiskEventKind::KillSwitch,
            None,
            Some(serde_json::json!({ "reason": reason })),
        ) {
            warn!(error = %e, "Failed to record kill_switch event");
        }
    }

    /// Operator reset. The rolling counts are unchanged, so a reset into a
    /// still-breaching window will re-trip on the next check.
    pub fn reset(&self) {
        if self.triggered.swap(false, Ordering::SeqCst) {
            let reason = self.reason.write().take();
            info!(was = reason.as_deref().unwrap_or("unknown"), "Kill switch reset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;
    use chrono::TimeZone;

    fn setup() -> (Arc<Ledger>, KillSwitch) {
        let start = chrono::Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap();
        let clock = Arc::new(SimClock::new(start));
        let ledger = Arc::new(Ledger::in_memory(clock).unwrap());
        let config = RiskConfig {
            max_partial_fills_per_hour: 2,
            ..RiskConfig::default()
        };
        let switch = KillSwitch::new(ledger.clone(), config);
        (ledger, switch)
    }

    #[test]
    fn trips_at_the_partial_fill_threshold() {
        let (ledger, switch) = setup();
        assert!(!switch.check());

        ledger
            .record_risk_event(RiskEventKind::PartialFill, None, None)
            .unwrap();
        assert!(!switch.check());

        ledger
            .record_risk_event(RiskEventKind::PartialFill, None, None)
            .unwrap();
        assert!(switch.check());
        assert!(switch.is_triggered());
        assert!(switch.trigger_reason().unwrap().contains("partial fills"));
    }

    #[test]
    fn trip_records_exactly_one_kill_switch_event() {
        let (ledger, switch) = setup();
        for _ in 0..3 {
            ledger
                .record_risk_event(RiskEventKind::PartialFill, None, None)
                .unwrap();
        }

        assert!(switch.check());
        assert!(switch.check());
        switch.trip_manual("again");

        let counts = ledger.risk_event_counts(Duration::hours(1)).unwrap();
        assert_eq!(counts.get(RiskEventKind::KillSwitch), 1);
    }

    #[test]
    fn reset_clears_the_latch() {
        let (_ledger, switch) = setup();
        switch.trip_manual("operator test");
        assert!(switch.is_triggered());

        switch.reset();
        assert!(!switch.is_triggered());
        assert!(switch.trigger_reason().is_none());
    }

    #[test]
    fn reset_in_a_breaching_window_re_trips_on_check() {
        let (ledger, switch) = setup();
        for _ in 0..2 {
            ledger
                .record_risk_event(RiskEventKind::PartialFill, None, None)
                .unwrap();
        }
        assert!(switch.check());
        switch.reset();

        assert!(switch.check());
        let counts = ledger.risk_event_counts(Duration::hours(1)).unwrap();
        // A fresh latch cycle records a fresh event.
        assert_eq!(counts.get(RiskEventKind::KillSwitch), 2);
    }
}
