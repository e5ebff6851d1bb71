//! The pipeline: one task consuming the venue event stream.
//!
//! Per accepted book update: apply to state, check the kill switch, evaluate
//! the signal, record it, and execute when it says TRADE. Fills and
//! disconnects only touch the ledger. Everything runs on this single task,
//! so gating state never races across markets.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::book::{ApplyOutcome, BookState};
use crate::clock::Clock;
use crate::domain::{BookSnapshot, Fill, RiskEventKind};
use crate::execution::ExecutionEngine;
use crate::ledger::Ledger;
use crate::risk::KillSwitch;
use crate::signal::SignalEngine;
use crate::venue::VenueEvent;

/// Wires adapter events into the evaluate/execute pipeline.
pub struct Orchestrator {
    books: Arc<BookState>,
    signals: Arc<SignalEngine>,
    executor: Arc<ExecutionEngine>,
    kill_switch: Arc<KillSwitch>,
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        books: Arc<BookState>,
        signals: Arc<SignalEngine>,
        executor: Arc<ExecutionEngine>,
        kill_switch: Arc<KillSwitch>,
        ledger: Arc<Ledger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            books,
            signals,
            executor,
            kill_switch,
            ledger,
            clock,
        }
    }

    /// Consume events until the stream ends or shutdown is signalled. An
    /// event in hand is always finished before the loop exits.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<VenueEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Pipeline stopping on shutdown signal");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Event stream ended");
                        break;
                    }
                }
            }
        }
    }

    /// Process one venue event. Public so tests can drive the pipeline
    /// without sockets.
    pub async fn handle_event(&self, event: VenueEvent) {
        match event {
            VenueEvent::Book(snapshot) => self.handle_book(snapshot).await,
            VenueEvent::Fill(fill) => self.handle_fill(&fill),
            VenueEvent::Disconnected { attempt } => {
                warn!(attempt, "Market data disconnected");
                if let Err(e) = self.ledger.record_risk_event(
                    RiskEventKind::WsDisconnect,
                    None,
                    Some(serde_json::json!({ "attempt": attempt })),
                ) {
                    warn!(error = %e, "Failed to record ws_disconnect");
                }
            }
        }
    }

    async fn handle_book(&self, snapshot: BookSnapshot) {
        let market_id = match self.books.apply_snapshot(&snapshot) {
            ApplyOutcome::Updated(market_id) => market_id,
            ApplyOutcome::Stale => {
                debug!(token_id = %snapshot.token_id, "Stale update dropped");
                return;
            }
            ApplyOutcome::Unknown => {
                debug!(token_id = %snapshot.token_id, "Update for unregistered token dropped");
                return;
            }
        };

        // Cheap bounded aggregate; runs on every accepted update. A trip
        // halts the executor, but the signal below is still evaluated and
        // recorded.
        if self.kill_switch.check() && !self.executor.is_halted() {
            self.executor.halt();
        }

        let Some(market) = self.books.read(&market_id) else {
            return;
        };

        let signal = self.signals.evaluate(&market, self.clock.now());
        if let Err(e) = self.ledger.record_opportunity(&signal) {
            warn!(market_id = %market_id, error = %e, "Failed to record opportunity");
        }

        if signal.is_tradeable() && !self.executor.is_halted() {
            info!(
                market_id = %market_id,
                edge = ?signal.edge,
                "Trade signal, executing"
            );
            let outcome = self.executor.execute(&signal, &market).await;
            if outcome.success {
                info!(
                    market_id = %market_id,
                    tradeset_id = ?outcome.tradeset_id,
                    "Attempt succeeded"
                );
            } else {
                warn!(
                    market_id = %market_id,
                    tradeset_id = ?outcome.tradeset_id,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Attempt failed"
                );
            }
        }
    }

    fn handle_fill(&self, fill: &Fill) {
        debug!(order_id = %fill.order_id, size = %fill.size, "Fill reported");
        if let Err(e) = self.ledger.record_fill(fill) {
            warn!(order_id = %fill.order_id, error = %e, "Failed to record fill");
        }
    }
}
