//! Execution engine: the paired-order state machine.
//!
//! One attempt walks IDLE → SIGNAL_DETECTED → PLACING_ORDERS →
//! WAITING_FILLS → {SUCCESS | PARTIAL_FILL_PROTECT | FAILED} → COOLDOWN →
//! IDLE. The YES leg is always placed first so post-mortems read the same
//! way every time; exposure is symmetric either way.
//!
//! The venue cannot place two orders atomically, so the engine defends the
//! gap: a rejected first leg aborts with no exposure, anything that goes
//! wrong after the first leg enters partial-fill protection, which cancels
//! whatever is still live and never tries to offset what already filled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{ExecutionConfig, RiskConfig};
use crate::domain::{
    MarketBook, MarketId, Order, OrderId, OrderRequest, OrderSide, OrderStatus, OrderType,
    RiskEventKind, TradeSetStatus, TradeSignal,
};
use crate::ledger::{Ledger, TradeSetPatch};
use crate::risk::KillSwitch;
use crate::signal::SignalEngine;
use crate::venue::VenueAdapter;

/// Per-market execution state, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    SignalDetected,
    PlacingOrders,
    WaitingFills,
    Success,
    PartialFillProtect,
    Failed,
    Cooldown,
}

impl ExecutionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::SignalDetected => "SIGNAL_DETECTED",
            Self::PlacingOrders => "PLACING_ORDERS",
            Self::WaitingFills => "WAITING_FILLS",
            Self::Success => "SUCCESS",
            Self::PartialFillProtect => "PARTIAL_FILL_PROTECT",
            Self::Failed => "FAILED",
            Self::Cooldown => "COOLDOWN",
        }
    }
}

/// Result of one attempt.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub tradeset_id: Option<i32>,
    pub yes_order: Option<Order>,
    pub no_order: Option<Order>,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    fn failure(tradeset_id: Option<i32>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            tradeset_id,
            yes_order: None,
            no_order: None,
            error: Some(error.into()),
        }
    }
}

struct DailyNotional {
    day: NaiveDate,
    spent: Decimal,
}

/// Drives paired orders for complete-set acquisitions.
pub struct ExecutionEngine {
    venue: Arc<dyn VenueAdapter>,
    signals: Arc<SignalEngine>,
    ledger: Arc<Ledger>,
    kill_switch: Arc<KillSwitch>,
    execution_config: ExecutionConfig,
    risk_config: RiskConfig,
    clock: Arc<dyn Clock>,
    paper_mode: bool,
    states: RwLock<HashMap<MarketId, ExecutionState>>,
    halted: AtomicBool,
    daily_notional: Mutex<DailyNotional>,
    open_positions: AtomicU32,
}

impl ExecutionEngine {
    #[must_use]
    pub fn new(
        venue: Arc<dyn VenueAdapter>,
        signals: Arc<SignalEngine>,
        ledger: Arc<Ledger>,
        kill_switch: Arc<KillSwitch>,
        execution_config: ExecutionConfig,
        risk_config: RiskConfig,
        clock: Arc<dyn Clock>,
        paper_mode: bool,
    ) -> Self {
        let today = clock.now().date_naive();
        Self {
            venue,
            signals,
            ledger,
            kill_switch,
            execution_config,
            risk_config,
            clock,
            paper_mode,
            states: RwLock::new(HashMap::new()),
            halted: AtomicBool::new(false),
            daily_notional: Mutex::new(DailyNotional {
                day: today,
                spent: Decimal::ZERO,
            }),
            open_positions: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn halt(&self) {
        if !self.halted.swap(true, Ordering::SeqCst) {
            warn!("Execution halted");
        }
    }

    pub fn resume(&self) {
        if self.halted.swap(false, Ordering::SeqCst) {
            info!("Execution resumed");
        }
    }

    #[must_use]
    pub fn state(&self, market_id: &MarketId) -> ExecutionState {
        self.states
            .read()
            .get(market_id)
            .copied()
            .unwrap_or(ExecutionState::Idle)
    }

    fn set_state(&self, market_id: &MarketId, state: ExecutionState) {
        debug!(market_id = %market_id, state = state.as_str(), "Execution state");
        self.states.write().insert(market_id.clone(), state);
    }

    /// Attempt a complete-set acquisition for a TRADE signal.
    ///
    /// Every exit path clears the in-flight flag and starts the per-market
    /// cooldown.
    pub async fn execute(&self, signal: &TradeSignal, market: &MarketBook) -> ExecutionOutcome {
        let market_id = &signal.market_id;

        if self.is_halted() {
            info!(market_id = %market_id, "Halted, signal skipped");
            return ExecutionOutcome::failure(None, "execution halted");
        }
        if !signal.is_tradeable() {
            return ExecutionOutcome::failure(
                None,
                format!("signal not tradeable: {}", signal.reason),
            );
        }
        let (Some(yes_ask), Some(no_ask)) = (signal.yes_ask, signal.no_ask) else {
            return ExecutionOutcome::failure(None, "signal missing quotes");
        };

        let order_size = self.execution_config.order_size;
        let set_price = yes_ask + no_ask;

        if let Some(reason) = self.risk_check(order_size, set_price) {
            warn!(market_id = %market_id, reason = %reason, "Risk limit hit");
            self.record_risk_event(
                RiskEventKind::RiskLimit,
                Some(market_id),
                Some(serde_json::json!({ "reason": reason })),
            );
            return ExecutionOutcome::failure(None, reason);
        }

        self.set_state(market_id, ExecutionState::SignalDetected);
        self.signals.set_in_flight(market_id);

        let tradeset_id = match self.ledger.create_tradeset(market_id) {
            Ok(id) => id,
            Err(e) => {
                error!(market_id = %market_id, error = %e, "Failed to open tradeset");
                self.finish_attempt(market_id);
                return ExecutionOutcome::failure(None, e.to_string());
            }
        };

        self.set_state(market_id, ExecutionState::PlacingOrders);
        let outcome = if self.paper_mode {
            self.execute_paper(market, signal, order_size, tradeset_id)
        } else {
            self.execute_live(market, signal, order_size, tradeset_id)
                .await
        };

        if outcome.success {
            self.set_state(market_id, ExecutionState::Success);
            let mut daily = self.daily_notional.lock();
            daily.spent += order_size * set_price;
            drop(daily);
            self.open_positions.fetch_add(1, Ordering::SeqCst);
        } else if self.state(market_id) != ExecutionState::PartialFillProtect {
            self.set_state(market_id, ExecutionState::Failed);
        }

        self.finish_attempt(market_id);
        outcome
    }

    fn finish_attempt(&self, market_id: &MarketId) {
        self.signals.clear_in_flight(market_id);
        self.signals.set_cooldown(
            market_id,
            self.clock.now(),
            chrono::Duration::milliseconds(
                (self.execution_config.cooldown_seconds * 1000.0) as i64,
            ),
        );
        self.set_state(market_id, ExecutionState::Cooldown);
        self.set_state(market_id, ExecutionState::Idle);
    }

    /// Pre-trade risk gate. `None` means the trade may proceed.
    fn risk_check(&self, order_size: Decimal, set_price: Decimal) -> Option<String> {
        let notional = order_size * set_price;

        {
            let mut daily = self.daily_notional.lock();
            let today = self.clock.now().date_naive();
            if daily.day != today {
                daily.day = today;
                daily.spent = Decimal::ZERO;
            }
            if daily.spent + notional > self.risk_config.max_daily_notional {
                return Some(format!(
                    "would exceed daily notional limit ({} + {notional} > {})",
                    daily.spent, self.risk_config.max_daily_notional
                ));
            }
        }

        let open = self.open_positions.load(Ordering::SeqCst);
        if open >= self.risk_config.max_open_positions {
            return Some(format!("at max open positions ({open})"));
        }

        match self.ledger.risk_event_counts(chrono::Duration::hours(1)) {
            Ok(counts) => {
                if counts.get(RiskEventKind::PartialFill)
                    >= self.risk_config.max_partial_fills_per_hour
                {
                    return Some("too many partial fills in the last hour".into());
                }
                if counts.get(RiskEventKind::Reject) >= self.risk_config.max_rejects_per_hour {
                    return Some("too many order rejects in the last hour".into());
                }
                if counts.get(RiskEventKind::WsDisconnect)
                    >= self.risk_config.max_ws_disconnects_per_hour
                {
                    return Some("too many websocket disconnects in the last hour".into());
                }
            }
            Err(e) => warn!(error = %e, "Risk count query failed, skipping count gates"),
        }

        None
    }

    /// Paper execution: both legs synthesized as filled at the observed
    /// asks. Ledger writes and state transitions mirror the live path.
    fn execute_paper(
        &self,
        market: &MarketBook,
        signal: &TradeSignal,
        order_size: Decimal,
        tradeset_id: i32,
    ) -> ExecutionOutcome {
        let now = self.clock.now();
        let fee_rate = self.venue.fee_rate();
        let yes_ask = signal.yes_ask.unwrap_or_default();
        let no_ask = signal.no_ask.unwrap_or_default();

        let synth = |leg: &str, token, price| {
            let request = OrderRequest {
                market_id: market.market_id.clone(),
                token_id: token,
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                price,
                size: order_size,
            };
            let mut order = Order::from_request(
                OrderId::new(format!("paper-{leg}-{tradeset_id}")),
                &request,
                OrderStatus::Filled,
                now,
            );
            order.filled_size = order_size;
            order.avg_fill_price = Some(price);
            order.fee = order_size * price * fee_rate;
            order
        };

        let yes_order = synth("yes", market.yes.token_id.clone(), yes_ask);
        let no_order = synth("no", market.no.token_id.clone(), no_ask);
        self.record_order(&yes_order, tradeset_id);
        self.record_order(&no_order, tradeset_id);

        let yes_cost = order_size * yes_ask;
        let no_cost = order_size * no_ask;
        let total_fees = yes_order.fee + no_order.fee;
        let expected_payout = order_size * Decimal::ONE;
        let theoretical_pnl = expected_payout - yes_cost - no_cost - total_fees;

        self.update_tradeset(
            tradeset_id,
            TradeSetPatch {
                status: Some(TradeSetStatus::Filled),
                yes_order_id: Some(yes_order.id.to_string()),
                no_order_id: Some(no_order.id.to_string()),
                yes_cost: Some(yes_cost),
                no_cost: Some(no_cost),
                total_fees: Some(total_fees),
                expected_payout: Some(expected_payout),
                realized_pnl: Some(theoretical_pnl),
                ..TradeSetPatch::default()
            },
        );

        info!(
            market_id = %market.market_id,
            yes_ask = %yes_ask,
            no_ask = %no_ask,
            sum_cost = %(yes_ask + no_ask),
            pnl = %theoretical_pnl,
            "Paper complete-set executed"
        );

        ExecutionOutcome {
            success: true,
            tradeset_id: Some(tradeset_id),
            yes_order: Some(yes_order),
            no_order: Some(no_order),
            error: None,
        }
    }

    /// Live execution with partial-fill protection.
    async fn execute_live(
        &self,
        market: &MarketBook,
        signal: &TradeSignal,
        order_size: Decimal,
        tradeset_id: i32,
    ) -> ExecutionOutcome {
        let market_id = &market.market_id;
        let attempt_deadline = self.clock.now()
            + chrono::Duration::milliseconds(
                (self.execution_config.max_inflight_seconds * 1000.0) as i64,
            );

        let request_for = |token, price| OrderRequest {
            market_id: market_id.clone(),
            token_id: token,
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            price,
            size: order_size,
        };

        // YES leg first, always.
        let yes_request = request_for(
            market.yes.token_id.clone(),
            signal.yes_ask.unwrap_or_default(),
        );
        let mut yes_order = match self.venue.place_order(yes_request).await {
            Ok(order) => order,
            Err(e) => {
                error!(market_id = %market_id, error = %e, "YES placement failed");
                self.record_risk_event(
                    RiskEventKind::ExecutionError,
                    Some(market_id),
                    Some(serde_json::json!({ "error": e.to_string(), "leg": "YES" })),
                );
                self.update_tradeset(
                    tradeset_id,
                    TradeSetPatch {
                        status: Some(TradeSetStatus::Failed),
                        ..TradeSetPatch::default()
                    },
                );
                return ExecutionOutcome::failure(Some(tradeset_id), e.to_string());
            }
        };
        self.record_order(&yes_order, tradeset_id);

        if yes_order.status == OrderStatus::Rejected {
            self.record_risk_event(
                RiskEventKind::Reject,
                Some(market_id),
                Some(serde_json::json!({ "leg": "YES" })),
            );
            self.update_tradeset(
                tradeset_id,
                TradeSetPatch {
                    status: Some(TradeSetStatus::Failed),
                    ..TradeSetPatch::default()
                },
            );
            // First leg rejected: no exposure, plain failure.
            return ExecutionOutcome {
                success: false,
                tradeset_id: Some(tradeset_id),
                yes_order: Some(yes_order),
                no_order: None,
                error: Some("YES order rejected".into()),
            };
        }

        // NO leg second; from here on the YES leg is exposure.
        let no_request = request_for(
            market.no.token_id.clone(),
            signal.no_ask.unwrap_or_default(),
        );
        let mut no_order = match self.venue.place_order(no_request).await {
            Ok(order) => order,
            Err(e) => {
                error!(market_id = %market_id, error = %e, "NO placement failed, YES leg exposed");
                self.record_risk_event(
                    RiskEventKind::ExecutionError,
                    Some(market_id),
                    Some(serde_json::json!({ "error": e.to_string(), "leg": "NO" })),
                );
                self.protect(market_id, tradeset_id, Some(&mut yes_order), None)
                    .await;
                return ExecutionOutcome {
                    success: false,
                    tradeset_id: Some(tradeset_id),
                    yes_order: Some(yes_order),
                    no_order: None,
                    error: Some(e.to_string()),
                };
            }
        };
        self.record_order(&no_order, tradeset_id);

        if no_order.status == OrderStatus::Rejected {
            self.record_risk_event(
                RiskEventKind::Reject,
                Some(market_id),
                Some(serde_json::json!({ "leg": "NO" })),
            );
            self.protect(market_id, tradeset_id, Some(&mut yes_order), None)
                .await;
            return ExecutionOutcome {
                success: false,
                tradeset_id: Some(tradeset_id),
                yes_order: Some(yes_order),
                no_order: Some(no_order),
                error: Some("NO order rejected, YES leg exposed".into()),
            };
        }

        self.set_state(market_id, ExecutionState::WaitingFills);

        // Timeout runs from submission of the second leg; the in-flight cap
        // bounds the attempt as a whole.
        let fill_deadline = self.clock.now()
            + chrono::Duration::milliseconds(
                (self.execution_config.order_timeout_seconds * 1000.0) as i64,
            );
        let deadline = fill_deadline.min(attempt_deadline);
        let poll_interval =
            std::time::Duration::from_millis(self.execution_config.poll_interval_ms);

        loop {
            if let Ok(Some(current)) = self.venue.order_status(&yes_order.id).await {
                yes_order = current;
            }
            if let Ok(Some(current)) = self.venue.order_status(&no_order.id).await {
                no_order = current;
            }

            if yes_order.status == OrderStatus::Filled && no_order.status == OrderStatus::Filled {
                return self.finalize_filled(market_id, tradeset_id, yes_order, no_order);
            }

            if yes_order.status == OrderStatus::PartiallyFilled
                || no_order.status == OrderStatus::PartiallyFilled
            {
                self.record_risk_event(RiskEventKind::PartialFill, Some(market_id), None);
                self.protect(
                    market_id,
                    tradeset_id,
                    Some(&mut yes_order),
                    Some(&mut no_order),
                )
                .await;
                return ExecutionOutcome {
                    success: false,
                    tradeset_id: Some(tradeset_id),
                    yes_order: Some(yes_order),
                    no_order: Some(no_order),
                    error: Some("partial fill detected".into()),
                };
            }

            if self.clock.now() >= deadline {
                warn!(market_id = %market_id, "Fill wait timed out");
                if yes_order.filled_size != no_order.filled_size {
                    // Timeout with asymmetric fills is directional exposure.
                    self.record_risk_event(
                        RiskEventKind::PartialFill,
                        Some(market_id),
                        Some(serde_json::json!({ "cause": "timeout" })),
                    );
                }
                self.protect(
                    market_id,
                    tradeset_id,
                    Some(&mut yes_order),
                    Some(&mut no_order),
                )
                .await;
                return ExecutionOutcome {
                    success: false,
                    tradeset_id: Some(tradeset_id),
                    yes_order: Some(yes_order),
                    no_order: Some(no_order),
                    error: Some("order timeout".into()),
                };
            }

            sleep(poll_interval).await;
        }
    }

    fn finalize_filled(
        &self,
        market_id: &MarketId,
        tradeset_id: i32,
        yes_order: Order,
        no_order: Order,
    ) -> ExecutionOutcome {
        let yes_cost = yes_order.filled_cost();
        let no_cost = no_order.filled_cost();
        let total_fees = yes_order.fee + no_order.fee;
        let expected_payout = yes_order.filled_size.min(no_order.filled_size) * Decimal::ONE;
        let realized_pnl = expected_payout - yes_cost - no_cost - total_fees;

        self.update_order(&yes_order);
        self.update_order(&no_order);
        self.update_tradeset(
            tradeset_id,
            TradeSetPatch {
                status: Some(TradeSetStatus::Filled),
                yes_order_id: Some(yes_order.id.to_string()),
                no_order_id: Some(no_order.id.to_string()),
                yes_cost: Some(yes_cost),
                no_cost: Some(no_cost),
                total_fees: Some(total_fees),
                expected_payout: Some(expected_payout),
                realized_pnl: Some(realized_pnl),
                ..TradeSetPatch::default()
            },
        );

        info!(
            market_id = %market_id,
            tradeset_id,
            pnl = %realized_pnl,
            "Complete set filled"
        );

        ExecutionOutcome {
            success: true,
            tradeset_id: Some(tradeset_id),
            yes_order: Some(yes_order),
            no_order: Some(no_order),
            error: None,
        }
    }

    /// Partial-fill protection: cancel residual legs, record, never offset.
    async fn protect(
        &self,
        market_id: &MarketId,
        tradeset_id: i32,
        yes_order: Option<&mut Order>,
        no_order: Option<&mut Order>,
    ) {
        self.set_state(market_id, ExecutionState::PartialFillProtect);
        warn!(market_id = %market_id, tradeset_id, "Partial-fill protection triggered");

        for (leg, order) in [("YES", yes_order), ("NO", no_order)] {
            let Some(order) = order else { continue };
            if order.status.is_cancellable() {
                match self.venue.cancel_order(&order.id).await {
                    Ok(true) => {
                        info!(market_id = %market_id, leg, order_id = %order.id, "Residual leg cancelled");
                        order.status = OrderStatus::Cancelled;
                        order.updated_at = self.clock.now();
                    }
                    Ok(false) => {
                        warn!(market_id = %market_id, leg, order_id = %order.id, "Cancel not accepted")
                    }
                    Err(e) => {
                        error!(market_id = %market_id, leg, order_id = %order.id, error = %e, "Cancel failed")
                    }
                }
            }
            self.update_order(order);
        }

        self.update_tradeset(
            tradeset_id,
            TradeSetPatch {
                status: Some(TradeSetStatus::PartialFill),
                ..TradeSetPatch::default()
            },
        );

        if self.risk_config.halt_on_partial_fill {
            warn!("Halting on partial fill per risk config");
            self.kill_switch
                .trip_manual(format!("partial fill on {market_id} with halt_on_partial_fill set"));
            self.halt();
        }
    }

    // Ledger writes on the attempt path log failures and continue; they
    // never abort the attempt.

    fn record_order(&self, order: &Order, tradeset_id: i32) {
        if let Err(e) = self.ledger.record_order(order, tradeset_id) {
            warn!(order_id = %order.id, error = %e, "Failed to record order");
        }
    }

    fn update_order(&self, order: &Order) {
        if let Err(e) = self.ledger.update_order(order) {
            warn!(order_id = %order.id, error = %e, "Failed to update order");
        }
    }

    fn update_tradeset(&self, tradeset_id: i32, patch: TradeSetPatch) {
        if let Err(e) = self.ledger.update_tradeset(tradeset_id, &patch) {
            warn!(tradeset_id, error = %e, "Failed to update tradeset");
        }
    }

    fn record_risk_event(
        &self,
        kind: RiskEventKind,
        market_id: Option<&MarketId>,
        details: Option<serde_json::Value>,
    ) {
        if let Err(e) = self.ledger.record_risk_event(kind, market_id, details) {
            warn!(kind = kind.as_str(), error = %e, "Failed to record risk event");
        }
    }
}
