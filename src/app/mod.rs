//! Application assembly and lifecycle.

mod orchestrator;

pub use orchestrator::Orchestrator;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::book::BookState;
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, Credentials};
use crate::domain::MarketId;
use crate::error::{Error, Result};
use crate::execution::ExecutionEngine;
use crate::ledger::Ledger;
use crate::risk::KillSwitch;
use crate::signal::SignalEngine;
use crate::venue::{MockVenue, PolymarketVenue, VenueAdapter};

/// With no explicit market list, subscribe to this many active markets.
const AUTO_SUBSCRIBE_LIMIT: usize = 10;

/// Grace period for the pipeline to finish its event in hand on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Main application.
pub struct App;

impl App {
    /// Run the engine until the stream ends or a shutdown signal arrives.
    pub async fn run(config: Config) -> Result<()> {
        Self::run_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn run_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<()> {
        let mode = if config.paper_mode.0 { "PAPER" } else { "LIVE" };
        info!(mode, venue = %config.venue.name, "Starting pairlock");

        let ledger = Arc::new(Ledger::open(&config.data.sqlite_path, clock.clone())?);
        let venue = build_venue(&config, clock.clone())?;
        venue.connect().await?;

        let books = Arc::new(BookState::new());
        let signals = Arc::new(SignalEngine::new(config.strategy.clone(), venue.fee_rate()));
        let kill_switch = Arc::new(KillSwitch::new(ledger.clone(), config.risk.clone()));
        let executor = Arc::new(ExecutionEngine::new(
            venue.clone(),
            signals.clone(),
            ledger.clone(),
            kill_switch.clone(),
            config.execution.clone(),
            config.risk.clone(),
            clock.clone(),
            config.paper_mode.0,
        ));

        let market_ids = register_markets(&config, venue.as_ref(), &books).await?;
        if market_ids.is_empty() {
            warn!("No markets to track, exiting");
            return Ok(());
        }
        info!(markets = market_ids.len(), "Markets registered");

        let events = venue.subscribe(&market_ids).await?;

        let orchestrator = Arc::new(Orchestrator::new(
            books,
            signals,
            executor,
            kill_switch,
            ledger,
            clock,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut pipeline = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run(events, shutdown_rx).await })
        };

        tokio::select! {
            result = &mut pipeline => {
                result.map_err(|e| Error::Execution(format!("pipeline task failed: {e}")))?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
                // In-flight venue orders are deliberately left alone; the
                // operator reconciles them. We only wait for the event in
                // hand to finish.
                if tokio::time::timeout(SHUTDOWN_GRACE, &mut pipeline).await.is_err() {
                    warn!("Pipeline did not stop within grace period, aborting");
                    pipeline.abort();
                }
            }
        }

        venue.disconnect().await?;
        info!("Stopped");
        Ok(())
    }
}

fn build_venue(config: &Config, clock: Arc<dyn Clock>) -> Result<Arc<dyn VenueAdapter>> {
    match config.venue.name.as_str() {
        "mock" => Ok(Arc::new(MockVenue::with_demo_market(clock))),
        "polymarket" => Ok(Arc::new(PolymarketVenue::new(
            &config.venue,
            &config.websocket,
            &Credentials::from_env(),
            clock,
        )?)),
        other => Err(Error::Config(format!("unknown venue: {other}"))),
    }
}

/// Register configured markets, or auto-subscribe the top active ones when
/// the list is empty.
async fn register_markets(
    config: &Config,
    venue: &dyn VenueAdapter,
    books: &BookState,
) -> Result<Vec<MarketId>> {
    let mut market_ids = Vec::new();

    if config.markets.is_empty() {
        let markets = venue.list_markets(true).await?;
        for info in markets.into_iter().take(AUTO_SUBSCRIBE_LIMIT) {
            books.register(&info);
            info!(market_id = %info.market_id, question = %info.question, "Tracking market");
            market_ids.push(info.market_id);
        }
    } else {
        for raw in &config.markets {
            let market_id = MarketId::new(raw.clone());
            match venue.market_info(&market_id).await? {
                Some(info) => {
                    books.register(&info);
                    info!(market_id = %info.market_id, question = %info.question, "Tracking market");
                    market_ids.push(info.market_id);
                }
                None => warn!(market_id = %market_id, "Market not found on venue"),
            }
        }
    }

    Ok(market_ids)
}
