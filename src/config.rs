//! Configuration loading and validation.
//!
//! TOML file plus `.env` overrides for credentials. Invalid configuration at
//! startup is the only fatal error class in the system.

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub venue: VenueConfig,
    /// Explicit market subscription list; empty means auto-subscribe the top
    /// active markets.
    pub markets: Vec<String>,
    pub strategy: StrategyConfig,
    pub execution: ExecutionConfig,
    pub risk: RiskConfig,
    pub websocket: WebSocketConfig,
    pub data: DataConfig,
    pub paper_mode: PaperMode,
}

/// Wrapper so `paper_mode` defaults to true rather than bool's false.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct PaperMode(pub bool);

impl Default for PaperMode {
    fn default() -> Self {
        Self(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub name: String,
    pub api_url: String,
    pub ws_url: String,
    pub proxy_url: Option<String>,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            name: "polymarket".into(),
            api_url: "https://clob.polymarket.com".into(),
            ws_url: "wss://ws-subscriptions-clob.polymarket.com/ws/market".into(),
            proxy_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Minimum computed edge to trade.
    pub min_edge: Decimal,
    /// Slippage buffer subtracted in the edge formula.
    pub cost_buffer: Decimal,
    /// Minimum executable depth across both legs.
    pub min_depth: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_edge: dec!(0.01),
            cost_buffer: dec!(0.005),
            min_depth: dec!(10),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Target size per leg, in contracts.
    pub order_size: Decimal,
    /// Deadline for both legs to fill, from submission of the second leg.
    pub order_timeout_seconds: f64,
    /// Hard cap on the end-to-end attempt duration.
    pub max_inflight_seconds: f64,
    /// Per-market cooldown after every attempt.
    pub cooldown_seconds: f64,
    /// Cadence for polling order status while waiting for fills.
    pub poll_interval_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            order_size: dec!(10),
            order_timeout_seconds: 5.0,
            max_inflight_seconds: 30.0,
            cooldown_seconds: 2.0,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Gross notional allowed per UTC day.
    pub max_daily_notional: Decimal,
    /// Concurrent trade set cap.
    pub max_open_positions: u32,
    /// Latch the kill switch on any partial fill.
    pub halt_on_partial_fill: bool,
    pub max_partial_fills_per_hour: i64,
    pub max_rejects_per_hour: i64,
    pub max_ws_disconnects_per_hour: i64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_notional: dec!(1000),
            max_open_positions: 5,
            halt_on_partial_fill: true,
            max_partial_fills_per_hour: 3,
            max_rejects_per_hour: 10,
            max_ws_disconnects_per_hour: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub reconnect_delay_initial: f64,
    pub reconnect_delay_max: f64,
    pub reconnect_backoff_factor: f64,
    pub heartbeat_interval: f64,
    /// Reseed the book via REST after every reconnect.
    pub snapshot_on_reconnect: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_initial: 1.0,
            reconnect_delay_max: 60.0,
            reconnect_backoff_factor: 2.0,
            heartbeat_interval: 30.0,
            snapshot_on_reconnect: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub sqlite_path: String,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "pairlock.db".into(),
            log_level: "info".into(),
            log_json: false,
        }
    }
}

impl DataConfig {
    /// Initialize the tracing subscriber from this config.
    pub fn init_logging(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        if self.log_json {
            fmt().json().with_env_filter(filter).init();
        } else {
            fmt().with_env_filter(filter).init();
        }
    }
}

/// Venue API credentials, sourced from the environment only.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub passphrase: Option<String>,
}

impl Credentials {
    /// Read `PAIRLOCK_API_KEY` / `PAIRLOCK_API_SECRET` /
    /// `PAIRLOCK_PASSPHRASE` from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("PAIRLOCK_API_KEY").ok(),
            api_secret: std::env::var("PAIRLOCK_API_SECRET").ok(),
            passphrase: std::env::var("PAIRLOCK_PASSPHRASE").ok(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some() && self.passphrase.is_some()
    }
}

impl Config {
    /// Load a config file, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on unreadable files, parse failures, or
    /// validation failures.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?
        } else {
            Self::default()
        };

        if let Ok(proxy) = std::env::var("PAIRLOCK_PROXY_URL") {
            config.venue.proxy_url = Some(proxy);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.venue.name.is_empty() {
            return Err(Error::Config("venue.name cannot be empty".into()));
        }
        if self.venue.name == "polymarket" {
            if self.venue.api_url.is_empty() {
                return Err(Error::Config("venue.api_url cannot be empty".into()));
            }
            if self.venue.ws_url.is_empty() {
                return Err(Error::Config("venue.ws_url cannot be empty".into()));
            }
        }
        if self.strategy.min_edge < Decimal::ZERO {
            return Err(Error::Config("strategy.min_edge cannot be negative".into()));
        }
        if self.strategy.cost_buffer < Decimal::ZERO {
            return Err(Error::Config(
                "strategy.cost_buffer cannot be negative".into(),
            ));
        }
        if self.execution.order_size <= Decimal::ZERO {
            return Err(Error::Config(
                "execution.order_size must be positive".into(),
            ));
        }
        if self.execution.order_timeout_seconds <= 0.0 {
            return Err(Error::Config(
                "execution.order_timeout_seconds must be positive".into(),
            ));
        }
        if self.execution.poll_interval_ms == 0 {
            return Err(Error::Config(
                "execution.poll_interval_ms must be positive".into(),
            ));
        }
        if self.risk.max_open_positions == 0 {
            return Err(Error::Config(
                "risk.max_open_positions must be positive".into(),
            ));
        }
        if self.websocket.reconnect_backoff_factor < 1.0 {
            return Err(Error::Config(
                "websocket.reconnect_backoff_factor must be >= 1".into(),
            ));
        }
        if self.data.sqlite_path.is_empty() {
            return Err(Error::Config("data.sqlite_path cannot be empty".into()));
        }
        Ok(())
    }
}
