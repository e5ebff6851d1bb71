//! Handler for the `run` command.

use std::path::Path;

use tracing::info;

use crate::app::App;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;

/// Load configuration, apply CLI overrides, and run the engine.
pub async fn execute(config_path: &Path, args: &RunArgs) -> Result<()> {
    let mut config = Config::load(config_path)?;

    if args.paper {
        config.paper_mode.0 = true;
    } else if args.live {
        config.paper_mode.0 = false;
    }

    config.data.init_logging();
    info!(
        config = %config_path.display(),
        paper_mode = config.paper_mode.0,
        venue = %config.venue.name,
        markets = config.markets.len(),
        "Configuration loaded"
    );

    App::run(config).await
}
