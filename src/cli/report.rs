//! Handler for the `report` command.

use std::path::Path;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::cli::ReportArgs;
use crate::config::Config;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::report;

pub fn execute(config_path: &Path, args: &ReportArgs) -> Result<()> {
    let config = Config::load(config_path)?;
    let ledger = Ledger::open(&config.data.sqlite_path, Arc::new(SystemClock))?;
    println!("{}", report::render_report(&ledger, args.days)?);
    Ok(())
}
