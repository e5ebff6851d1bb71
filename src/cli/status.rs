//! Handler for the `status` command.

use std::path::Path;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::report;

pub fn execute(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let ledger = Ledger::open(&config.data.sqlite_path, Arc::new(SystemClock))?;
    println!("{}", report::render_status(&ledger)?);
    Ok(())
}
