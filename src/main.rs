use clap::Parser;

use pairlock::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    cli::dispatch(cli).await?;
    Ok(())
}
