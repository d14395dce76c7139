//! Entry point for the ladder console.

use clap::Parser;
use ladder_console::{logging, Application};
use ladder_gateway::Settings;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ladder-console", about = "Scaled-order trading console gateway")]
struct Cli {
    /// Path to the settings file.
    #[arg(long, default_value = "settings.toml")]
    settings: PathBuf,

    /// Override the active symbol and persist the choice.
    #[arg(long)]
    symbol: Option<String>,

    /// Skip autoconnect for this run.
    #[arg(long)]
    no_autoconnect: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.settings)?;
    if let Some(symbol) = cli.symbol {
        settings.symbol = symbol;
        settings.save(&cli.settings)?;
    }
    if cli.no_autoconnect {
        settings.autoconnect = false;
    }

    let mut app = Application::new(settings);
    app.run().await?;
    Ok(())
}
