#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use recap_rs::{config::Settings, utils::logger, AppContext};

/// Summarize uploaded call recordings.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Handle one upload notification from a JSON file, print the result and exit
    #[arg(long, value_name = "FILE")]
    event: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    recap_rs::init_env();
    let settings = Settings::from_env()?;

    let _guard = logger::init(settings.log_dir.clone())?;
    info!("Starting recap service ({})", env!("GIT_HASH"));
    info!(
        "Polling every {:?}, at most {} checks",
        settings.pipeline.poll.interval, settings.pipeline.poll.max_attempts
    );

    let ctx = Arc::new(AppContext::from_settings(&settings)?);

    if let Some(path) = cli.event {
        let result = ctx.pipeline.handle_event_file(&path).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match recap_rs::web::start_server(ctx, settings.listen_addr).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
