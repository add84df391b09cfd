mod app;
mod dice_art;

use anyhow::Result;
use std::fs::{self, OpenOptions};

use snakes_core::{
    config::{self, AppConfig},
    LayoutRenderer, RandomDice, SessionRegistry,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let renderer = LayoutRenderer::new(&config.boards_dir);
    let dice = RandomDice::from_seed(config.dice_seed);
    let registry = SessionRegistry::new(renderer, dice, config.session_ttl());
    let purged = registry.purge_artifacts()?;
    info!(purged, boards = %config.boards_dir.display(), "Registry ready");

    let mut app = app::SnakesApp::new(registry, config);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("snakes.log");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout belongs to the terminal UI, so logs only go to the file
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_ansi(false)
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
