//! Shameboard server
//!
//! A sticky-note task board with markdown cards and deadlines. A background
//! sweep posts a one-time shame webhook for every deadline missed.

use anyhow::Result;
use clap::Parser;
use shameboard::cli::Cli;
use shameboard::config::Config;
use shameboard::db::Database;
use shameboard::notify::WebhookSink;
use shameboard::scheduler::{PunishmentSweeper, SweepConfig};
use shameboard::web;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    // Load configuration and apply CLI overrides
    let mut config = Config::load(cli.config.as_deref().map(Path::new))?;
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(webhook_url) = &cli.webhook_url {
        config.punishment.webhook_url = webhook_url.clone();
    }

    config.ensure_db_dir()?;

    info!("Starting shameboard v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.server.db_path);
    if config.punishment.webhook_url.trim().is_empty() {
        warn!(
            "No default webhook target configured; overdue tasks without \
             their own target will not be notified"
        );
    }

    // Open database
    let db = Arc::new(Database::open(&config.server.db_path)?);
    info!("Database initialized successfully");

    // Start the punishment sweep
    let sink = Arc::new(WebhookSink::new(Duration::from_secs(
        config.punishment.send_timeout_secs,
    ))?);
    let sweeper = PunishmentSweeper::new(
        Arc::clone(&db),
        sink,
        SweepConfig {
            interval: Duration::from_secs(config.punishment.interval_secs),
            webhook_url: config.punishment.webhook_url.clone(),
            shame_message: config.punishment.shame_message.clone(),
        },
    );
    let sweeper_handle = sweeper.run();

    // Start the board server
    let (shutdown_tx, addr) = web::start_server(Arc::clone(&db), config.server.port).await?;
    info!("Board available at http://{}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    let _ = shutdown_tx.send(());
    sweeper_handle.abort();

    Ok(())
}
