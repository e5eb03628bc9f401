// mopibot - tells the Slack channel what Mopidy is playing
// and answers "current", "queue" and "skip" from anyone who asks

use anyhow::{Context, Result};
use clap::Parser;
use mopibot::{Config, MopidyClient, Relay, SlackClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mopibot")]
#[command(about = "A Slack bot that relays Mopidy playback and answers queue commands")]
struct Args {
    /// Config file (defaults to <config dir>/mopibot/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write daily-rotated logs into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable developer logging (debug output from every crate)
    #[arg(long)]
    dev: bool,
}

fn init_logging(dev: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_filter = if dev { "debug" } else { "info,mopibot=debug" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Optional rotating file next to stdout
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "mopibot.log");
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_writer(file_writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive or the file writer stops flushing
    let _log_guard = init_logging(args.dev, args.log_dir.as_deref())?;

    let config = Config::load(args.config.as_deref())?;
    let credentials = config.credentials().map_err(|e| {
        error!("{}", e);
        e
    })?;

    let slack = Arc::new(
        SlackClient::connect(&config.slack.api_base, credentials)
            .await
            .context("Could not authenticate with Slack")?,
    );
    let (mopidy, player_events) = MopidyClient::connect(&config.mopidy.url)
        .await
        .context("Could not connect to Mopidy")?;

    let relay = Arc::new(Relay::new(
        slack.clone(),
        Arc::new(mopidy),
        config.slack.announce_channel.clone(),
    )?);
    info!("Announcing tracks in {}", relay.announce_channel());

    let (chat_tx, chat_rx) = mpsc::unbounded_channel();
    let socket = tokio::spawn(async move {
        if let Err(e) = slack.run(chat_tx).await {
            error!("Slack socket failed: {}", e);
        }
    });

    relay.run(chat_rx, player_events).await;
    let _ = socket.await;

    Ok(())
}
