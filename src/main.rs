use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_gateway::{
    config::Config,
    ingestor::{PlaylistIngestor, RefreshScheduler, ReloadSender, create_reload_channel},
    sources::HttpFileFetcher,
};

#[derive(Parser, Clone)]
#[command(name = "m3u-gateway")]
#[command(version)]
#[command(about = "Rewrites IPTV M3U playlists so every stream is served through this gateway")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Externally visible hostname or base URL
    #[arg(short = 'H', long, value_name = "HOST")]
    hostname: Option<String>,

    /// Listening port used in generated URLs
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Ingest once, write the playlist and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(hostname) = &self.hostname {
            config.server.hostname = Some(hostname.clone());
        }
        if let Some(port) = self.port {
            match config.server.listen.first_mut() {
                Some(first) => {
                    *first = match first.rsplit_once(':') {
                        Some((addr, _)) => format!("{addr}:{port}"),
                        None => port.to_string(),
                    };
                }
                None => config.server.listen.push(port.to_string()),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("m3u_gateway={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting M3U Gateway v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);
    cli.apply_overrides(&mut config);

    let output_path = config.playlist.output_path.clone();
    let fetcher = Arc::new(HttpFileFetcher::new(config.playlist.fetch_timeout));

    let mut ingestor = PlaylistIngestor::new(config.clone());
    ingestor.reload(config, fetcher.as_ref()).await?;
    write_playlist(&output_path, ingestor.playlist().unwrap_or_default()).await?;

    if cli.once {
        return Ok(());
    }

    let (reload_tx, reload_rx) = create_reload_channel();
    let (scheduler, mut snapshots) = RefreshScheduler::new(ingestor, fetcher, reload_rx);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handle = tokio::spawn(scheduler.start(shutdown_rx));

    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let content = snapshots.borrow_and_update().content.clone();
            if let Err(e) = write_playlist(&output_path, &content).await {
                error!("Failed to write playlist: {}", e);
            }
        }
    });

    #[cfg(unix)]
    reload_on_hangup(cli.clone(), reload_tx.clone())?;

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down gracefully");

    let _ = shutdown_tx.send(true);
    drop(reload_tx);
    scheduler_handle.await??;

    Ok(())
}

async fn write_playlist(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content).await?;
    info!("Playlist written to {} ({} bytes)", path.display(), content.len());
    Ok(())
}

/// Re-read the configuration file on SIGHUP and hand it to the scheduler
#[cfg(unix)]
fn reload_on_hangup(cli: Cli, reload_tx: ReloadSender) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("Received SIGHUP, reloading configuration from {}", cli.config);
            match Config::load_from_file(&cli.config) {
                Ok(mut config) => {
                    cli.apply_overrides(&mut config);
                    if reload_tx.send(config).is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to reload configuration: {}", e),
            }
        }
    });
    Ok(())
}
