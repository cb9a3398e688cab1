use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use super::PlaylistIngestor;
use crate::config::Config;
use crate::sources::PlaylistFetcher;

pub type ReloadSender = broadcast::Sender<Config>;
pub type ReloadReceiver = broadcast::Receiver<Config>;

pub fn create_reload_channel() -> (ReloadSender, ReloadReceiver) {
    broadcast::channel(16)
}

/// The published result of the latest pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistSnapshot {
    pub content: String,
    pub service_count: usize,
    pub epg_url: Option<String>,
}

/// Single owner of the ingestor
///
/// Refreshes the external playlist on a fixed interval, reloads everything
/// when a new configuration arrives, and publishes a snapshot after each pass.
pub struct RefreshScheduler {
    ingestor: PlaylistIngestor,
    fetcher: Arc<dyn PlaylistFetcher>,
    reload_rx: ReloadReceiver,
    snapshot_tx: watch::Sender<PlaylistSnapshot>,
}

impl RefreshScheduler {
    pub fn new(
        ingestor: PlaylistIngestor,
        fetcher: Arc<dyn PlaylistFetcher>,
        reload_rx: ReloadReceiver,
    ) -> (Self, watch::Receiver<PlaylistSnapshot>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(ingestor.snapshot());
        (
            Self {
                ingestor,
                fetcher,
                reload_rx,
                snapshot_tx,
            },
            snapshot_rx,
        )
    }

    /// Run until `shutdown` fires or every reload sender is gone
    pub async fn start(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Starting playlist refresh scheduler");
        let mut ticker = self.build_ticker();

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    debug!("Scheduled external playlist refresh");
                    match self.ingestor.refresh_external(self.fetcher.as_ref()).await {
                        Ok(Some(summary)) => {
                            info!(
                                "External playlist refreshed: {} entries, {} services",
                                summary.entries, summary.services_created
                            );
                            self.publish();
                        }
                        Ok(None) => {}
                        Err(e) => error!("External playlist refresh failed: {}", e),
                    }
                }
                received = self.reload_rx.recv() => match received {
                    Ok(config) => {
                        info!("Reloading playlist configuration");
                        if let Err(e) = self.ingestor.reload(config, self.fetcher.as_ref()).await {
                            error!("Playlist reload failed: {}", e);
                        }
                        ticker = self.build_ticker();
                        self.publish();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Skipped {} queued reload requests", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Reload channel closed, stopping scheduler");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
            }
        }

        Ok(())
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.ingestor.snapshot());
    }

    fn build_ticker(&self) -> Option<Interval> {
        let period = self
            .ingestor
            .config()
            .playlist
            .refresh_interval
            .filter(|period| !period.is_zero())?;

        if self.ingestor.config().playlist.external_url.is_none() {
            debug!("Refresh interval set without an external URL, not scheduling");
            return None;
        }

        info!("External playlist refresh every {}", humantime::format_duration(period));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(ticker)
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
