//! Playlist ingestion lifecycle
//!
//! [`PlaylistIngestor`] owns every piece of mutable playlist state: the
//! output buffer, the service registry and the EPG location. Inline content
//! is ingested once per configuration; external content can be refreshed
//! on its own, replacing only what the previous external pass produced.

use tracing::{error, info, warn};

use crate::config::Config;
use crate::epg::EpgState;
use crate::errors::AppResult;
use crate::network::{AddressResolver, InterfaceProvider, SystemInterfaces};
use crate::playlist::{ParseSummary, PlaylistRewriter, TransformedPlaylist};
use crate::services::{ServiceRegistry, ServiceSource, UrlServiceFactory};
use crate::sources::PlaylistFetcher;
use crate::utils::UrlUtils;

pub mod scheduler;

pub use scheduler::{
    PlaylistSnapshot, RefreshScheduler, ReloadReceiver, ReloadSender, create_reload_channel,
};

pub struct PlaylistIngestor {
    config: Config,
    buffer: TransformedPlaylist,
    registry: ServiceRegistry,
    factory: UrlServiceFactory,
    epg: EpgState,
    resolver: AddressResolver,
}

impl PlaylistIngestor {
    /// Ingestor resolving its base URL from the host's interfaces
    pub fn new(config: Config) -> Self {
        Self::with_interfaces(config, Box::new(SystemInterfaces))
    }

    pub fn with_interfaces(config: Config, interfaces: Box<dyn InterfaceProvider>) -> Self {
        let resolver = AddressResolver::new(
            config.server.clone(),
            config.upstream.clone(),
            interfaces,
        );
        Self {
            factory: UrlServiceFactory::new(config.upstream.clone()),
            config,
            buffer: TransformedPlaylist::new(),
            registry: ServiceRegistry::new(),
            epg: EpgState::new(),
            resolver,
        }
    }

    /// Rewrite inline playlist text into the buffer
    pub fn ingest_inline(&mut self, content: &str) -> AppResult<ParseSummary> {
        info!("Parsing M3U content from: inline");
        self.rewrite(content, ServiceSource::Inline)
    }

    /// Fetch and rewrite an external playlist
    ///
    /// Nothing is touched when the fetch fails.
    pub async fn ingest_external(
        &mut self,
        url: &str,
        fetcher: &dyn PlaylistFetcher,
    ) -> AppResult<ParseSummary> {
        let masked = UrlUtils::obfuscate_credentials(url);
        let content = fetcher.fetch(url).await.inspect_err(|e| {
            error!("Failed to fetch external M3U {}: {}", masked, e);
        })?;

        info!("Parsing M3U content from: {}", masked);
        self.rewrite(&content, ServiceSource::External)
    }

    /// Replace the external part of the playlist with a fresh fetch
    ///
    /// Returns `Ok(None)` when no external URL is configured. A failed fetch
    /// keeps the previous external content and services.
    pub async fn refresh_external(
        &mut self,
        fetcher: &dyn PlaylistFetcher,
    ) -> AppResult<Option<ParseSummary>> {
        let Some(url) = self.external_url().map(str::to_string) else {
            return Ok(None);
        };
        let masked = UrlUtils::obfuscate_credentials(&url);

        let content = fetcher.fetch(&url).await.inspect_err(|e| {
            warn!("External M3U refresh failed, keeping previous content: {}", e);
        })?;

        let removed = self.registry.remove_by_source(ServiceSource::External);
        self.buffer.reset_external();
        info!(
            "Reloading external M3U {} ({} stale services removed)",
            masked, removed
        );

        self.rewrite(&content, ServiceSource::External).map(Some)
    }

    /// Start over from `config`: inline content first, then the external playlist
    ///
    /// Inline failures are returned; an external failure is logged and leaves
    /// the inline part in place.
    pub async fn reload(&mut self, config: Config, fetcher: &dyn PlaylistFetcher) -> AppResult<()> {
        config.validate()?;

        self.buffer.reset_all();
        self.registry.clear();
        self.epg.clear();
        self.resolver
            .reconfigure(config.server.clone(), config.upstream.clone());
        self.factory = UrlServiceFactory::new(config.upstream.clone());
        self.config = config;

        if let Some(inline) = self.inline_content().map(str::to_string) {
            self.ingest_inline(&inline)?;
        }

        if let Some(url) = self.external_url().map(str::to_string) {
            if let Err(e) = self.ingest_external(&url, fetcher).await {
                error!("External M3U not loaded: {}", e);
            }
        }

        info!(
            "Playlist ready: {} services, {} bytes",
            self.registry.len(),
            self.buffer.len()
        );
        Ok(())
    }

    pub fn playlist(&self) -> Option<&str> {
        self.buffer.get_current()
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn epg(&self) -> &EpgState {
        &self.epg
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current state for publishing
    pub fn snapshot(&self) -> PlaylistSnapshot {
        PlaylistSnapshot {
            content: self.playlist().unwrap_or_default().to_string(),
            service_count: self.registry.len(),
            epg_url: self.epg.url().map(str::to_string),
        }
    }

    fn inline_content(&self) -> Option<&str> {
        self.config
            .playlist
            .inline
            .as_deref()
            .filter(|content| !content.trim().is_empty())
    }

    fn external_url(&self) -> Option<&str> {
        self.config
            .playlist
            .external_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    fn rewrite(&mut self, content: &str, source: ServiceSource) -> AppResult<ParseSummary> {
        let token = self.config.server.token();
        let summary = PlaylistRewriter::new(
            &mut self.buffer,
            &mut self.registry,
            &self.factory,
            &mut self.epg,
            &self.resolver,
            token,
        )
        .rewrite(content, source)?;
        Ok(summary)
    }
}
