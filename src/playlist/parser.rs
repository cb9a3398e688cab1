//! Line-oriented playlist scanner and rewriter
//!
//! The scanner has two states. In `Scanning` it passes comments through and
//! waits for an `#EXTINF:` line; after one it is `InEntry` until the next
//! non-comment line, which is taken as the entry's stream URL.

use std::borrow::Cow;

use tracing::{debug, info, trace, warn};

use super::attributes::{ExtinfEntry, extract_tvg_url};
use super::buffer::TransformedPlaylist;
use super::classify::{build_service_url, extract_dynamic_params, is_url_recognizable};
use super::{MAX_LINE_LENGTH, is_c_space, truncate_to_char_boundary};
use crate::epg::EpgSink;
use crate::errors::{AttributeError, PlaylistResult};
use crate::network::AddressResolver;
use crate::services::{ServiceFactory, ServiceRegistry, ServiceSource, create_service_from_url};
use crate::utils::UrlUtils;

const HEADER_TAG: &str = "#EXTM3U";
const EXTINF_TAG: &str = "#EXTINF:";
const CATCHUP_SOURCE_QUOTED: &str = "catchup-source=\"";

/// Counters for one rewrite pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Entries whose URL line was consumed
    pub entries: usize,
    /// Entries emitted with a proxied URL
    pub rewritten: usize,
    /// Entries emitted unchanged
    pub passed_through: usize,
    /// `#EXTINF` lines dropped for a missing name or a missing URL line
    pub skipped: usize,
    /// Services added to the registry, catchup services included
    pub services_created: usize,
}

enum LineState {
    Scanning,
    InEntry(ExtinfEntry),
}

/// Rewrites playlists into the shared output buffer
///
/// Output accumulates across passes; the buffer and registry are only
/// cleared by the caller.
pub struct PlaylistRewriter<'a> {
    buffer: &'a mut TransformedPlaylist,
    registry: &'a mut ServiceRegistry,
    factory: &'a dyn ServiceFactory,
    epg: &'a mut dyn EpgSink,
    resolver: &'a AddressResolver,
    token: Option<&'a str>,
}

impl<'a> PlaylistRewriter<'a> {
    pub fn new(
        buffer: &'a mut TransformedPlaylist,
        registry: &'a mut ServiceRegistry,
        factory: &'a dyn ServiceFactory,
        epg: &'a mut dyn EpgSink,
        resolver: &'a AddressResolver,
        token: Option<&'a str>,
    ) -> Self {
        Self {
            buffer,
            registry,
            factory,
            epg,
            resolver,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Run one pass over `content`, appending to the output buffer
    ///
    /// A full buffer stops the pass; whatever was appended before stays.
    pub fn rewrite(&mut self, content: &str, source: ServiceSource) -> PlaylistResult<ParseSummary> {
        let base_url = self.resolver.resolve();
        info!("Server base URL: {}", base_url);

        let mut summary = ParseSummary::default();
        let mut state = LineState::Scanning;

        for raw_line in content.split('\n') {
            let line = truncate_to_char_boundary(raw_line, MAX_LINE_LENGTH)
                .trim_end_matches(is_c_space);
            if line.is_empty() {
                continue;
            }

            if line.starts_with(HEADER_TAG) {
                self.emit_header(line, &base_url)?;
            } else if line.starts_with(EXTINF_TAG) {
                if summary.entries == 0 {
                    self.buffer.append("\n")?;
                }
                state = match ExtinfEntry::parse(line) {
                    Ok(entry) => LineState::InEntry(entry),
                    Err(e) => {
                        warn!("Failed to extract service name from EXTINF line: {}", e);
                        summary.skipped += 1;
                        LineState::Scanning
                    }
                };
            } else if line.starts_with('#') {
                self.buffer.append_line(line)?;
            } else if let LineState::InEntry(entry) =
                std::mem::replace(&mut state, LineState::Scanning)
            {
                self.emit_entry(&entry, line, &base_url, source, &mut summary)?;
                summary.entries += 1;
            } else {
                trace!("Ignoring line outside an entry: {}", line);
            }
        }

        if let LineState::InEntry(entry) = state {
            debug!("Entry '{}' has no URL line, dropped", entry.name);
            summary.skipped += 1;
        }

        if source == ServiceSource::Inline {
            self.buffer.mark_inline_end();
        }

        info!(
            "Parsed {} M3U entries, generated transformed playlist ({} bytes)",
            summary.entries,
            self.buffer.len()
        );
        Ok(summary)
    }

    fn emit_header(&mut self, line: &str, base_url: &str) -> PlaylistResult<()> {
        let tvg_url = match extract_tvg_url(line) {
            Ok(url) => {
                info!(
                    "Found EPG URL in M3U header: {}",
                    UrlUtils::obfuscate_credentials(&url)
                );
                self.epg.set_epg_url(&url);
                Some(url)
            }
            Err(AttributeError::Missing) => None,
            Err(e) => {
                debug!("Ignoring EPG URL in M3U header: {}", e);
                None
            }
        };

        if self.buffer.header_emitted() {
            return Ok(());
        }

        match tvg_url {
            Some(url) => {
                let file_name = self.epg.served_file_name(&url);
                self.buffer
                    .append_line(&format!("{HEADER_TAG} x-tvg-url=\"{base_url}{file_name}\""))?;
            }
            None => self.buffer.append_line(line)?,
        }
        self.buffer.set_header_emitted();
        Ok(())
    }

    fn emit_entry(
        &mut self,
        entry: &ExtinfEntry,
        url: &str,
        base_url: &str,
        source: ServiceSource,
        summary: &mut ParseSummary,
    ) -> PlaylistResult<()> {
        if !is_url_recognizable(url) {
            debug!(
                "Preserving unrecognizable URL: {}",
                UrlUtils::obfuscate_credentials(url)
            );
            self.emit_verbatim(entry, url)?;
            summary.passed_through += 1;
            return self.buffer.append("\n");
        }

        match create_service_from_url(self.registry, self.factory, &entry.name, url, source) {
            Ok(unique_name) => {
                summary.services_created += 1;

                let extinf = self.rewrite_catchup(entry, &unique_name, base_url, source, summary);
                self.buffer.append_line(&extinf)?;

                let params = extract_dynamic_params(url);
                match build_service_url(base_url, &unique_name, params.as_deref(), self.token) {
                    Ok(proxy_url) => {
                        self.buffer.append_line(&proxy_url)?;
                        summary.rewritten += 1;
                    }
                    Err(e) => {
                        warn!("Keeping original URL for '{}': {}", unique_name, e);
                        self.buffer.append_line(url)?;
                        summary.passed_through += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Failed to create service '{}': {}", entry.name, e);
                self.emit_verbatim(entry, url)?;
                summary.passed_through += 1;
            }
        }

        self.buffer.append("\n")
    }

    fn emit_verbatim(&mut self, entry: &ExtinfEntry, url: &str) -> PlaylistResult<()> {
        self.buffer.append_line(&entry.raw_line)?;
        self.buffer.append_line(url)
    }

    /// The EXTINF line to emit, with `catchup-source` pointed at the gateway when possible
    fn rewrite_catchup<'e>(
        &mut self,
        entry: &'e ExtinfEntry,
        unique_name: &str,
        base_url: &str,
        source: ServiceSource,
        summary: &mut ParseSummary,
    ) -> Cow<'e, str> {
        let raw_line = entry.raw_line.as_str();
        let Some(catchup) = entry.catchup_source.as_deref() else {
            return Cow::Borrowed(raw_line);
        };

        if !is_url_recognizable(catchup) {
            // "&..." asks for the params to be appended to this gateway's own URL
            return match catchup.strip_prefix('&') {
                Some(params) => replace_catchup_source(raw_line, &format!("?{params}")),
                None => Cow::Borrowed(raw_line),
            };
        }

        let catchup_name = format!("{unique_name}/catchup");
        let catchup_unique =
            match create_service_from_url(self.registry, self.factory, &catchup_name, catchup, source) {
                Ok(name) => name,
                Err(e) => {
                    warn!("Failed to create catchup service '{}': {}", catchup_name, e);
                    return Cow::Borrowed(raw_line);
                }
            };
        summary.services_created += 1;

        let params = extract_dynamic_params(catchup);
        match build_service_url(base_url, &catchup_unique, params.as_deref(), self.token) {
            Ok(proxy_url) => replace_catchup_source(raw_line, &proxy_url),
            Err(e) => {
                warn!("Keeping original catchup source for '{}': {}", catchup_unique, e);
                Cow::Borrowed(raw_line)
            }
        }
    }
}

/// Replace the value of the first quoted `catchup-source` attribute
fn replace_catchup_source<'l>(line: &'l str, value: &str) -> Cow<'l, str> {
    let Some(start) = line
        .find(CATCHUP_SOURCE_QUOTED)
        .map(|pos| pos + CATCHUP_SOURCE_QUOTED.len())
    else {
        return Cow::Borrowed(line);
    };
    let Some(len) = line[start..].find('"') else {
        return Cow::Borrowed(line);
    };

    Cow::Owned(format!("{}{}{}", &line[..start], value, &line[start + len..]))
}
