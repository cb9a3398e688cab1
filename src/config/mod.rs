use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub playlist: PlaylistConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Externally visible host or base URL; overrides interface discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Listen entries in "[addr:]port" form; the first one supplies the default port
    #[serde(default = "default_listen")]
    pub listen: Vec<String>,
    /// Token appended to every proxied URL as `r2h-token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r2h_token: Option<String>,
}

/// Interfaces used for outbound connections towards the media source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub interface: String,
    #[serde(default)]
    pub interface_fcc: String,
    #[serde(default)]
    pub interface_rtsp: String,
    #[serde(default)]
    pub interface_multicast: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// M3U content defined directly in the configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<String>,
    /// Remote URL, file:// URL or local path of an external playlist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(
        default,
        with = "duration_serde::option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_interval: Option<Duration>,
    #[serde(default = "default_fetch_timeout", with = "duration_serde::duration")]
    pub fetch_timeout: Duration,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

fn default_listen() -> Vec<String> {
    vec![DEFAULT_LISTEN_PORT.to_string()]
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            listen: default_listen(),
            r2h_token: None,
        }
    }
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            inline: None,
            external_url: None,
            refresh_interval: None,
            fetch_timeout: default_fetch_timeout(),
            output_path: default_output_path(),
        }
    }
}

impl ServerConfig {
    /// Port of the first listen entry, as written in the configuration
    pub fn listen_port(&self) -> &str {
        self.listen
            .first()
            .map(|entry| match entry.rsplit_once(':') {
                Some((_, port)) => port,
                None => entry.as_str(),
            })
            .filter(|port| !port.is_empty())
            .unwrap_or(DEFAULT_LISTEN_PORT)
    }

    /// Configured hostname override, ignoring blank values
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref().filter(|h| !h.trim().is_empty())
    }

    /// Configured auth token, ignoring blank values
    pub fn token(&self) -> Option<&str> {
        self.r2h_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl UpstreamConfig {
    /// Interface for FCC sessions: FCC-specific, then general
    pub fn for_fcc(&self) -> Option<&str> {
        Self::pick(&self.interface_fcc, &self.interface)
    }

    /// Interface for RTSP sessions: RTSP-specific, then general
    pub fn for_rtsp(&self) -> Option<&str> {
        Self::pick(&self.interface_rtsp, &self.interface)
    }

    /// Interface for multicast joins: multicast-specific, then general
    pub fn for_multicast(&self) -> Option<&str> {
        Self::pick(&self.interface_multicast, &self.interface)
    }

    /// Every non-empty interface name, in any role
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        [
            &self.interface,
            &self.interface_fcc,
            &self.interface_rtsp,
            &self.interface_multicast,
        ]
        .into_iter()
        .map(String::as_str)
        .filter(|name| !name.is_empty())
    }

    /// Whether `name` is configured as an upstream interface in any role
    pub fn is_upstream(&self, name: &str) -> bool {
        self.all_names().any(|candidate| candidate == name)
    }

    fn pick<'a>(specific: &'a str, general: &'a str) -> Option<&'a str> {
        if !specific.is_empty() {
            Some(specific)
        } else if !general.is_empty() {
            Some(general)
        } else {
            None
        }
    }
}

impl Config {
    /// Reject settings that would produce unusable playlist URLs
    pub fn validate(&self) -> AppResult<()> {
        let port = self.server.listen_port();
        match port.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(AppError::configuration(format!(
                    "Invalid listen port '{port}'"
                )));
            }
            Ok(_) => {}
        }

        if let Some(token) = self.server.token() {
            if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
                return Err(AppError::configuration(
                    "r2h_token must not contain whitespace or control characters",
                ));
            }
        }

        if self.playlist.fetch_timeout.is_zero() {
            return Err(AppError::configuration("fetch_timeout must be greater than zero"));
        }

        Ok(())
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }
}
