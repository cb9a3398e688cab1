//! Media session construction from rtp/udp/rtsp URLs
//!
//! The factory is the seam between playlist binding and the streaming side:
//! it only validates and describes where a stream lives and which upstream
//! interface will carry it. Joining groups and opening RTSP sessions happen
//! elsewhere, when a client actually requests the service.

use url::Url;

use crate::config::UpstreamConfig;
use crate::errors::BindError;
use crate::playlist::classify::MediaScheme;

pub const DEFAULT_RTP_PORT: u16 = 1234;
pub const DEFAULT_RTSP_PORT: u16 = 554;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    /// Multicast RTP or raw UDP
    MulticastRtp,
    Rtsp,
}

impl ServiceType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MulticastRtp => "RTP",
            Self::Rtsp => "RTSP",
        }
    }
}

/// Where a stream lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLocator {
    pub scheme: MediaScheme,
    pub host: String,
    pub port: u16,
    /// Source address for source-specific multicast (`rtp://source@group:port`)
    pub source: Option<String>,
    pub path: String,
    pub query: Option<String>,
}

/// A stream the gateway can open on demand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSession {
    pub service_type: ServiceType,
    pub locator: MediaLocator,
    /// Interface used to reach the media source, if one is configured
    pub upstream_interface: Option<String>,
    /// FCC server (`host:port`) for fast channel change
    pub fcc_server: Option<String>,
    pub fcc_interface: Option<String>,
}

/// Builds media sessions for the service binder
pub trait ServiceFactory {
    /// Build a multicast session from an `rtp://` or `udp://` URL
    fn create_from_rtp_url(&self, url: &str) -> Result<MediaSession, BindError>;

    /// Build an RTSP session from an `rtsp://` URL
    fn create_from_rtsp_url(&self, url: &str) -> Result<MediaSession, BindError>;
}

/// Default factory that parses the URL and applies upstream interface selection
#[derive(Debug, Clone, Default)]
pub struct UrlServiceFactory {
    upstream: UpstreamConfig,
}

impl UrlServiceFactory {
    pub fn new(upstream: UpstreamConfig) -> Self {
        Self { upstream }
    }

    fn parse(url: &str, expected: &[MediaScheme]) -> Result<(Url, MediaScheme), BindError> {
        let parsed = Url::parse(url).map_err(|e| BindError::invalid_locator(url, e.to_string()))?;

        let scheme = MediaScheme::from_name(parsed.scheme())
            .filter(|scheme| expected.contains(scheme))
            .ok_or_else(|| BindError::UnsupportedScheme {
                url: url.to_string(),
            })?;

        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(BindError::invalid_locator(url, "missing host"));
        }

        Ok((parsed, scheme))
    }
}

impl ServiceFactory for UrlServiceFactory {
    fn create_from_rtp_url(&self, url: &str) -> Result<MediaSession, BindError> {
        let (parsed, scheme) = Self::parse(url, &[MediaScheme::Rtp, MediaScheme::Udp])?;

        let fcc_server = parsed
            .query_pairs()
            .find(|(key, _)| key.eq_ignore_ascii_case("fcc"))
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        Ok(MediaSession {
            service_type: ServiceType::MulticastRtp,
            locator: MediaLocator {
                scheme,
                host: parsed.host_str().unwrap_or_default().to_string(),
                port: parsed.port().unwrap_or(DEFAULT_RTP_PORT),
                source: Some(parsed.username())
                    .filter(|user| !user.is_empty())
                    .map(str::to_string),
                path: parsed.path().to_string(),
                query: parsed.query().map(str::to_string),
            },
            upstream_interface: self.upstream.for_multicast().map(str::to_string),
            fcc_interface: fcc_server
                .as_ref()
                .and(self.upstream.for_fcc())
                .map(str::to_string),
            fcc_server,
        })
    }

    fn create_from_rtsp_url(&self, url: &str) -> Result<MediaSession, BindError> {
        let (parsed, scheme) = Self::parse(url, &[MediaScheme::Rtsp])?;

        Ok(MediaSession {
            service_type: ServiceType::Rtsp,
            locator: MediaLocator {
                scheme,
                host: parsed.host_str().unwrap_or_default().to_string(),
                port: parsed.port().unwrap_or(DEFAULT_RTSP_PORT),
                source: None,
                path: parsed.path().to_string(),
                query: parsed.query().map(str::to_string),
            },
            upstream_interface: self.upstream.for_rtsp().map(str::to_string),
            fcc_server: None,
            fcc_interface: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> UrlServiceFactory {
        UrlServiceFactory::new(UpstreamConfig {
            interface: "eth0".to_string(),
            interface_fcc: "eth9".to_string(),
            interface_rtsp: String::new(),
            interface_multicast: "eth1".to_string(),
        })
    }

    #[test]
    fn test_rtp_session() {
        let session = factory()
            .create_from_rtp_url("rtp://239.253.64.120:5140?fcc=10.255.14.152:15970")
            .unwrap();
        assert_eq!(session.service_type, ServiceType::MulticastRtp);
        assert_eq!(session.locator.scheme, MediaScheme::Rtp);
        assert_eq!(session.locator.host, "239.253.64.120");
        assert_eq!(session.locator.port, 5140);
        assert_eq!(session.upstream_interface.as_deref(), Some("eth1"));
        assert_eq!(session.fcc_server.as_deref(), Some("10.255.14.152:15970"));
        assert_eq!(session.fcc_interface.as_deref(), Some("eth9"));
    }

    #[test]
    fn test_udp_session_defaults_and_ssm_source() {
        let session = factory()
            .create_from_rtp_url("udp://10.0.0.9@239.1.1.1")
            .unwrap();
        assert_eq!(session.locator.scheme, MediaScheme::Udp);
        assert_eq!(session.locator.port, DEFAULT_RTP_PORT);
        assert_eq!(session.locator.source.as_deref(), Some("10.0.0.9"));
        assert_eq!(session.fcc_server, None);
        assert_eq!(session.fcc_interface, None);

        let anonymous = factory().create_from_rtp_url("udp://@239.1.1.1:5000").unwrap();
        assert_eq!(anonymous.locator.source, None);
        assert_eq!(anonymous.locator.host, "239.1.1.1");
    }

    #[test]
    fn test_rtsp_session() {
        let session = factory()
            .create_from_rtsp_url("rtsp://10.0.0.5/PLTV/88888888/224/3221225618/10000100000000060000000000107312_0.smil?playseek={utc:YmdHMS}")
            .unwrap();
        assert_eq!(session.service_type, ServiceType::Rtsp);
        assert_eq!(session.locator.port, DEFAULT_RTSP_PORT);
        assert!(session.locator.path.starts_with("/PLTV/"));
        assert!(session.locator.query.is_some());
        assert_eq!(session.upstream_interface.as_deref(), Some("eth0"));
    }

    #[test]
    fn test_rejects_wrong_scheme_and_missing_host() {
        assert!(matches!(
            factory().create_from_rtsp_url("rtp://239.1.1.1:5000"),
            Err(BindError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            factory().create_from_rtp_url("rtp://:5000"),
            Err(BindError::InvalidLocator { .. })
        ));
    }
}
