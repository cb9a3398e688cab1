//! Stream URL recognition, proxy unwrapping and proxy URL construction

use std::fmt;

use super::MAX_URL_LENGTH;
use crate::errors::PlaylistError;
use crate::utils::UrlUtils;

/// Longest path segment accepted as a scheme in a wrapped URL
const MAX_WRAPPED_SCHEME_LENGTH: usize = 15;

/// Query parameter carrying the gateway auth token
pub const TOKEN_PARAM: &str = "r2h-token";

/// Media schemes the gateway can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaScheme {
    Rtp,
    Udp,
    Rtsp,
}

impl MediaScheme {
    /// Parse a bare scheme name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("rtp") {
            Some(Self::Rtp)
        } else if name.eq_ignore_ascii_case("udp") {
            Some(Self::Udp)
        } else if name.eq_ignore_ascii_case("rtsp") {
            Some(Self::Rtsp)
        } else {
            None
        }
    }

    /// Scheme of a `scheme://...` URL, if it is a media scheme
    pub fn of_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once("://")?;
        Self::from_name(scheme)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rtp => "rtp",
            Self::Udp => "udp",
            Self::Rtsp => "rtsp",
        }
    }
}

impl fmt::Display for MediaScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unwrap `http(s)://host[:port]/<rtp|udp|rtsp>/<rest>` into `<scheme>://<rest>`
///
/// # Examples
///
/// ```rust
/// use m3u_gateway::playlist::classify::extract_wrapped_url;
///
/// assert_eq!(
///     extract_wrapped_url("http://router:5140/rtp/239.253.64.120:5140").as_deref(),
///     Some("rtp://239.253.64.120:5140")
/// );
/// assert_eq!(extract_wrapped_url("http://host/foo"), None);
/// ```
pub fn extract_wrapped_url(url: &str) -> Option<String> {
    let host_start = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))?;

    // IPv6 literals contain ':' and may not be searched for '/' blindly
    let path = if host_start.starts_with('[') {
        let bracket_end = host_start.find(']')?;
        let after = &host_start[bracket_end..];
        &after[after.find('/')? + 1..]
    } else {
        &host_start[host_start.find('/')? + 1..]
    };

    let (scheme, rest) = path.split_once('/')?;
    if scheme.len() > MAX_WRAPPED_SCHEME_LENGTH {
        return None;
    }
    let scheme = MediaScheme::from_name(scheme)?;

    Some(format!("{scheme}://{rest}"))
}

/// Unwrap a proxy-wrapped URL, or return the URL unchanged
pub fn normalize_media_url(url: &str) -> String {
    extract_wrapped_url(url).unwrap_or_else(|| url.to_string())
}

/// Whether the URL (after unwrapping) uses a scheme the gateway can serve
pub fn is_url_recognizable(url: &str) -> bool {
    MediaScheme::of_url(&normalize_media_url(url)).is_some()
}

/// Keep only the query pairs whose value holds a `{`, `}` or `$` placeholder
///
/// # Examples
///
/// ```rust
/// use m3u_gateway::playlist::classify::extract_dynamic_params;
///
/// assert_eq!(
///     extract_dynamic_params("rtp://h/ch?x=1&tok={sid}&y=2").as_deref(),
///     Some("tok={sid}")
/// );
/// assert_eq!(extract_dynamic_params("rtp://h/ch?x=1"), None);
/// ```
pub fn extract_dynamic_params(url: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            pair.split_once('=')
                .is_some_and(|(_, value)| value.contains(['{', '}', '$']))
        })
        .collect();

    (!kept.is_empty()).then(|| kept.join("&"))
}

/// Build `<base><encoded-name>[?<params>][&r2h-token=<encoded-token>]`
///
/// `base_url` must already end with '/'.
pub fn build_service_url(
    base_url: &str,
    service_name: &str,
    query_params: Option<&str>,
    token: Option<&str>,
) -> Result<String, PlaylistError> {
    let mut url = format!("{base_url}{}", UrlUtils::encode_component(service_name));

    let query_params = query_params.filter(|params| !params.is_empty());
    let token = token.filter(|token| !token.is_empty());

    if let Some(params) = query_params {
        url.push('?');
        url.push_str(params);
    }
    if let Some(token) = token {
        url.push(if query_params.is_some() { '&' } else { '?' });
        url.push_str(TOKEN_PARAM);
        url.push('=');
        url.push_str(&UrlUtils::encode_component(token));
    }

    if url.len() > MAX_URL_LENGTH {
        return Err(PlaylistError::UrlTooLong {
            length: url.len(),
            max: MAX_URL_LENGTH,
        });
    }
    Ok(url)
}
