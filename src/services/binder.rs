//! Binding playlist entries to uniquely named services

use tracing::{debug, info};

use super::media::ServiceFactory;
use super::registry::{Service, ServiceRegistry, ServiceSource};
use crate::errors::BindError;
use crate::playlist::classify::{MediaScheme, normalize_media_url};

/// Highest numeric suffix considered when deduplicating names
const MAX_NAME_SUFFIX: u32 = 1000;

/// Return `candidate`, or `candidate/N` with N one past the highest suffix in use
///
/// Suffixes are only counted when they are all digits and between 2 and 999.
/// An existing suffix alone is enough to force numbering, even when the bare
/// name is free.
pub fn find_unique_service_name(registry: &ServiceRegistry, candidate: &str) -> String {
    let mut exact_match = false;
    let mut max_suffix = 0;

    for service in registry.iter() {
        if service.name == candidate {
            exact_match = true;
            continue;
        }

        let Some(suffix) = service
            .name
            .strip_prefix(candidate)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            continue;
        };

        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(n) = suffix.parse::<u32>() {
            if n > 1 && n < MAX_NAME_SUFFIX && n > max_suffix {
                max_suffix = n;
            }
        }
    }

    match (exact_match, max_suffix) {
        (false, 0) => candidate.to_string(),
        (_, 0) => format!("{candidate}/2"),
        (_, max) => format!("{candidate}/{}", max + 1),
    }
}

/// Create a service for `url` under a unique variant of `name`
///
/// Proxy-wrapped URLs are unwrapped first. On success the service is appended
/// to the registry and its final name returned.
pub fn create_service_from_url(
    registry: &mut ServiceRegistry,
    factory: &dyn ServiceFactory,
    name: &str,
    url: &str,
    source: ServiceSource,
) -> Result<String, BindError> {
    let media_url = normalize_media_url(url);

    let session = match MediaScheme::of_url(&media_url) {
        Some(MediaScheme::Rtp | MediaScheme::Udp) => factory.create_from_rtp_url(&media_url)?,
        Some(MediaScheme::Rtsp) => factory.create_from_rtsp_url(&media_url)?,
        None => {
            return Err(BindError::UnsupportedScheme {
                url: url.to_string(),
            });
        }
    };

    let unique_name = find_unique_service_name(registry, name);
    if unique_name != name {
        debug!("Service name '{}' taken, using '{}'", name, unique_name);
    }

    info!(
        "Service created: {} ({}) [{}]",
        unique_name,
        session.service_type.label(),
        source
    );

    registry.push(Service {
        name: unique_name.clone(),
        url: media_url,
        source,
        session,
    });

    Ok(unique_name)
}
