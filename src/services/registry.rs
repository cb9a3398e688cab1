use std::fmt;

use super::media::MediaSession;

/// Which kind of playlist a service came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceSource {
    /// Playlist text embedded in the configuration
    Inline,
    /// Playlist fetched from an external URL
    External,
}

impl fmt::Display for ServiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => f.write_str("inline"),
            Self::External => f.write_str("external"),
        }
    }
}

/// A named stream exposed by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Unique name; the path clients request
    pub name: String,
    /// Normalized media URL, unwrapped when the playlist entry was proxied
    pub url: String,
    pub source: ServiceSource,
    pub session: MediaSession,
}

/// Ordered collection of services created from playlists
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<Service>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, service: Service) {
        self.services.push(service);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    pub fn find(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Remove every service that came from `source`, returning how many were dropped
    pub fn remove_by_source(&mut self, source: ServiceSource) -> usize {
        let before = self.services.len();
        self.services.retain(|service| service.source != source);
        before - self.services.len()
    }

    pub fn clear(&mut self) {
        self.services.clear();
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
