//! Electronic programme guide location
//!
//! The playlist header may name an upstream EPG. The gateway re-serves it
//! under its own base URL, so the header rewrite only needs to know whether
//! the upstream file is gzipped.

use tracing::info;

/// Receiver for EPG URLs discovered in playlist headers
pub trait EpgSink {
    fn set_epg_url(&mut self, url: &str);

    fn url_is_gzipped(&self, url: &str) -> bool {
        url_is_gzipped(url)
    }

    /// File name the gateway serves the guide from `url` under
    fn served_file_name(&self, url: &str) -> &'static str {
        if self.url_is_gzipped(url) {
            "epg.xml.gz"
        } else {
            "epg.xml"
        }
    }
}

/// The most recently announced EPG URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpgState {
    url: Option<String>,
}

impl EpgState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn clear(&mut self) {
        self.url = None;
    }
}

impl EpgSink for EpgState {
    fn set_epg_url(&mut self, url: &str) {
        if self.url.as_deref() != Some(url) {
            info!("EPG URL set: {}", url);
            self.url = Some(url.to_string());
        }
    }
}

/// Whether the URL path ends in `.gz`, ignoring case, query and fragment
pub fn url_is_gzipped(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.len() >= 3
        && path
            .get(path.len() - 3..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(".gz"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://epg.example/guide.xml.gz", true)]
    #[case("http://epg.example/guide.XML.GZ", true)]
    #[case("http://epg.example/guide.xml.gz?token=1", true)]
    #[case("http://epg.example/guide.gz#frag", true)]
    #[case("http://epg.example/guide.xml", false)]
    #[case("http://epg.example/gz?f=a.gz", false)]
    #[case("gz", false)]
    fn test_url_is_gzipped(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(url_is_gzipped(url), expected);
    }

    #[test]
    fn test_epg_state() {
        let mut state = EpgState::new();
        assert_eq!(state.url(), None);

        state.set_epg_url("http://epg.example/e.xml.gz");
        assert_eq!(state.url(), Some("http://epg.example/e.xml.gz"));
        assert_eq!(state.served_file_name("http://epg.example/e.xml.gz"), "epg.xml.gz");
        assert_eq!(state.served_file_name("http://epg.example/e.xml?gz=1"), "epg.xml");

        state.clear();
        assert_eq!(state.url(), None);
    }
}
