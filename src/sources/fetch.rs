use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{SourceError, SourceResult};
use crate::utils::{DecompressionService, UrlUtils};

/// Largest playlist accepted from any source (10 MiB)
pub const MAX_SOURCE_SIZE: u64 = 10 * 1024 * 1024;

const FILE_SCHEME: &str = "file://";

/// Retrieves raw playlist text
#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    /// Fetch the playlist at `location`: an http(s) URL, a `file://` URL or a path
    async fn fetch(&self, location: &str) -> SourceResult<String>;
}

/// Fetcher for HTTP(S) URLs and local files
///
/// Gzip-compressed bodies are detected by magic bytes and inflated, and
/// invalid UTF-8 is replaced rather than rejected.
pub struct HttpFileFetcher {
    client: Client,
}

impl HttpFileFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("m3u-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    async fn fetch_http(&self, url: &str) -> SourceResult<Vec<u8>> {
        let masked = UrlUtils::obfuscate_credentials(url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::request(masked.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        if let Some(length) = response.content_length() {
            check_size(length)?;
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::request(masked.as_str(), e.to_string()))?;
        check_size(body.len() as u64)?;

        info!(
            "Successfully fetched M3U from URL ({} bytes): {}",
            body.len(),
            masked
        );
        Ok(body.to_vec())
    }

    async fn read_file(&self, path: &str) -> SourceResult<Vec<u8>> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| SourceError::io(path, e.to_string()))?;
        check_size(metadata.len())?;

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| SourceError::io(path, e.to_string()))?;
        check_size(data.len() as u64)?;

        debug!("Read M3U file ({} bytes): {}", data.len(), path);
        Ok(data)
    }
}

#[async_trait]
impl PlaylistFetcher for HttpFileFetcher {
    async fn fetch(&self, location: &str) -> SourceResult<String> {
        let location = location.trim();

        let raw = if location.starts_with("http://") || location.starts_with("https://") {
            self.fetch_http(location).await?
        } else {
            let path = location.strip_prefix(FILE_SCHEME).unwrap_or(location);
            self.read_file(path).await?
        };

        let data = DecompressionService::decompress(raw)?;
        check_size(data.len() as u64)?;

        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

fn check_size(size: u64) -> SourceResult<()> {
    if size > MAX_SOURCE_SIZE {
        return Err(SourceError::TooLarge {
            size,
            max_size: MAX_SOURCE_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fetcher() -> HttpFileFetcher {
        HttpFileFetcher::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_fetch_local_path_and_file_url() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "#EXTM3U\n#EXTINF:-1,CNN\nrtp://239.1.1.1:5000\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let by_path = fetcher().fetch(&path).await.unwrap();
        let by_url = fetcher().fetch(&format!("file://{path}")).await.unwrap();

        assert!(by_path.starts_with("#EXTM3U"));
        assert_eq!(by_path, by_url);
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let err = fetcher()
            .fetch("file:///nonexistent/playlist.m3u")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_file() {
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(MAX_SOURCE_SIZE + 1).unwrap();

        let err = fetcher()
            .fetch(file.path().to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::TooLarge { size, .. } if size == MAX_SOURCE_SIZE + 1));
    }

    #[tokio::test]
    async fn test_fetch_replaces_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"#EXTM3U\n#EXTINF:-1,Caf\xe9\n").unwrap();

        let content = fetcher().fetch(file.path().to_str().unwrap()).await.unwrap();
        assert!(content.contains("Caf\u{fffd}"));
    }

    #[cfg(feature = "compression-gzip")]
    #[tokio::test]
    async fn test_fetch_gzipped_file() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"#EXTM3U\n").unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&encoder.finish().unwrap()).unwrap();

        let content = fetcher().fetch(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(content, "#EXTM3U\n");
    }
}
