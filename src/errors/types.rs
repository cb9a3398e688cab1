//! Error type definitions for the gateway
//!
//! Transport failures abort a source before any output is produced, pass
//! failures stop a parse midway, and field or binding failures only ever
//! degrade a single entry to its original text.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Source handling errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Parse pass errors
    #[error("Playlist error: {0}")]
    Playlist(#[from] PlaylistError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Errors raised while fetching playlist content
#[derive(Error, Debug)]
pub enum SourceError {
    /// Non-success HTTP status from the remote source
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Request could not be sent or the body could not be read
    #[error("Request failed: {url} - {message}")]
    Request { url: String, message: String },

    /// Local file could not be opened or read
    #[error("I/O error: {path} - {message}")]
    Io { path: String, message: String },

    /// Content exceeds the maximum accepted size
    #[error("Content too large: {size} bytes (max: {max_size})")]
    TooLarge { size: u64, max_size: u64 },

    /// Compressed content could not be decoded
    #[error("Decompression failed: {message}")]
    Decompression { message: String },
}

/// Errors that stop or degrade a parse pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    /// Appending would grow the transformed playlist past its hard cap
    #[error("Transformed playlist too large: {requested} bytes (max: {limit})")]
    CapacityExceeded { requested: usize, limit: usize },

    /// A generated proxy URL does not fit the URL length limit
    #[error("Service URL too long: {length} bytes (max: {max})")]
    UrlTooLong { length: usize, max: usize },
}

/// Reasons a single attribute could not be extracted from a line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("attribute not present")]
    Missing,

    #[error("quoted value is not terminated")]
    Unterminated,

    #[error("value is empty")]
    Empty,

    #[error("value is {length} bytes (max: {max})")]
    TooLong { length: usize, max: usize },
}

/// Errors raised while turning a stream URL into a service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// URL scheme is not one of rtp, udp or rtsp
    #[error("Unsupported URL scheme: {url}")]
    UnsupportedScheme { url: String },

    /// URL has a supported scheme but no usable media locator
    #[error("Invalid media URL: {url} - {message}")]
    InvalidLocator { url: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create a request error for a URL
    pub fn request<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Request {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error for a local path
    pub fn io<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl BindError {
    /// Create an invalid locator error
    pub fn invalid_locator<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::InvalidLocator {
            url: url.into(),
            message: message.into(),
        }
    }
}
