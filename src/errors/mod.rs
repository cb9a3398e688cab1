//! Centralized error handling for the gateway playlist pipeline
//!
//! Errors are layered so that callers can tell a dropped field or entry
//! apart from an aborted pass.
//!
//! # Error Categories
//!
//! - **Source Errors**: fetching playlist content over HTTP or from disk
//! - **Playlist Errors**: failures that stop a parse pass
//! - **Attribute Errors**: a single EXTINF/header field could not be extracted
//! - **Bind Errors**: a stream URL could not be turned into a service
//!
//! # Usage
//!
//! ```rust
//! use m3u_gateway::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;

/// Convenience type alias for parse pass Results
pub type PlaylistResult<T> = Result<T, PlaylistError>;
