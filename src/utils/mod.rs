//! Utility modules for the gateway
//!
//! This module contains reusable utilities that can be used
//! across different parts of the system.

pub mod decompression;
pub mod url;

pub use decompression::{CompressionFormat, DecompressionService};
pub use url::UrlUtils;
