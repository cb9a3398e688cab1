/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Server defaults
pub const DEFAULT_LISTEN_PORT: &str = "5140";

// Playlist defaults
pub const DEFAULT_OUTPUT_PATH: &str = "./playlist.m3u";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
