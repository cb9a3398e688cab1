//! Playlist sources
//!
//! External playlists may live on an HTTP(S) server or on local disk. Either
//! way the fetched text is capped in size and decoded leniently.

pub mod fetch;

pub use fetch::{HttpFileFetcher, MAX_SOURCE_SIZE, PlaylistFetcher};
