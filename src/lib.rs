pub mod config;
pub mod epg;
pub mod errors;
pub mod ingestor;
pub mod network;
pub mod playlist;
pub mod services;
pub mod sources;
pub mod utils;
