//! Services created from playlist entries
//!
//! A service is a uniquely named stream the gateway can serve on demand. The
//! [`binder`] turns playlist URLs into services through a [`ServiceFactory`]
//! and keeps names unique within the [`ServiceRegistry`].

pub mod binder;
pub mod media;
pub mod registry;

pub use binder::{create_service_from_url, find_unique_service_name};
pub use media::{MediaLocator, MediaSession, ServiceFactory, ServiceType, UrlServiceFactory};
pub use registry::{Service, ServiceRegistry, ServiceSource};
