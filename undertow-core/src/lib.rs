//! Undertow Core - shared foundation for the source resolution engine
//!
//! This crate provides the building blocks the resolver and CLI are built
//! on: catalog domain types, the tri-state lookup cache, the relay HTTP
//! transport and centralized configuration.

pub mod cache;
pub mod config;
pub mod media;
pub mod relay;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use cache::{CacheStatistics, EpisodeKey, LookupCache, ShowKey, SourceKey};
pub use config::UndertowConfig;
pub use media::{
    AudioPreference, EpisodeRef, MediaIdentity, MediaTitles, ShowId, SkipMarkers, SubtitleTrack,
    VideoVariant,
};
pub use relay::{RelayClient, RelayError};
