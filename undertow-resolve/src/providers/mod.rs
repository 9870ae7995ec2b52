//! Provider adapter implementations for episode source resolution.

use std::sync::Arc;

use async_trait::async_trait;
use undertow_core::config::UndertowConfig;
use undertow_core::media::{AudioPreference, EpisodeRef, ShowId, VideoVariant};
use undertow_core::relay::RelayClient;

use crate::errors::ProviderError;

pub mod allanime;
pub mod gogo;
#[cfg(test)]
pub mod mock;

pub use allanime::AllAnimeProvider;
pub use gogo::GogoProvider;

/// Outcome of a lookup that may legitimately find nothing.
///
/// Distinct from `Err`: `NotFound` means the upstream responded and the
/// entity is absent from its catalog, which is a cacheable fact, while a
/// transport or parse failure is transient and must stay retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The entity exists in the provider's catalog.
    Found(T),
    /// The upstream responded; the entity is confirmed absent.
    NotFound,
}

impl<T> Lookup<T> {
    /// Collapses into an `Option`, losing nothing: the caller records
    /// `None` as an explicit negative cache entry.
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

/// Capability set one upstream scraping backend must implement.
///
/// Implementations encapsulate one upstream's search/info/watch protocol
/// quirks behind three operations. All of them go through the relay
/// transport and may fail transiently; "not found" is an `Ok` outcome,
/// not an error.
#[async_trait]
pub trait SourceProvider: Send + Sync + std::fmt::Debug {
    /// Stable name used in cache keys and logs.
    fn name(&self) -> &'static str;

    /// Searches the upstream catalog for `title` and picks the
    /// `match_index`-th entry that survives the audio-convention filter
    /// and the exact-title-or-release-year filter.
    ///
    /// # Errors
    /// - `ProviderError::Network` - transport failure or timeout
    /// - `ProviderError::UpstreamStatus` - unexpected HTTP status
    /// - `ProviderError::Payload` - response shape not understood
    async fn resolve_show_id(
        &self,
        title: &str,
        audio: AudioPreference,
        release_year: Option<u16>,
        match_index: usize,
    ) -> Result<Lookup<ShowId>, ProviderError>;

    /// Finds the episode with number `episode` in the show's listing.
    /// Matched by numeric equality; upstream numbering may have gaps.
    ///
    /// # Errors
    /// Same as [`SourceProvider::resolve_show_id`].
    async fn resolve_episode_ref(
        &self,
        show_id: &ShowId,
        episode: u32,
    ) -> Result<Lookup<EpisodeRef>, ProviderError>;

    /// Fetches every playable variant the upstream's mirrors offer for
    /// the episode. Mirrors are queried concurrently; a failing mirror
    /// contributes nothing instead of failing the fetch.
    ///
    /// # Errors
    /// Same as [`SourceProvider::resolve_show_id`].
    async fn fetch_sources(
        &self,
        episode: &EpisodeRef,
    ) -> Result<Vec<VideoVariant>, ProviderError>;
}

/// Builds the default provider set in priority order.
///
/// Order is a trust ranking, not merely availability: the orchestrator
/// returns the first hit and never consults the rest.
pub fn default_providers(
    config: &UndertowConfig,
    relay: RelayClient,
) -> Vec<Arc<dyn SourceProvider>> {
    vec![
        Arc::new(GogoProvider::new(
            config.providers.gogo_base.clone(),
            relay.clone(),
        )),
        Arc::new(AllAnimeProvider::new(
            config.providers.allanime_api.clone(),
            config.providers.allanime_referer.clone(),
            relay,
        )),
    ]
}
