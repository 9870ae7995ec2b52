//! Multi-provider resolution orchestrator.
//!
//! Walks providers in priority order and candidate titles in normalizer
//! order, sequentially: racing attempts would write conflicting cache
//! entries and could let a lower-priority provider win on latency. The
//! first non-empty variant set short-circuits everything that remains.
//!
//! Confirmed absences are cached at each granularity (show id, episode
//! ref, final source list) so a later request for another episode of the
//! same show reuses the show-id lookup and a repeat of the same episode
//! is answered without any network call. Transient failures are never
//! cached: a retry in a later request is allowed to re-attempt them.
//! Cache writes only happen after a completed upstream call, so an
//! abandoned (dropped) resolution poisons nothing.

use std::sync::Arc;

use undertow_core::cache::{EpisodeKey, LookupCache, ShowKey, SourceKey};
use undertow_core::media::{AudioPreference, MediaIdentity, VideoVariant};

use crate::errors::ProviderError;
use crate::providers::SourceProvider;

/// The engine's public entrypoint.
pub struct SourceResolver {
    providers: Vec<Arc<dyn SourceProvider>>,
    cache: Arc<LookupCache>,
}

impl SourceResolver {
    /// Builds a resolver over `providers` (priority order) backed by
    /// `cache`. Resolvers sharing a cache share lookup memory; separate
    /// instances stay isolated.
    pub fn new(providers: Vec<Arc<dyn SourceProvider>>, cache: Arc<LookupCache>) -> Self {
        Self { providers, cache }
    }

    /// The cache backing this resolver.
    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    /// Resolves playable variants for one episode of `media`.
    ///
    /// Returns the first provider's non-empty variant set, or `None` once
    /// every provider has been tried against every candidate title. Never
    /// fails: adapter errors are logged and treated as "no result from
    /// this candidate".
    pub async fn resolve(
        &self,
        media: &MediaIdentity,
        episode: u32,
        audio: AudioPreference,
        match_index: usize,
    ) -> Option<Vec<VideoVariant>> {
        let candidates = media.candidate_titles();
        if candidates.is_empty() {
            tracing::warn!(media = media.id, "media has no usable titles");
            return None;
        }

        for provider in &self.providers {
            for title in &candidates {
                let key = SourceKey {
                    provider: provider.name(),
                    title: title.clone(),
                    episode,
                    audio,
                };

                let outcome = match self.cache.cached_sources(&key).await {
                    Some(cached) => cached,
                    None => match self
                        .attempt(provider.as_ref(), title, media.release_year, episode, audio, match_index)
                        .await
                    {
                        Ok(outcome) => {
                            self.cache.store_sources(key, outcome.clone()).await;
                            outcome
                        }
                        Err(error) => {
                            // Transient: skipped for this attempt, left
                            // uncached so a later resolve can retry.
                            tracing::warn!(
                                provider = provider.name(),
                                %title,
                                episode,
                                %error,
                                "attempt failed, trying next candidate"
                            );
                            None
                        }
                    },
                };

                if let Some(variants) = outcome
                    && !variants.is_empty()
                {
                    tracing::info!(
                        provider = provider.name(),
                        %title,
                        episode,
                        count = variants.len(),
                        "resolved sources"
                    );
                    return Some(variants);
                }
            }
        }

        tracing::info!(media = media.id, episode, "all providers and titles exhausted");
        None
    }

    /// One full provider/title attempt: show id, episode ref, sources,
    /// each step read through and written back to its cache namespace.
    /// `Ok(None)` is a confirmed dead end (cacheable); `Err` aborts the
    /// attempt before anything at the failing step is recorded.
    async fn attempt(
        &self,
        provider: &dyn SourceProvider,
        title: &str,
        release_year: Option<u16>,
        episode: u32,
        audio: AudioPreference,
        match_index: usize,
    ) -> Result<Option<Vec<VideoVariant>>, ProviderError> {
        let show_key = ShowKey {
            provider: provider.name(),
            title: title.to_string(),
            audio,
        };
        let show_id = match self.cache.cached_show_id(&show_key).await {
            Some(cached) => cached,
            None => {
                let lookup = provider
                    .resolve_show_id(title, audio, release_year, match_index)
                    .await?;
                let value = lookup.into_option();
                self.cache.store_show_id(show_key, value.clone()).await;
                value
            }
        };
        let Some(show_id) = show_id else {
            return Ok(None);
        };

        let episode_key = EpisodeKey {
            provider: provider.name(),
            show_id: show_id.clone(),
            episode,
        };
        let episode_ref = match self.cache.cached_episode_ref(&episode_key).await {
            Some(cached) => cached,
            None => {
                let lookup = provider.resolve_episode_ref(&show_id, episode).await?;
                let value = lookup.into_option();
                self.cache.store_episode_ref(episode_key, value.clone()).await;
                value
            }
        };
        let Some(episode_ref) = episode_ref else {
            return Ok(None);
        };

        let variants = provider.fetch_sources(&episode_ref).await?;
        Ok(Some(variants))
    }
}
