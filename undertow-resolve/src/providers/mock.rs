//! Scriptable mock provider for orchestrator tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use undertow_core::media::{AudioPreference, EpisodeRef, ShowId, VideoVariant};

use super::{Lookup, SourceProvider};
use crate::errors::ProviderError;

/// Mock provider with canned lookups and call accounting.
///
/// Every operation records its invocation so tests can assert call
/// ordering, short-circuiting and cache idempotence. `fail_next` makes
/// the next N operations fail transiently before the canned data starts
/// answering again.
#[derive(Debug, Default)]
pub struct MockProvider {
    name: &'static str,
    shows: HashMap<String, String>,
    episodes: HashMap<(String, u32), String>,
    sources: HashMap<String, Vec<VideoVariant>>,
    fail_next: AtomicUsize,
    search_calls: AtomicUsize,
    episode_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    search_log: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Registers a searchable show under `title`.
    pub fn with_show(mut self, title: &str, show_id: &str) -> Self {
        self.shows.insert(title.to_string(), show_id.to_string());
        self
    }

    /// Registers an episode ref for `(show_id, episode)`.
    pub fn with_episode(mut self, show_id: &str, episode: u32, ref_id: &str) -> Self {
        self.episodes
            .insert((show_id.to_string(), episode), ref_id.to_string());
        self
    }

    /// Registers the variants returned for `ref_id`.
    pub fn with_sources(mut self, ref_id: &str, variants: Vec<VideoVariant>) -> Self {
        self.sources.insert(ref_id.to_string(), variants);
        self
    }

    /// Makes the next `count` operations fail with a network error.
    pub fn fail_next(self, count: usize) -> Self {
        self.fail_next.store(count, Ordering::SeqCst);
        self
    }

    /// Number of `resolve_show_id` invocations so far.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of `resolve_episode_ref` invocations so far.
    pub fn episode_calls(&self) -> usize {
        self.episode_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_sources` invocations so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Total operations across all three capabilities.
    pub fn total_calls(&self) -> usize {
        self.search_calls() + self.episode_calls() + self.fetch_calls()
    }

    /// Titles passed to `resolve_show_id`, in call order.
    pub fn searched_titles(&self) -> Vec<String> {
        self.search_log.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), ProviderError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::Network {
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SourceProvider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn resolve_show_id(
        &self,
        title: &str,
        audio: AudioPreference,
        _release_year: Option<u16>,
        _match_index: usize,
    ) -> Result<Lookup<ShowId>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_log.lock().unwrap().push(title.to_string());
        self.check_failure()?;

        Ok(match self.shows.get(title) {
            Some(id) => Lookup::Found(ShowId::new(id.clone(), audio)),
            None => Lookup::NotFound,
        })
    }

    async fn resolve_episode_ref(
        &self,
        show_id: &ShowId,
        episode: u32,
    ) -> Result<Lookup<EpisodeRef>, ProviderError> {
        self.episode_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        Ok(match self.episodes.get(&(show_id.id.clone(), episode)) {
            Some(ref_id) => Lookup::Found(EpisodeRef {
                id: ref_id.clone(),
                episode,
                audio: show_id.audio,
            }),
            None => Lookup::NotFound,
        })
    }

    async fn fetch_sources(
        &self,
        episode: &EpisodeRef,
    ) -> Result<Vec<VideoVariant>, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        Ok(self.sources.get(&episode.id).cloned().unwrap_or_default())
    }
}
