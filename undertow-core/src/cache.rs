//! Tri-state memoization cache for provider lookups
//!
//! Remembers the outcome of every expensive upstream lookup for the
//! lifetime of the process: show-id searches, episode listings and final
//! source lists each get their own namespace. Every slot distinguishes
//! "never looked up" from "looked up, confirmed absent" from "looked up,
//! value present", so a confirmed miss is never retried in-session while
//! an unattempted lookup still runs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::media::{AudioPreference, EpisodeRef, ShowId, VideoVariant};

/// Key for a cached final source list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub provider: &'static str,
    pub title: String,
    pub episode: u32,
    pub audio: AudioPreference,
}

/// Key for a cached title-to-show-id lookup.
///
/// Includes the audio preference because providers catalog sub and dub
/// releases as distinct shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShowKey {
    pub provider: &'static str,
    pub title: String,
    pub audio: AudioPreference,
}

/// Key for a cached episode-listing lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeKey {
    pub provider: &'static str,
    pub show_id: ShowId,
    pub episode: u32,
}

/// One cache namespace: a write-once memo from key to optional value.
///
/// `None` values are explicit negative results. The first write for a key
/// wins; a conflicting later write is dropped so a resolved outcome is
/// never silently replaced within the process lifetime.
struct Namespace<K, V> {
    entries: RwLock<HashMap<K, Option<V>>>,
}

impl<K, V> Namespace<K, V>
where
    K: Eq + Hash + Debug,
    V: Clone,
{
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Outer `None` means the key was never looked up; inner `None` means
    /// the lookup completed and found nothing.
    async fn get(&self, key: &K) -> Option<Option<V>> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: K, value: Option<V>) {
        let mut entries = self.entries.write().await;
        match entries.entry(key) {
            Entry::Occupied(existing) => {
                tracing::debug!(key = ?existing.key(), "keeping existing cache entry");
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Cache usage counters for monitoring.
#[derive(Debug, Clone)]
pub struct CacheStatistics {
    pub entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}

impl CacheStatistics {
    /// Fraction of lookups answered from the cache.
    pub fn calculate_hit_rate(hit_count: u64, miss_count: u64) -> f64 {
        if hit_count + miss_count == 0 {
            0.0
        } else {
            (hit_count as f64) / ((hit_count + miss_count) as f64)
        }
    }
}

/// Process-lifetime lookup cache backing every provider adapter.
///
/// Safe for concurrent resolutions (e.g. prefetching adjacent episodes);
/// all namespaces sit behind async RwLocks. No eviction: the set of shows
/// touched in one session is small and a remembered failure is exactly
/// what prevents hammering an upstream that already said 404.
pub struct LookupCache {
    sources: Namespace<SourceKey, Vec<VideoVariant>>,
    show_ids: Namespace<ShowKey, ShowId>,
    episode_refs: Namespace<EpisodeKey, EpisodeRef>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl LookupCache {
    pub fn new() -> Self {
        Self {
            sources: Namespace::new(),
            show_ids: Namespace::new(),
            episode_refs: Namespace::new(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Cached source list for `key`, tri-state.
    pub async fn cached_sources(&self, key: &SourceKey) -> Option<Option<Vec<VideoVariant>>> {
        let entry = self.sources.get(key).await;
        self.record(entry.is_some());
        if entry.is_some() {
            tracing::debug!(?key, "source cache hit");
        } else {
            tracing::debug!(?key, "source cache miss");
        }
        entry
    }

    /// Remembers the final outcome of a completed source fetch.
    /// `None` records a confirmed "no sources for this combination".
    pub async fn store_sources(&self, key: SourceKey, value: Option<Vec<VideoVariant>>) {
        self.sources.set(key, value).await;
    }

    /// Cached show-id lookup for `key`, tri-state.
    pub async fn cached_show_id(&self, key: &ShowKey) -> Option<Option<ShowId>> {
        let entry = self.show_ids.get(key).await;
        self.record(entry.is_some());
        if entry.is_some() {
            tracing::debug!(?key, "show-id cache hit");
        } else {
            tracing::debug!(?key, "show-id cache miss");
        }
        entry
    }

    /// Remembers a completed show-id search, including confirmed absence.
    pub async fn store_show_id(&self, key: ShowKey, value: Option<ShowId>) {
        self.show_ids.set(key, value).await;
    }

    /// Cached episode-listing lookup for `key`, tri-state.
    pub async fn cached_episode_ref(&self, key: &EpisodeKey) -> Option<Option<EpisodeRef>> {
        let entry = self.episode_refs.get(key).await;
        self.record(entry.is_some());
        if entry.is_some() {
            tracing::debug!(?key, "episode cache hit");
        } else {
            tracing::debug!(?key, "episode cache miss");
        }
        entry
    }

    /// Remembers a completed episode lookup, including confirmed absence.
    pub async fn store_episode_ref(&self, key: EpisodeKey, value: Option<EpisodeRef>) {
        self.episode_refs.set(key, value).await;
    }

    pub async fn statistics(&self) -> CacheStatistics {
        let entries = self.sources.len().await + self.show_ids.len().await
            + self.episode_refs.len().await;
        let hit_count = self.hit_count.load(Ordering::Relaxed);
        let miss_count = self.miss_count.load(Ordering::Relaxed);

        CacheStatistics {
            entries,
            hit_count,
            miss_count,
            hit_rate: CacheStatistics::calculate_hit_rate(hit_count, miss_count),
        }
    }
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show_key(title: &str) -> ShowKey {
        ShowKey {
            provider: "test",
            title: title.to_string(),
            audio: AudioPreference::Sub,
        }
    }

    #[tokio::test]
    async fn unset_null_and_value_are_distinct() {
        let cache = LookupCache::new();
        let missing = show_key("never-looked-up");
        let absent = show_key("confirmed-absent");
        let present = show_key("present");

        assert_eq!(cache.cached_show_id(&missing).await, None);

        cache.store_show_id(absent.clone(), None).await;
        assert_eq!(cache.cached_show_id(&absent).await, Some(None));

        let id = ShowId::new("show-1", AudioPreference::Sub);
        cache.store_show_id(present.clone(), Some(id.clone())).await;
        assert_eq!(cache.cached_show_id(&present).await, Some(Some(id)));
    }

    #[tokio::test]
    async fn first_write_wins() {
        let cache = LookupCache::new();
        let key = show_key("monster");

        cache.store_show_id(key.clone(), None).await;
        cache
            .store_show_id(key.clone(), Some(ShowId::new("late", AudioPreference::Sub)))
            .await;

        // The resolved negative outcome is kept.
        assert_eq!(cache.cached_show_id(&key).await, Some(None));
    }

    #[tokio::test]
    async fn namespaces_are_independent() {
        let cache = LookupCache::new();
        let show_id = ShowId::new("show-1", AudioPreference::Dub);

        cache
            .store_show_id(
                ShowKey {
                    provider: "test",
                    title: "Trigun".to_string(),
                    audio: AudioPreference::Dub,
                },
                Some(show_id.clone()),
            )
            .await;

        let episode_key = EpisodeKey {
            provider: "test",
            show_id,
            episode: 1,
        };
        assert_eq!(cache.cached_episode_ref(&episode_key).await, None);

        let source_key = SourceKey {
            provider: "test",
            title: "Trigun".to_string(),
            episode: 1,
            audio: AudioPreference::Dub,
        };
        assert_eq!(cache.cached_sources(&source_key).await, None);
    }

    #[tokio::test]
    async fn statistics_track_hits_and_misses() {
        let cache = LookupCache::new();
        let key = show_key("hit-me");

        cache.cached_show_id(&key).await; // miss
        cache.store_show_id(key.clone(), None).await;
        cache.cached_show_id(&key).await; // hit

        let stats = cache.statistics().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn hit_rate_with_no_lookups_is_zero() {
        assert_eq!(CacheStatistics::calculate_hit_rate(0, 0), 0.0);
        assert_eq!(CacheStatistics::calculate_hit_rate(3, 1), 0.75);
    }

    #[tokio::test]
    async fn sources_namespace_stores_full_variant_lists() {
        let cache = LookupCache::new();
        let key = SourceKey {
            provider: "test",
            title: "Hellsing".to_string(),
            episode: 3,
            audio: AudioPreference::Sub,
        };
        let variants = vec![VideoVariant {
            url: "https://cdn.example/ep3.m3u8".to_string(),
            is_segmented: true,
            quality: "1080p".to_string(),
            subtitles: Vec::new(),
            skip_markers: None,
        }];

        cache.store_sources(key.clone(), Some(variants.clone())).await;
        let cached = cache.cached_sources(&key).await.flatten().unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].url, variants[0].url);
    }
}
