//! Gogo source provider.
//!
//! Talks to a Gogo-style REST API: keyword search, show info with the
//! episode listing, and a watch endpoint per server mirror. Dubbed
//! releases are catalogued as separate shows titled `… (Dub)`, so the
//! audio preference is expressed by suffixing the search query and
//! filtering result titles on that convention.

use async_trait::async_trait;
use futures::future;
use serde::Deserialize;
use undertow_core::media::{AudioPreference, EpisodeRef, ShowId, VideoVariant};
use undertow_core::relay::RelayClient;

use super::{Lookup, SourceProvider};
use crate::errors::ProviderError;

/// Server mirrors queried for every episode, in fan-out (not priority)
/// order. The quality ranker imposes order afterwards.
const SERVERS: [&str; 3] = ["gogocdn", "vidstreaming", "streamsb"];

const DUB_SUFFIX: &str = "(Dub)";

/// Gogo-style catalog adapter.
#[derive(Debug)]
pub struct GogoProvider {
    base_url: String,
    relay: RelayClient,
}

/// Response from the search endpoint.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchEntry>,
}

/// Single catalog entry from a search.
#[derive(Debug, Clone, Deserialize)]
struct SearchEntry {
    id: String,
    title: String,
    #[serde(rename = "releaseDate", default)]
    release_date: Option<String>,
}

/// Response from the show-info endpoint.
#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    episodes: Vec<EpisodeEntry>,
}

/// One episode in a show's listing. Upstream sends the number as an
/// integer for regular episodes and a string for specials ("7.5").
#[derive(Debug, Deserialize)]
struct EpisodeEntry {
    id: String,
    number: serde_json::Value,
}

/// Response from the watch endpoint of one server mirror.
#[derive(Debug, Deserialize)]
struct WatchResponse {
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    url: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(rename = "isM3U8", default)]
    is_m3u8: bool,
}

impl GogoProvider {
    /// Creates the adapter against `base_url`, calling through `relay`.
    pub fn new(base_url: String, relay: RelayClient) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            relay,
        }
    }

    /// Search query for `title` under the audio convention.
    fn search_query(title: &str, audio: AudioPreference) -> String {
        if audio.is_dub() {
            format!("{title} (dub)")
        } else {
            title.to_string()
        }
    }

    /// Whether a catalog title matches the requested audio convention.
    fn matches_audio(catalog_title: &str, audio: AudioPreference) -> bool {
        let is_dub_entry = catalog_title.trim_end().ends_with(DUB_SUFFIX);
        is_dub_entry == audio.is_dub()
    }

    /// Catalog title with the dub marker removed, for exact comparison
    /// against the search candidate.
    fn strip_dub_suffix(catalog_title: &str) -> &str {
        catalog_title
            .trim_end()
            .trim_end_matches(DUB_SUFFIX)
            .trim_end()
    }

    /// Release year of a catalog entry, when the upstream sent one.
    fn entry_year(entry: &SearchEntry) -> Option<u16> {
        entry
            .release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
    }

    /// Applies the audio filter, then the exact-title-or-year filter, and
    /// picks the `match_index`-th survivor.
    fn select_match(
        entries: Vec<SearchEntry>,
        title: &str,
        audio: AudioPreference,
        release_year: Option<u16>,
        match_index: usize,
    ) -> Option<SearchEntry> {
        entries
            .into_iter()
            .filter(|entry| Self::matches_audio(&entry.title, audio))
            .filter(|entry| {
                Self::strip_dub_suffix(&entry.title) == title
                    || (release_year.is_some() && Self::entry_year(entry) == release_year)
            })
            .nth(match_index)
    }

    /// Episode number as sent by the upstream, if it is a whole number.
    /// Specials ("7.5") never match a requested integer episode.
    fn episode_number(raw: &serde_json::Value) -> Option<u32> {
        match raw {
            serde_json::Value::Number(number) => number.as_u64().and_then(|n| n.try_into().ok()),
            serde_json::Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    async fn fetch_server(
        &self,
        episode: &EpisodeRef,
        server: &str,
    ) -> Result<Vec<VideoVariant>, ProviderError> {
        let url = format!(
            "{}/watch/{}?server={}",
            self.base_url,
            episode.id,
            urlencoding::encode(server)
        );
        let payload = self.relay.get_json(&url).await?;
        let watch: WatchResponse = serde_json::from_value(payload).map_err(|e| {
            ProviderError::Payload {
                reason: format!("watch response: {e}"),
            }
        })?;

        Ok(watch
            .sources
            .into_iter()
            .map(|source| VideoVariant {
                url: source.url,
                is_segmented: source.is_m3u8,
                quality: source.quality.unwrap_or_else(|| "default".to_string()),
                subtitles: Vec::new(),
                skip_markers: None,
            })
            .collect())
    }
}

#[async_trait]
impl SourceProvider for GogoProvider {
    fn name(&self) -> &'static str {
        "gogo"
    }

    async fn resolve_show_id(
        &self,
        title: &str,
        audio: AudioPreference,
        release_year: Option<u16>,
        match_index: usize,
    ) -> Result<Lookup<ShowId>, ProviderError> {
        let query = Self::search_query(title, audio);
        let url = format!(
            "{}/search?keyword={}",
            self.base_url,
            urlencoding::encode(&query)
        );

        let payload = match self.relay.get_json(&url).await {
            Ok(payload) => payload,
            Err(e) if e.is_not_found() => return Ok(Lookup::NotFound),
            Err(e) => return Err(e.into()),
        };
        let search: SearchResponse =
            serde_json::from_value(payload).map_err(|e| ProviderError::Payload {
                reason: format!("search response: {e}"),
            })?;

        match Self::select_match(search.results, title, audio, release_year, match_index) {
            Some(entry) => {
                tracing::debug!(show = %entry.id, %title, "gogo search matched");
                Ok(Lookup::Found(ShowId::new(entry.id, audio)))
            }
            None => Ok(Lookup::NotFound),
        }
    }

    async fn resolve_episode_ref(
        &self,
        show_id: &ShowId,
        episode: u32,
    ) -> Result<Lookup<EpisodeRef>, ProviderError> {
        let url = format!("{}/info/{}", self.base_url, show_id.id);

        let payload = match self.relay.get_json(&url).await {
            Ok(payload) => payload,
            Err(e) if e.is_not_found() => return Ok(Lookup::NotFound),
            Err(e) => return Err(e.into()),
        };
        let info: InfoResponse =
            serde_json::from_value(payload).map_err(|e| ProviderError::Payload {
                reason: format!("info response: {e}"),
            })?;

        let matched = info
            .episodes
            .into_iter()
            .find(|entry| Self::episode_number(&entry.number) == Some(episode));

        match matched {
            Some(entry) => Ok(Lookup::Found(EpisodeRef {
                id: entry.id,
                episode,
                audio: show_id.audio,
            })),
            None => Ok(Lookup::NotFound),
        }
    }

    async fn fetch_sources(
        &self,
        episode: &EpisodeRef,
    ) -> Result<Vec<VideoVariant>, ProviderError> {
        let fetches = SERVERS
            .iter()
            .map(|server| self.fetch_server(episode, server));
        let results = future::join_all(fetches).await;

        let mut variants = Vec::new();
        for (server, result) in SERVERS.iter().zip(results) {
            match result {
                Ok(mut batch) => variants.append(&mut batch),
                Err(error) => {
                    tracing::warn!(server, %error, "gogo mirror fetch failed");
                }
            }
        }
        Ok(variants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, title: &str, release_date: Option<&str>) -> SearchEntry {
        SearchEntry {
            id: id.to_string(),
            title: title.to_string(),
            release_date: release_date.map(String::from),
        }
    }

    #[test]
    fn search_query_suffixes_dub() {
        assert_eq!(
            GogoProvider::search_query("Naruto", AudioPreference::Dub),
            "Naruto (dub)"
        );
        assert_eq!(
            GogoProvider::search_query("Naruto", AudioPreference::Sub),
            "Naruto"
        );
    }

    #[test]
    fn audio_filter_follows_naming_convention() {
        assert!(GogoProvider::matches_audio("Naruto (Dub)", AudioPreference::Dub));
        assert!(!GogoProvider::matches_audio("Naruto", AudioPreference::Dub));
        assert!(GogoProvider::matches_audio("Naruto", AudioPreference::Sub));
        assert!(!GogoProvider::matches_audio("Naruto (Dub)", AudioPreference::Sub));
    }

    #[test]
    fn select_match_prefers_exact_title() {
        let entries = vec![
            entry("naruto-shippuden", "Naruto: Shippuden", Some("2007-02-15")),
            entry("naruto", "Naruto", Some("2002-10-03")),
        ];
        let selected =
            GogoProvider::select_match(entries, "Naruto", AudioPreference::Sub, None, 0).unwrap();
        assert_eq!(selected.id, "naruto");
    }

    #[test]
    fn select_match_accepts_year_for_renamed_entries() {
        // Upstream renamed the entry; the release year still identifies it.
        let entries = vec![entry("hagane-fa", "Hagane no Renkinjutsushi: FA", Some("2009-04-05"))];
        let selected = GogoProvider::select_match(
            entries,
            "Fullmetal Alchemist: Brotherhood",
            AudioPreference::Sub,
            Some(2009),
            0,
        )
        .unwrap();
        assert_eq!(selected.id, "hagane-fa");
    }

    #[test]
    fn select_match_respects_match_index() {
        let entries = vec![
            entry("saga-1", "Saga", None),
            entry("saga-2", "Saga", None),
        ];
        let selected =
            GogoProvider::select_match(entries.clone(), "Saga", AudioPreference::Sub, None, 1)
                .unwrap();
        assert_eq!(selected.id, "saga-2");

        // Index past the surviving list is a confirmed miss.
        assert!(GogoProvider::select_match(entries, "Saga", AudioPreference::Sub, None, 2).is_none());
    }

    #[test]
    fn select_match_filters_dub_entries_for_sub_request() {
        let entries = vec![
            entry("bleach-dub", "Bleach (Dub)", None),
            entry("bleach", "Bleach", None),
        ];
        let selected =
            GogoProvider::select_match(entries, "Bleach", AudioPreference::Sub, None, 0).unwrap();
        assert_eq!(selected.id, "bleach");
    }

    #[test]
    fn dub_entries_compare_on_stripped_title() {
        let entries = vec![entry("bleach-dub", "Bleach (Dub)", None)];
        let selected =
            GogoProvider::select_match(entries, "Bleach", AudioPreference::Dub, None, 0).unwrap();
        assert_eq!(selected.id, "bleach-dub");
    }

    #[test]
    fn episode_numbers_parse_from_int_and_string() {
        assert_eq!(
            GogoProvider::episode_number(&serde_json::json!(12)),
            Some(12)
        );
        assert_eq!(
            GogoProvider::episode_number(&serde_json::json!("7")),
            Some(7)
        );
        // Specials never match an integer request.
        assert_eq!(GogoProvider::episode_number(&serde_json::json!("7.5")), None);
        assert_eq!(GogoProvider::episode_number(&serde_json::json!(null)), None);
    }

    #[test]
    fn watch_payload_maps_to_variants() {
        let payload = serde_json::json!({
            "sources": [
                { "url": "https://cdn.example/ep1.m3u8", "quality": "1080p", "isM3U8": true },
                { "url": "https://cdn.example/ep1.mp4" }
            ]
        });
        let watch: WatchResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(watch.sources.len(), 2);
        assert_eq!(watch.sources[0].quality.as_deref(), Some("1080p"));
        assert!(watch.sources[0].is_m3u8);
        assert!(watch.sources[1].quality.is_none());
        assert!(!watch.sources[1].is_m3u8);
    }
}
