//! AllAnime source provider.
//!
//! Talks to the AllAnime GraphQL API: a `shows` search scoped by
//! translation type, a show query carrying the available episode list,
//! and an `episode` query that returns one descriptor per server mirror.
//! Each mirror's stream-detail endpoint is then fetched concurrently for
//! the actual links, which may carry subtitle tracks and intro/outro
//! skip markers.

use async_trait::async_trait;
use futures::future;
use serde::Deserialize;
use serde_json::json;
use undertow_core::media::{
    AudioPreference, EpisodeRef, ShowId, SkipMarkers, SubtitleTrack, VideoVariant,
};
use undertow_core::relay::RelayClient;

use super::{Lookup, SourceProvider};
use crate::errors::ProviderError;

// "Vaild" is the upstream schema's own spelling.
const SEARCH_QUERY: &str = "query ($search: SearchInput, $translationType: VaildTranslationTypeEnumType) { shows(search: $search, limit: 26, page: 1, translationType: $translationType) { edges { _id name englishName airedStart { year } } } }";

const SHOW_QUERY: &str =
    "query ($showId: String!) { show(_id: $showId) { _id availableEpisodesDetail } }";

const EPISODE_QUERY: &str = "query ($showId: String!, $translationType: VaildTranslationTypeEnumType!, $episodeString: String!) { episode(showId: $showId, translationType: $translationType, episodeString: $episodeString) { episodeString sourceUrls } }";

/// AllAnime GraphQL adapter.
#[derive(Debug)]
pub struct AllAnimeProvider {
    api_url: String,
    referer: String,
    relay: RelayClient,
}

/// One show edge from the search query.
#[derive(Debug, Clone, Deserialize)]
struct ShowEdge {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(rename = "englishName", default)]
    english_name: Option<String>,
    #[serde(rename = "airedStart", default)]
    aired_start: Option<AiredStart>,
}

#[derive(Debug, Clone, Deserialize)]
struct AiredStart {
    #[serde(default)]
    year: Option<u16>,
}

/// One mirror descriptor from the episode query.
#[derive(Debug, Deserialize)]
struct SourceUrlEntry {
    #[serde(rename = "sourceUrl")]
    source_url: String,
    #[serde(rename = "sourceName", default)]
    source_name: String,
}

/// Stream links behind one mirror's detail endpoint.
#[derive(Debug, Deserialize)]
struct LinksResponse {
    #[serde(default)]
    links: Vec<LinkEntry>,
}

#[derive(Debug, Deserialize)]
struct LinkEntry {
    link: String,
    #[serde(default)]
    hls: bool,
    #[serde(rename = "resolutionStr", default)]
    resolution: Option<String>,
    #[serde(default)]
    subtitles: Vec<SubtitleEntry>,
    #[serde(rename = "skipTimes", default)]
    skip_times: Option<SkipTimesEntry>,
}

#[derive(Debug, Deserialize)]
struct SubtitleEntry {
    src: String,
    lang: String,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SkipTimesEntry {
    #[serde(default)]
    intro: Option<TimeSpan>,
    #[serde(default)]
    outro: Option<TimeSpan>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct TimeSpan {
    start: u32,
    end: u32,
}

impl AllAnimeProvider {
    /// Creates the adapter against the GraphQL endpoint, calling through
    /// `relay` with the referer the API requires.
    pub fn new(api_url: String, referer: String, relay: RelayClient) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            referer,
            relay,
        }
    }

    /// Origin the mirror detail paths are resolved against.
    fn api_origin(&self) -> &str {
        self.api_url.trim_end_matches("/api")
    }

    fn translation_type(audio: AudioPreference) -> &'static str {
        if audio.is_dub() { "dub" } else { "sub" }
    }

    async fn graphql(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let body = json!({ "query": query, "variables": variables });
        let payload = self
            .relay
            .post_json(&self.api_url, &body)
            .await
            .map_err(ProviderError::from)?;

        if let Some(errors) = payload.get("errors").and_then(|e| e.as_array())
            && !errors.is_empty()
        {
            return Err(ProviderError::Payload {
                reason: format!("graphql error: {}", errors[0]),
            });
        }
        payload
            .get("data")
            .cloned()
            .ok_or_else(|| ProviderError::Payload {
                reason: "graphql response without data".to_string(),
            })
    }

    /// Applies the exact-title-or-year filter and picks the
    /// `match_index`-th survivor. The translation-type parameter already
    /// scoped the search to the requested audio.
    fn select_show(
        edges: Vec<ShowEdge>,
        title: &str,
        release_year: Option<u16>,
        match_index: usize,
    ) -> Option<ShowEdge> {
        edges
            .into_iter()
            .filter(|edge| {
                edge.name == title
                    || edge.english_name.as_deref() == Some(title)
                    || (release_year.is_some()
                        && edge.aired_start.as_ref().and_then(|a| a.year) == release_year)
            })
            .nth(match_index)
    }

    /// True when `episode` appears in the show's available episode list
    /// for the given translation.
    fn has_episode(detail: &serde_json::Value, audio: AudioPreference, episode: u32) -> bool {
        let wanted = episode.to_string();
        detail
            .get(Self::translation_type(audio))
            .and_then(|list| list.as_array())
            .is_some_and(|list| {
                list.iter()
                    .filter_map(|value| value.as_str())
                    .any(|value| value == wanted)
            })
    }

    fn variant_from_link(link: LinkEntry, source_name: &str) -> VideoVariant {
        let subtitles = link
            .subtitles
            .into_iter()
            .map(|track| SubtitleTrack {
                url: track.src,
                language: track.lang,
                label: track.label,
            })
            .collect();

        // Both boundaries are needed for the player's skip buttons.
        let skip_markers = link.skip_times.and_then(|times| {
            let intro = times.intro?;
            let outro = times.outro?;
            Some(SkipMarkers {
                intro_start: intro.start,
                intro_end: intro.end,
                outro_start: outro.start,
                outro_end: outro.end,
            })
        });

        tracing::trace!(mirror = source_name, url = %link.link, "collected link");
        VideoVariant {
            url: link.link,
            is_segmented: link.hls,
            quality: link
                .resolution
                .unwrap_or_else(|| "default".to_string()),
            subtitles,
            skip_markers,
        }
    }

    async fn fetch_mirror(
        &self,
        entry: &SourceUrlEntry,
    ) -> Result<Vec<VideoVariant>, ProviderError> {
        let url = format!("{}{}", self.api_origin(), entry.source_url);
        let payload = self.relay.get_json_with_referer(&url, &self.referer).await?;
        let links: LinksResponse =
            serde_json::from_value(payload).map_err(|e| ProviderError::Payload {
                reason: format!("mirror links: {e}"),
            })?;

        Ok(links
            .links
            .into_iter()
            .map(|link| Self::variant_from_link(link, &entry.source_name))
            .collect())
    }
}

#[async_trait]
impl SourceProvider for AllAnimeProvider {
    fn name(&self) -> &'static str {
        "allanime"
    }

    async fn resolve_show_id(
        &self,
        title: &str,
        audio: AudioPreference,
        release_year: Option<u16>,
        match_index: usize,
    ) -> Result<Lookup<ShowId>, ProviderError> {
        let variables = json!({
            "search": { "query": title },
            "translationType": Self::translation_type(audio),
        });
        let data = self.graphql(SEARCH_QUERY, variables).await?;

        let edges: Vec<ShowEdge> = serde_json::from_value(
            data.pointer("/shows/edges")
                .cloned()
                .unwrap_or_else(|| json!([])),
        )
        .map_err(|e| ProviderError::Payload {
            reason: format!("search edges: {e}"),
        })?;

        match AllAnimeProvider::select_show(edges, title, release_year, match_index) {
            Some(edge) => {
                tracing::debug!(show = %edge.id, %title, "allanime search matched");
                Ok(Lookup::Found(ShowId::new(edge.id, audio)))
            }
            None => Ok(Lookup::NotFound),
        }
    }

    async fn resolve_episode_ref(
        &self,
        show_id: &ShowId,
        episode: u32,
    ) -> Result<Lookup<EpisodeRef>, ProviderError> {
        let variables = json!({ "showId": show_id.id });
        let data = self.graphql(SHOW_QUERY, variables).await?;

        let Some(detail) = data.pointer("/show/availableEpisodesDetail") else {
            return Ok(Lookup::NotFound);
        };

        if Self::has_episode(detail, show_id.audio, episode) {
            Ok(Lookup::Found(EpisodeRef {
                id: show_id.id.clone(),
                episode,
                audio: show_id.audio,
            }))
        } else {
            Ok(Lookup::NotFound)
        }
    }

    async fn fetch_sources(
        &self,
        episode: &EpisodeRef,
    ) -> Result<Vec<VideoVariant>, ProviderError> {
        let variables = json!({
            "showId": episode.id,
            "translationType": Self::translation_type(episode.audio),
            "episodeString": episode.episode.to_string(),
        });
        let data = self.graphql(EPISODE_QUERY, variables).await?;

        let entries: Vec<SourceUrlEntry> = serde_json::from_value(
            data.pointer("/episode/sourceUrls")
                .cloned()
                .unwrap_or_else(|| json!([])),
        )
        .map_err(|e| ProviderError::Payload {
            reason: format!("source urls: {e}"),
        })?;

        // Only API-relative descriptors resolve to link lists; absolute
        // URLs are third-party embeds the player cannot use directly.
        let mirrors: Vec<SourceUrlEntry> = entries
            .into_iter()
            .filter(|entry| entry.source_url.starts_with('/'))
            .collect();

        let fetches = mirrors.iter().map(|entry| self.fetch_mirror(entry));
        let results = future::join_all(fetches).await;

        let mut variants = Vec::new();
        for (entry, result) in mirrors.iter().zip(results) {
            match result {
                Ok(mut batch) => variants.append(&mut batch),
                Err(error) => {
                    tracing::warn!(mirror = %entry.source_name, %error, "allanime mirror fetch failed");
                }
            }
        }
        Ok(variants)
    }
}
