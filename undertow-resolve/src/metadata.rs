//! AniList metadata client.
//!
//! Read-only lookup against the AniList GraphQL catalog, turning a
//! numeric media id into the titles and synonyms the resolver searches
//! with. The catalog is a trusted collaborator and is not routed through
//! the relay.

use serde_json::{Value, json};
use undertow_core::config::MetadataConfig;
use undertow_core::media::{MediaIdentity, MediaTitles};

use crate::errors::MetadataError;

const MEDIA_QUERY: &str = "query ($id: Int) { Media(id: $id, type: ANIME) { id title { english romaji native } synonyms seasonYear } }";

/// AniList catalog client.
#[derive(Debug, Clone)]
pub struct AniListClient {
    client: reqwest::Client,
    graphql_url: String,
}

impl AniListClient {
    /// Creates a client for the configured GraphQL endpoint.
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            graphql_url: config.graphql_url.clone(),
        }
    }

    /// Fetches the identity of the media with the given catalog id.
    ///
    /// # Errors
    /// - `MetadataError::FetchFailed` - transport, status or payload failure
    /// - `MetadataError::NotFound` - the catalog has no such id
    pub async fn fetch_media(&self, id: u32) -> Result<MediaIdentity, MetadataError> {
        let body = json!({
            "query": MEDIA_QUERY,
            "variables": { "id": id },
        });

        let response = self
            .client
            .post(&self.graphql_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MetadataError::FetchFailed {
                reason: format!("request failed: {e}"),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound { id });
        }
        if !response.status().is_success() {
            return Err(MetadataError::FetchFailed {
                reason: format!("catalog returned HTTP {}", response.status()),
            });
        }

        let payload: Value = response.json().await.map_err(|e| MetadataError::FetchFailed {
            reason: format!("payload decode failed: {e}"),
        })?;

        Self::parse_media(id, &payload)
    }

    /// Extracts a `MediaIdentity` from the GraphQL response envelope.
    fn parse_media(id: u32, payload: &Value) -> Result<MediaIdentity, MetadataError> {
        // AniList reports unknown ids via the errors array, with data.Media null.
        let media = match payload.pointer("/data/Media") {
            Some(media) if !media.is_null() => media,
            _ => return Err(MetadataError::NotFound { id }),
        };

        let title_field = |name: &str| {
            media
                .pointer(&format!("/title/{name}"))
                .and_then(Value::as_str)
                .map(String::from)
        };

        let synonyms = media
            .get("synonyms")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(MediaIdentity {
            id,
            titles: MediaTitles {
                english: title_field("english"),
                romaji: title_field("romaji"),
                native: title_field("native"),
            },
            synonyms,
            release_year: media
                .get("seasonYear")
                .and_then(Value::as_u64)
                .and_then(|year| year.try_into().ok()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_media_extracts_titles_and_synonyms() {
        let payload = serde_json::json!({
            "data": {
                "Media": {
                    "id": 21,
                    "title": {
                        "english": "One Piece",
                        "romaji": "One Piece",
                        "native": "ワンピース"
                    },
                    "synonyms": ["OP"],
                    "seasonYear": 1999
                }
            }
        });

        let media = AniListClient::parse_media(21, &payload).unwrap();
        assert_eq!(media.id, 21);
        assert_eq!(media.titles.english.as_deref(), Some("One Piece"));
        assert_eq!(media.titles.native.as_deref(), Some("ワンピース"));
        assert_eq!(media.synonyms, vec!["OP"]);
        assert_eq!(media.release_year, Some(1999));

        // Candidate derivation drops the romaji duplicate of the english title.
        assert_eq!(media.candidate_titles(), vec!["One Piece", "ワンピース", "OP"]);
    }

    #[test]
    fn parse_media_null_entry_is_not_found() {
        let payload = serde_json::json!({
            "data": { "Media": null },
            "errors": [{ "message": "Not Found.", "status": 404 }]
        });

        let error = AniListClient::parse_media(999, &payload).unwrap_err();
        assert!(matches!(error, MetadataError::NotFound { id: 999 }));
    }

    #[test]
    fn parse_media_tolerates_missing_optional_fields() {
        let payload = serde_json::json!({
            "data": {
                "Media": {
                    "id": 7,
                    "title": { "romaji": "Serial Experiments Lain" }
                }
            }
        });

        let media = AniListClient::parse_media(7, &payload).unwrap();
        assert!(media.titles.english.is_none());
        assert_eq!(
            media.titles.romaji.as_deref(),
            Some("Serial Experiments Lain")
        );
        assert!(media.synonyms.is_empty());
        assert!(media.release_year.is_none());
    }
}
