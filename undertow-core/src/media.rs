//! Catalog domain types shared across the resolution engine.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one anime as known to the metadata catalog.
///
/// Owned by the metadata collaborator; the engine only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaIdentity {
    /// Numeric catalog id (AniList media id)
    pub id: u32,
    /// Localized official titles
    pub titles: MediaTitles,
    /// Alternate titles known for this entry
    pub synonyms: Vec<String>,
    /// First release year, when the catalog knows it
    pub release_year: Option<u16>,
}

/// Official localized titles of a media entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaTitles {
    pub english: Option<String>,
    pub romaji: Option<String>,
    pub native: Option<String>,
}

impl MediaIdentity {
    /// Derives the ordered set of search candidates for this media.
    ///
    /// English, romaji and native titles come first in that fixed order,
    /// followed by synonyms. Entries are trimmed, empty strings dropped,
    /// and duplicates removed keeping the first occurrence. Matching is
    /// case-sensitive: differently cased near-duplicates are kept as
    /// independent candidates and tried separately.
    ///
    /// Never fails; an entry with no usable titles yields an empty vector,
    /// which callers must treat as "no resolution possible".
    pub fn candidate_titles(&self) -> Vec<String> {
        let official = [
            self.titles.english.as_deref(),
            self.titles.romaji.as_deref(),
            self.titles.native.as_deref(),
        ];

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for title in official
            .into_iter()
            .flatten()
            .chain(self.synonyms.iter().map(String::as_str))
        {
            let trimmed = title.trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_string()) {
                candidates.push(trimmed.to_string());
            }
        }
        candidates
    }
}

/// Audio track preference used when searching a provider's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioPreference {
    /// Original audio with subtitles
    Sub,
    /// Dubbed audio
    Dub,
}

impl AudioPreference {
    /// Maps the caller-facing dub flag onto a preference.
    pub fn from_dub_flag(dub: bool) -> Self {
        if dub { Self::Dub } else { Self::Sub }
    }

    pub fn is_dub(self) -> bool {
        matches!(self, Self::Dub)
    }
}

impl fmt::Display for AudioPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sub => write!(f, "sub"),
            Self::Dub => write!(f, "dub"),
        }
    }
}

/// Opaque show identifier scoped to one provider's catalog.
///
/// Carries the audio preference it was resolved under, because providers
/// catalog sub and dub under distinct entries and later episode and
/// source lookups must stay on the same translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShowId {
    pub id: String,
    pub audio: AudioPreference,
}

impl ShowId {
    pub fn new(id: impl Into<String>, audio: AudioPreference) -> Self {
        Self {
            id: id.into(),
            audio,
        }
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.audio)
    }
}

/// Opaque reference to one episode within a provider's catalog.
///
/// `id` is provider-specific: a watch-page slug for slug-based upstreams,
/// the show identifier for upstreams addressed by (show, episode) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub id: String,
    /// Requested episode number; upstream numbering may have gaps, so this
    /// is matched by numeric equality, never by positional index
    pub episode: u32,
    pub audio: AudioPreference,
}

/// One playable stream description returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoVariant {
    pub url: String,
    /// True for segmented (HLS) playlists, false for flat files
    pub is_segmented: bool,
    /// Upstream quality label, e.g. "1080p" or "default"
    pub quality: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtitles: Vec<SubtitleTrack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_markers: Option<SkipMarkers>,
}

/// External subtitle track attached to a variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub url: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Intro/outro boundaries in seconds, for player skip buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipMarkers {
    pub intro_start: u32,
    pub intro_end: u32,
    pub outro_start: u32,
    pub outro_end: u32,
}
