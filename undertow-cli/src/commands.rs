//! CLI command implementations

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use undertow_core::cache::LookupCache;
use undertow_core::config::UndertowConfig;
use undertow_core::media::{AudioPreference, MediaIdentity, MediaTitles, VideoVariant};
use undertow_core::relay::RelayClient;
use undertow_resolve::metadata::AniListClient;
use undertow_resolve::providers::default_providers;
use undertow_resolve::ranker::rank_variants;
use undertow_resolve::resolver::SourceResolver;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve playable sources for one episode
    Resolve {
        /// AniList media id to look up in the metadata catalog
        #[arg(long, conflicts_with = "title")]
        media_id: Option<u32>,
        /// Search title to resolve directly, bypassing the catalog
        #[arg(long)]
        title: Option<String>,
        /// Episode number
        #[arg(short, long)]
        episode: u32,
        /// Prefer dubbed audio
        #[arg(long)]
        dub: bool,
        /// Pick the Nth search match when several shows share a title
        #[arg(long, default_value = "0")]
        match_index: usize,
        /// Route upstream calls through this relay endpoint
        #[arg(long)]
        relay: Option<String>,
    },
    /// Print the search candidates derived for a media id
    Titles {
        /// AniList media id
        media_id: u32,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Resolve {
            media_id,
            title,
            episode,
            dub,
            match_index,
            relay,
        } => resolve_sources(media_id, title, episode, dub, match_index, relay).await,
        Commands::Titles { media_id } => show_titles(media_id).await,
    }
}

/// Resolve and print ranked sources for one episode
async fn resolve_sources(
    media_id: Option<u32>,
    title: Option<String>,
    episode: u32,
    dub: bool,
    match_index: usize,
    relay: Option<String>,
) -> Result<()> {
    let mut config = UndertowConfig::default();
    config.network.relay_base = relay;

    let media = match (media_id, title) {
        (Some(id), _) => AniListClient::new(&config.metadata)
            .fetch_media(id)
            .await
            .with_context(|| format!("metadata lookup for media {id}"))?,
        (None, Some(title)) => media_from_title(title),
        (None, None) => bail!("pass --media-id or --title"),
    };

    let relay_client = RelayClient::new(&config.network).context("relay client setup")?;
    let providers = default_providers(&config, relay_client);
    let resolver = SourceResolver::new(providers, Arc::new(LookupCache::new()));
    let audio = AudioPreference::from_dub_flag(dub);

    println!(
        "Resolving \"{}\" episode {} ({})...",
        display_title(&media),
        episode,
        audio
    );

    match resolver.resolve(&media, episode, audio, match_index).await {
        Some(variants) => {
            let ranked = rank_variants(variants);
            println!("Found {} source(s):", ranked.len());
            for (index, variant) in ranked.iter().enumerate() {
                println!("{}", format_variant(index, variant));
            }
        }
        None => {
            println!("No video sources found.");
            println!("Try another episode, the other audio track, or --match-index.");
        }
    }

    let stats = resolver.cache().statistics().await;
    tracing::debug!(
        entries = stats.entries,
        hits = stats.hit_count,
        misses = stats.miss_count,
        "cache statistics"
    );

    Ok(())
}

/// Print the normalizer's candidates for a media id
async fn show_titles(media_id: u32) -> Result<()> {
    let config = UndertowConfig::default();
    let media = AniListClient::new(&config.metadata)
        .fetch_media(media_id)
        .await
        .with_context(|| format!("metadata lookup for media {media_id}"))?;

    let candidates = media.candidate_titles();
    if candidates.is_empty() {
        println!("Media {media_id} has no usable titles.");
        return Ok(());
    }

    println!("Search candidates for \"{}\":", display_title(&media));
    for (index, candidate) in candidates.iter().enumerate() {
        println!("{:>3}. {candidate}", index + 1);
    }

    Ok(())
}

/// Wraps a bare search title into a minimal media identity
fn media_from_title(title: String) -> MediaIdentity {
    MediaIdentity {
        id: 0,
        titles: MediaTitles {
            english: Some(title),
            romaji: None,
            native: None,
        },
        synonyms: Vec::new(),
        release_year: None,
    }
}

/// Best display name the catalog gave us
fn display_title(media: &MediaIdentity) -> &str {
    media
        .titles
        .english
        .as_deref()
        .or(media.titles.romaji.as_deref())
        .or(media.titles.native.as_deref())
        .unwrap_or("untitled media")
}

/// One printable line per ranked variant
fn format_variant(index: usize, variant: &VideoVariant) -> String {
    let kind = if variant.is_segmented { "hls" } else { "file" };
    let mut line = format!(
        "{:>3}. {:<8} {:<4} {}",
        index + 1,
        variant.quality,
        kind,
        variant.url
    );
    if !variant.subtitles.is_empty() {
        line.push_str(&format!("  [{} subtitle track(s)]", variant.subtitles.len()));
    }
    if variant.skip_markers.is_some() {
        line.push_str("  [skip markers]");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_title_falls_back_through_locales() {
        let mut media = media_from_title("Trigun".to_string());
        assert_eq!(display_title(&media), "Trigun");

        media.titles.english = None;
        media.titles.native = Some("トライガン".to_string());
        assert_eq!(display_title(&media), "トライガン");

        media.titles.native = None;
        assert_eq!(display_title(&media), "untitled media");
    }

    #[test]
    fn format_variant_annotates_extras() {
        use undertow_core::media::{SkipMarkers, SubtitleTrack};

        let plain = VideoVariant {
            url: "https://cdn.example/ep.mp4".to_string(),
            is_segmented: false,
            quality: "720p".to_string(),
            subtitles: Vec::new(),
            skip_markers: None,
        };
        let line = format_variant(0, &plain);
        assert!(line.contains("720p"));
        assert!(line.contains("file"));
        assert!(!line.contains("subtitle"));

        let rich = VideoVariant {
            url: "https://cdn.example/master.m3u8".to_string(),
            is_segmented: true,
            quality: "1080p".to_string(),
            subtitles: vec![SubtitleTrack {
                url: "https://cdn.example/en.vtt".to_string(),
                language: "en".to_string(),
                label: None,
            }],
            skip_markers: Some(SkipMarkers {
                intro_start: 90,
                intro_end: 180,
                outro_start: 1280,
                outro_end: 1370,
            }),
        };
        let line = format_variant(1, &rich);
        assert!(line.contains("hls"));
        assert!(line.contains("[1 subtitle track(s)]"));
        assert!(line.contains("[skip markers]"));
    }
}
