//! Quality-based ordering of resolved video variants.

use undertow_core::media::VideoVariant;

/// Fixed quality ladder, best first. Labels come from upstream server
/// naming; anything else ranks below the ladder but stays selectable.
const QUALITY_LADDER: [&str; 6] = ["1080p", "720p", "480p", "360p", "default", "backup"];

/// Ladder position of a quality label; unknown labels sort after all
/// known ones.
fn quality_rank(quality: &str) -> usize {
    QUALITY_LADDER
        .iter()
        .position(|known| *known == quality)
        .unwrap_or(QUALITY_LADDER.len())
}

/// Orders variants best-quality-first.
///
/// The sort is stable: equal-quality variants keep their relative order,
/// so mirror fan-out order acts as the tie-break.
pub fn rank_variants(mut variants: Vec<VideoVariant>) -> Vec<VideoVariant> {
    variants.sort_by_key(|variant| quality_rank(&variant.quality));
    variants
}

/// Picks the best variant by the quality ladder.
///
/// # Panics
/// Panics when `variants` is empty. The orchestrator only hands over
/// non-empty result sets; calling this with none is a programming error,
/// not a runtime condition.
pub fn select_best(variants: &[VideoVariant]) -> &VideoVariant {
    variants
        .iter()
        .min_by_key(|variant| quality_rank(&variant.quality))
        .expect("select_best requires at least one variant")
}
