//! Media variant selection
//!
//! A post element may render the same media at several resolutions (`src`
//! plus `srcset` candidates, several `<source>` children). These helpers pick
//! the single best variant.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static DIMENSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2,5})x(\d{2,5})").expect("dimension pattern is valid"));

/// Named size variants served by the image CDN, smallest first
const NAMED_SIZES: &[(&str, u64)] = &[
    ("thumb", 150 * 150),
    ("tiny", 320 * 320),
    ("small", 680 * 680),
    ("medium", 1200 * 1200),
    ("large", 2048 * 2048),
    ("4096x4096", 4096 * 4096),
    ("orig", u64::MAX),
];

/// Strips a `srcset` descriptor (`"url 2x"` -> `"url"`)
fn candidate_url(candidate: &str) -> Option<&str> {
    candidate.split_whitespace().next()
}

/// Estimated pixel area of an image variant, from its `name=` size or an
/// embedded `WxH` segment; 0 if unknown
fn image_rank(url: &str) -> u64 {
    if let Ok(parsed) = Url::parse(url) {
        if let Some((_, name)) = parsed.query_pairs().find(|(key, _)| key == "name") {
            if let Some((_, area)) = NAMED_SIZES.iter().find(|(size, _)| *size == name) {
                return *area;
            }
        }
    }
    dimension_area(url)
}

fn dimension_area(url: &str) -> u64 {
    DIMENSIONS
        .captures_iter(url)
        .filter_map(|caps| {
            let width: u64 = caps.get(1)?.as_str().parse().ok()?;
            let height: u64 = caps.get(2)?.as_str().parse().ok()?;
            Some(width * height)
        })
        .max()
        .unwrap_or(0)
}

/// Picks the highest-ranked candidate; ties keep the earliest
fn pick_best<'a>(candidates: impl Iterator<Item = &'a str>, rank: fn(&str) -> u64) -> Option<String> {
    let mut best: Option<(&str, u64)> = None;
    for url in candidates {
        let score = rank(url);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((url, score));
        }
    }
    best.map(|(url, _)| url.to_string())
}

/// Picks the highest-resolution image among rendered candidates
///
/// Candidates may be bare URLs or `srcset` entries with descriptors.
///
/// # Example
///
/// ```
/// use timeline_trawler::extract::pick_best_image;
///
/// let candidates = vec![
///     "https://pbs.twimg.com/media/A?format=jpg&name=small".to_string(),
///     "https://pbs.twimg.com/media/A?format=jpg&name=large 2x".to_string(),
/// ];
/// assert_eq!(
///     pick_best_image(&candidates).as_deref(),
///     Some("https://pbs.twimg.com/media/A?format=jpg&name=large")
/// );
/// ```
pub fn pick_best_image(candidates: &[String]) -> Option<String> {
    pick_best(
        candidates
            .iter()
            .filter_map(|c| candidate_url(c))
            .filter(|url| !url.starts_with("data:")),
        image_rank,
    )
}

/// Picks the highest-resolution video among rendered candidates
///
/// `blob:` sources are session-local and skipped.
pub fn pick_best_video(candidates: &[String]) -> Option<String> {
    pick_best(
        candidates
            .iter()
            .filter_map(|c| candidate_url(c))
            .filter(|url| !url.starts_with("blob:")),
        dimension_area,
    )
}
