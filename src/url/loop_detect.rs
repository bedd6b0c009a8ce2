use crate::url::Url;

/// Number of identical consecutive segment groups that make a loop
pub const LOOP_THRESHOLD: usize = 3;

/// Detects crawl traps made of repeating path segments
///
/// The path is split into non-empty segments and read from the deepest one
/// upwards. For each group size `g`, the first `LOOP_THRESHOLD` groups of `g`
/// segments are compared; if they are all identical the URL is a loop. The
/// check is repeated once against the parent directory so that a single
/// trailing segment after the loop does not hide it.
///
/// # Examples
///
/// ```
/// use dirhunt::{is_url_loop, Url};
///
/// assert!(is_url_loop(&Url::new("http://h/a/a/a/a/a/")));
/// assert!(!is_url_loop(&Url::new("http://h/a/b/c/a/b/c/")));
/// ```
pub fn is_url_loop(url: &Url) -> bool {
    has_repeating_groups(&url.segments()) || has_repeating_groups(&url.parent().segments())
}

fn has_repeating_groups(segments: &[&str]) -> bool {
    let reversed: Vec<&str> = segments.iter().rev().copied().collect();
    (1..=reversed.len() / LOOP_THRESHOLD).any(|size| {
        let first = &reversed[..size];
        reversed
            .chunks(size)
            .take(LOOP_THRESHOLD)
            .all(|group| group == first)
    })
}
