//! Turning approximate heading offsets into exact chapter spans.

use tracing::instrument;

use crate::models::{ChapterEntry, ChapterSpan};

/// Locate `title` in `text`, preferring occurrences at or after `hint`.
///
/// Search order:
/// 1. From `hint` onwards (skipped if `hint` is past the end or not on a
///    character boundary).
/// 2. From the start of the text.
///
/// Returns `None` if the title does not occur at all; callers decide what
/// the third tier is.
///
/// ```rust
/// use quire_toc::find_anchor;
/// let text = "第一章 目录\n第一章 正文";
/// assert_eq!(find_anchor(text, "第一章", 10), Some(17));
/// assert_eq!(find_anchor(text, "第一章", 40), Some(0));
/// assert_eq!(find_anchor(text, "第九章", 0), None);
/// ```
pub fn find_anchor(text: &str, title: &str, hint: usize) -> Option<usize> {
    if title.is_empty() {
        return None;
    }
    text.get(hint..)
        .and_then(|tail| tail.find(title))
        .map(|index| hint + index)
        .or_else(|| text.find(title))
}

/// Clamp an offset into `text`, moving it back to the nearest character boundary.
fn floor_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Resolve each TOC entry to an exact span of `text`.
///
/// A chapter starts at its title's real occurrence ([`find_anchor`] from the
/// entry's offset, falling back to the offset itself) and runs up to where
/// the next chapter starts. The last chapter runs to the end of the text.
///
/// Starts are monotonic: one resolving before its predecessor is pulled
/// forward to it. Spans are therefore contiguous, and together cover
/// everything from the first start to the end of the text.
#[instrument(skip_all, fields(bytes = text.len(), chapters = toc.len()))]
pub fn resolve_positions(text: &str, toc: &[ChapterEntry]) -> Vec<ChapterSpan> {
    let starts: Vec<usize> = toc
        .iter()
        .scan(0usize, |floor, entry| {
            let start = find_anchor(text, &entry.title, entry.offset)
                .unwrap_or_else(|| floor_boundary(text, entry.offset))
                .max(*floor);
            *floor = start;
            Some(start)
        })
        .collect();

    toc.iter()
        .zip(&starts)
        .enumerate()
        .map(|(index, (entry, &start))| ChapterSpan {
            index,
            start,
            end: starts.get(index + 1).copied().unwrap_or(text.len()),
            title: entry.title.clone(),
        })
        .collect()
}
