//! Re-slicing chapters straight out of the source bytes.
//!
//! TOC offsets point into the decoded text, not the source. Without the
//! decoded text at hand they are mapped back proportionally over the bytes
//! after any byte-order mark, which is exact for UTF-8 and close enough for
//! fixed-ratio encodings. The result is not
//! anchored on titles, so chapter edges may differ slightly from the cached
//! spans.

use std::ops::Range;

use quire_cache::SourceLayout;
use quire_decode::Encoding;
use quire_toc::ChapterEntry;

const BOM: char = '\u{FEFF}';
const REPLACEMENT: char = '\u{FFFD}';

/// Map a byte offset in the decoded text to one in the source.
///
/// The byte-order mark is stripped before decoding, so text offset 0 sits
/// just past it.
fn to_source(offset: usize, layout: &SourceLayout) -> u64 {
    let bom = layout.bom_len.min(layout.source_len);
    if layout.text_len == 0 {
        return bom;
    }
    let body = u128::from(layout.source_len - bom);
    let mapped = u64::try_from(offset as u128 * body / u128::from(layout.text_len)).unwrap_or(u64::MAX);
    bom.saturating_add(mapped).min(layout.source_len)
}

fn is_utf16(encoding: Option<&'static Encoding>) -> bool {
    encoding.is_some_and(|e| matches!(e.name(), "UTF-16LE" | "UTF-16BE"))
}

/// Source byte range of chapter `index`: from its entry's offset up to the
/// next entry's offset, or the end of the source.
pub(crate) fn source_range(toc: &[ChapterEntry], index: usize, layout: &SourceLayout) -> Range<u64> {
    let start = toc.get(index).map_or(0, |entry| to_source(entry.offset, layout));
    let end = toc
        .get(index + 1)
        .map_or(layout.source_len, |next| to_source(next.offset, layout))
        .max(start);
    match is_utf16(encoding_of(layout)) {
        true => (start & !1)..(end & !1),
        false => start..end,
    }
}

pub(crate) fn encoding_of(layout: &SourceLayout) -> Option<&'static Encoding> {
    Encoding::for_label(layout.encoding.as_bytes())
}

/// Decode a fragment of a source.
///
/// With a known encoding the bytes are decoded with it; otherwise the
/// fragment goes through full detection. A stray byte-order mark at the
/// front is dropped. When `cut`, replacement characters left at either edge
/// by slicing through a multi-byte character are dropped too.
pub(crate) fn decode_fragment(bytes: &[u8], encoding: Option<&'static Encoding>, cut: bool) -> String {
    let text = match encoding {
        Some(encoding) => quire_decode::decode_with(bytes, encoding),
        None => quire_decode::decode(bytes),
    };
    let text = text.strip_prefix(BOM).unwrap_or(text.as_str());
    match cut {
        true => text.trim_matches(REPLACEMENT).to_string(),
        false => text.to_string(),
    }
}

/// Cut `text` to at most `max` bytes, backing off to a character boundary.
pub(crate) fn truncate(text: &str, max: usize) -> &str {
    let mut end = max.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
