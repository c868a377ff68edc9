//! Line-anchored chapter heading detection.

use std::collections::HashSet;

use regex::Regex;
use tracing::instrument;

use crate::consts;
use crate::models::ChapterEntry;

/// The family of structural vocabulary a heading was recognized by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// `第N章`, `第N卷`, `第N回`, ... (numbered volume/book/part/chapter/section)
    Numbered,
    /// `卷N`, `册N`, `篇N` (bare volume/book/part)
    BareVolume,
    /// `上册`, `下卷`, `上篇`, ... (upper/lower volume or section)
    UpperLower,
    /// `Chapter N`
    Latin,
    /// `番外`, `番外N`, `番外篇` (extras)
    Extra,
    /// Side story, afterword, epilogue, final chapter, prologue, foreword, introduction.
    Standalone,
}

type Matcher = fn(&str) -> Option<usize>;

/// Matchers in priority order. The first variant that matches at the start
/// of the line wins.
const MATCHERS: [(BoundaryKind, Matcher); 6] = [
    (BoundaryKind::Numbered, match_numbered),
    (BoundaryKind::BareVolume, match_bare_volume),
    (BoundaryKind::UpperLower, match_upper_lower),
    (BoundaryKind::Latin, match_latin),
    (BoundaryKind::Extra, match_extra),
    (BoundaryKind::Standalone, match_standalone),
];

fn anchored(regex: &Regex, line: &str) -> Option<usize> {
    regex.find(line).filter(|m| m.start() == 0).map(|m| m.end())
}

fn match_numbered(line: &str) -> Option<usize> {
    anchored(&consts::NUMBERED_REGEX, line)
}

fn match_bare_volume(line: &str) -> Option<usize> {
    anchored(&consts::BARE_VOLUME_REGEX, line)
}

fn match_upper_lower(line: &str) -> Option<usize> {
    anchored(&consts::UPPER_LOWER_REGEX, line)
}

fn match_latin(line: &str) -> Option<usize> {
    anchored(&consts::LATIN_REGEX, line)
}

fn match_extra(line: &str) -> Option<usize> {
    anchored(&consts::EXTRA_REGEX, line)
}

fn match_standalone(line: &str) -> Option<usize> {
    anchored(&consts::STANDALONE_REGEX, line)
}

/// A structural pattern found at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub kind: BoundaryKind,
    /// Bytes of leading whitespace before the pattern.
    pub indent: usize,
    /// Byte length of the bare pattern match.
    pub length: usize,
}

/// Match a single line (without its terminator) against the structural
/// patterns.
///
/// Only a pattern starting at the first non-whitespace character counts:
/// headings quoted or discussed mid-sentence are not boundaries.
///
/// ```rust
/// use quire_toc::{BoundaryKind, match_boundary};
/// let boundary = match_boundary("  第一章 标题开始").unwrap();
/// assert_eq!(boundary.kind, BoundaryKind::Numbered);
/// assert_eq!(boundary.indent, 2);
/// assert!(match_boundary("这里的\"第一章\"是示例").is_none());
/// ```
pub fn match_boundary(line: &str) -> Option<Boundary> {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    MATCHERS
        .iter()
        .find_map(|(kind, matcher)| matcher(trimmed).map(|length| Boundary { kind: *kind, indent, length }))
}

/// Pick the title for a heading line.
///
/// `heading` starts at the pattern; `length` is the bare match. When a
/// sentence terminator follows the bare match on the same line, the title
/// runs through it ("第一章 新的开始。"), otherwise it is the bare marker.
fn extract_title(heading: &str, length: usize) -> String {
    let bare = heading[..length].trim_end();
    let heading = heading.trim_end();
    match heading.char_indices().find(|(_, c)| consts::TERMINATORS.contains(c)) {
        Some((index, mark)) if index > bare.len() => heading[..index + mark.len_utf8()].trim().to_string(),
        _ => bare.to_string(),
    }
}

/// The heading line (indent and trailing whitespace trimmed) alongside its entry.
fn scan_line(line: &str, offset: usize) -> Option<(&str, ChapterEntry)> {
    let content = line.trim_end_matches(['\n', '\r']);
    let boundary = match_boundary(content)?;
    let heading = content[boundary.indent..].trim_end();
    let title = extract_title(heading, boundary.length);
    tracing::trace!(kind = ?boundary.kind, %title, offset, "Matched chapter heading");
    Some((heading, ChapterEntry::new(title, offset + boundary.indent)))
}

/// Scan a decoded document for chapter headings.
///
/// Lines are folded in order carrying the running byte offset, so entries
/// come out in order of appearance with exact offsets (`\r\n` terminators
/// included). A heading line identical to one already recorded is skipped,
/// which keeps a contents listing at the top of a document from doubling
/// every chapter. Headings that only share a title ("第一章 开始" in one
/// volume, "第一章 重逢" in the next) are all kept.
#[instrument(skip(text), fields(bytes = text.len(), chapters))]
pub fn scan(text: &str) -> Vec<ChapterEntry> {
    let (_, _, entries) = text.split_inclusive('\n').fold(
        (0usize, HashSet::new(), Vec::new()),
        |(offset, mut seen, mut entries), line| {
            if let Some((heading, entry)) = scan_line(line, offset)
                && seen.insert(heading)
            {
                entries.push(entry);
            }
            (offset + line.len(), seen, entries)
        },
    );
    tracing::Span::current().record("chapters", entries.len());
    entries
}
