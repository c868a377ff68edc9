//! Byte-pattern sniffing for double-byte Chinese encodings.

use std::ops::RangeInclusive;

/// How many leading bytes are sampled.
pub const CJK_SAMPLE_BYTES: usize = 100;
/// Fewer matching pairs than this is never enough, however short the sample.
pub const CJK_MIN_PAIRS: usize = 3;

const LEAD: RangeInclusive<u8> = 0x81..=0xFE;
const TRAIL_LOW: RangeInclusive<u8> = 0x40..=0x7E;
const TRAIL_HIGH: RangeInclusive<u8> = 0x80..=0xFE;

/// Returns `true` if the start of the buffer looks like GBK/GB2312.
///
/// Counts adjacent byte pairs (within the first [`CJK_SAMPLE_BYTES`]) made
/// of a lead byte in `0x81..=0xFE` and a trail byte in `0x40..=0x7E` or
/// `0x80..=0xFE`. At least 20% of the sampled bytes, and never fewer than
/// [`CJK_MIN_PAIRS`], must match.
///
/// ```rust
/// use quire_decode::looks_like_cjk;
/// assert!(looks_like_cjk(b"\xB5\xDA\xD2\xBB\xD5\xC2"));
/// assert!(!looks_like_cjk(b"Chapter 1"));
/// ```
pub fn looks_like_cjk(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(CJK_SAMPLE_BYTES)];
    let pairs = sample
        .windows(2)
        .filter(|pair| LEAD.contains(&pair[0]) && (TRAIL_LOW.contains(&pair[1]) || TRAIL_HIGH.contains(&pair[1])))
        .count();
    pairs >= CJK_MIN_PAIRS && pairs * 5 >= sample.len()
}
