//! Best-effort text decoding with encoding detection.
//!
//! Plain-text documents arrive as raw bytes with no declared charset. This
//! crate turns them into Unicode using a fixed priority of evidence:
//!
//! 1. A byte-order mark (UTF-8, UTF-16LE, UTF-16BE), decoded strictly with
//!    the mark stripped.
//! 2. Strict UTF-8.
//! 3. A byte-pair heuristic for double-byte Chinese encodings (see
//!    [`looks_like_cjk`]), decoded as GBK.
//! 4. The first of [`FALLBACK_ENCODINGS`] that decodes without errors.
//! 5. Lossy UTF-8 with U+FFFD substituted for invalid sequences.
//!
//! The last step cannot fail, so [`decode`] is total.

mod detect;

pub use crate::detect::{CJK_MIN_PAIRS, CJK_SAMPLE_BYTES, looks_like_cjk};
pub use encoding_rs::Encoding;
use encoding_rs::{BIG5_INIT, GBK, GBK_INIT, SHIFT_JIS_INIT, UTF_8, UTF_16LE_INIT};
use tracing::instrument;

/// Encodings tried, in order, when neither a BOM, strict UTF-8, nor the CJK
/// heuristic settled the question. GB2312 is an alias of GBK.
pub static FALLBACK_ENCODINGS: [&Encoding; 4] = [&GBK_INIT, &BIG5_INIT, &SHIFT_JIS_INIT, &UTF_16LE_INIT];

/// Which rule picked the encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Detection {
    /// A byte-order mark was present.
    Bom,
    /// The buffer is valid UTF-8.
    Utf8,
    /// Byte pairs in the sample look like a double-byte Chinese encoding.
    CjkHeuristic,
    /// One of [`FALLBACK_ENCODINGS`] decoded cleanly.
    Fallback,
    /// Nothing decoded cleanly; invalid sequences were replaced.
    Lossy,
}

/// Decoded text along with how it was decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
    pub detection: Detection,
}

/// Decode a buffer to a string, guessing the encoding when no BOM is present.
///
/// Never fails. See the [crate documentation](crate) for the detection order.
///
/// ```rust
/// assert_eq!(quire_decode::decode(b"\xEF\xBB\xBFhello"), "hello");
/// assert_eq!(quire_decode::decode("第一章".as_bytes()), "第一章");
/// ```
pub fn decode(buffer: impl AsRef<[u8]>) -> String {
    detect(buffer).text
}

/// Decode a buffer and report which encoding was chosen.
#[instrument(skip(buffer), fields(bytes = buffer.as_ref().len(), encoding, detection))]
pub fn detect(buffer: impl AsRef<[u8]>) -> Decoded {
    let bytes = buffer.as_ref();
    let decoded = detect_inner(bytes);
    let span = tracing::Span::current();
    span.record("encoding", decoded.encoding.name());
    span.record("detection", tracing::field::debug(decoded.detection));
    decoded
}

fn detect_inner(bytes: &[u8]) -> Decoded {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let body = &bytes[bom_length..];
        let text = match encoding.decode_without_bom_handling_and_without_replacement(body) {
            Some(text) => text.into_owned(),
            None => {
                // The mark is stronger evidence than anything that follows it.
                tracing::warn!(encoding = encoding.name(), "Invalid sequences after byte-order mark; replacing");
                encoding.decode_without_bom_handling(body).0.into_owned()
            },
        };
        return Decoded { text, encoding, detection: Detection::Bom };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Decoded {
            text: text.to_string(),
            encoding: UTF_8,
            detection: Detection::Utf8,
        };
    }

    if looks_like_cjk(bytes) {
        return Decoded {
            text: decode_with(bytes, GBK),
            encoding: GBK,
            detection: Detection::CjkHeuristic,
        };
    }

    for encoding in FALLBACK_ENCODINGS {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return Decoded {
                text: text.into_owned(),
                encoding,
                detection: Detection::Fallback,
            };
        }
    }

    tracing::warn!(bytes = bytes.len(), "No encoding decoded cleanly; falling back to lossy UTF-8");
    Decoded {
        text: String::from_utf8_lossy(bytes).into_owned(),
        encoding: UTF_8,
        detection: Detection::Lossy,
    }
}

/// Lossy decode of a fragment whose encoding is already known.
///
/// No BOM sniffing is performed, so this is suitable for slices taken from
/// the middle of a document. Malformed sequences (including a multi-byte
/// character cut in half at either edge) become U+FFFD.
pub fn decode_with(buffer: impl AsRef<[u8]>, encoding: &'static Encoding) -> String {
    encoding.decode_without_bom_handling(buffer.as_ref()).0.into_owned()
}
