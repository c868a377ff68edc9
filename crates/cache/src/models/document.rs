use exn::ResultExt;
use facet_json::{from_str as from_json, to_string as to_json};
use quire_storage::FileIdentity;
use quire_toc::{ChapterEntry, ChapterSpan};
use time::UtcDateTime;

use crate::error::{Error, ErrorKind, Result};
use crate::models::ChapterEntryProxy;

/// Everything needed to serve any chapter of a document without its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub file_id: FileIdentity,
    /// The decoded text (or, for documents without structure, its bounded prefix).
    pub content: String,
    pub toc: Vec<ChapterEntry>,
    pub chapters: Vec<ChapterSpan>,
    pub cached_at: UtcDateTime,
}
impl CacheRecord {
    pub fn new(file_id: FileIdentity, content: String, toc: Vec<ChapterEntry>, chapters: Vec<ChapterSpan>) -> Self {
        Self { file_id, content, toc, chapters, cached_at: UtcDateTime::now() }
    }

    /// Slice chapter `index` out of the cached content.
    pub fn chapter(&self, index: usize) -> Option<&str> {
        self.chapters.get(index).and_then(|span| span.slice(&self.content))
    }
}

/// How a source's bytes relate to its decoded text.
///
/// Kept with the reading state so chapters can be re-sliced from the source
/// after the content cache is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    /// Encoding label the document was decoded with.
    pub encoding: String,
    /// Bytes of byte-order mark at the front of the source; never part of the text.
    pub bom_len: u64,
    pub source_len: u64,
    pub text_len: u64,
}

pub(crate) fn toc_to_json(toc: &[ChapterEntry]) -> Result<String> {
    let proxies = toc.iter().map(ChapterEntryProxy::from).collect::<Vec<_>>();
    to_json(&proxies).or_raise(|| ErrorKind::InvalidData("toc"))
}

pub(crate) fn toc_from_json(json: &str) -> Result<Vec<ChapterEntry>> {
    from_json::<Vec<ChapterEntryProxy>>(json)
        .or_raise(|| ErrorKind::InvalidData("toc"))?
        .into_iter()
        .map(|proxy| ChapterEntry::try_from(proxy).or_raise(|| ErrorKind::InvalidData("toc offset")))
        .collect()
}

#[derive(sqlx::FromRow)]
pub(crate) struct DocumentRow {
    pub(crate) file_id: String,
    pub(crate) content: Vec<u8>,
    pub(crate) toc: String,
    pub(crate) cached_at: i64,
}
impl TryFrom<&CacheRecord> for DocumentRow {
    type Error = Error;
    fn try_from(record: &CacheRecord) -> Result<Self> {
        Ok(Self {
            file_id: record.file_id.to_string(),
            content: record.content.as_bytes().to_vec(),
            toc: toc_to_json(&record.toc)?,
            cached_at: record.cached_at.unix_timestamp(),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ChapterRow {
    pub(crate) idx: i64,
    pub(crate) start_offset: i64,
    pub(crate) end_offset: i64,
    pub(crate) title: String,
}
impl TryFrom<&ChapterSpan> for ChapterRow {
    type Error = Error;
    fn try_from(span: &ChapterSpan) -> Result<Self> {
        Ok(Self {
            idx: i64::try_from(span.index).or_raise(|| ErrorKind::InvalidData("chapter index"))?,
            start_offset: i64::try_from(span.start).or_raise(|| ErrorKind::InvalidData("chapter start"))?,
            end_offset: i64::try_from(span.end).or_raise(|| ErrorKind::InvalidData("chapter end"))?,
            title: span.title.clone(),
        })
    }
}
impl TryFrom<ChapterRow> for ChapterSpan {
    type Error = Error;
    fn try_from(row: ChapterRow) -> Result<Self> {
        Ok(Self {
            index: usize::try_from(row.idx).or_raise(|| ErrorKind::InvalidData("chapter index"))?,
            start: usize::try_from(row.start_offset).or_raise(|| ErrorKind::InvalidData("chapter start"))?,
            end: usize::try_from(row.end_offset).or_raise(|| ErrorKind::InvalidData("chapter end"))?,
            title: row.title,
        })
    }
}

impl CacheRecord {
    pub(crate) fn from_rows(document: DocumentRow, chapters: Vec<ChapterRow>) -> Result<Self> {
        Ok(Self {
            file_id: FileIdentity::parse(document.file_id).or_raise(|| ErrorKind::InvalidData("file id"))?,
            content: String::from_utf8(document.content).or_raise(|| ErrorKind::InvalidData("content"))?,
            toc: toc_from_json(&document.toc)?,
            chapters: chapters.into_iter().map(ChapterSpan::try_from).collect::<Result<Vec<_>>>()?,
            cached_at: UtcDateTime::from_unix_timestamp(document.cached_at)
                .or_raise(|| ErrorKind::InvalidData("cache timestamp"))?,
        })
    }
}
