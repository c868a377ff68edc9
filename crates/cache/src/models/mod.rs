pub(crate) mod document;
mod facet;

pub(crate) use self::document::{ChapterRow, DocumentRow};
pub use self::document::{CacheRecord, SourceLayout};
pub(crate) use self::facet::{ChapterEntryProxy, SourceLayoutProxy};
