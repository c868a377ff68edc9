use quire_toc::ChapterEntry;

use crate::models::SourceLayout;

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct ChapterEntryProxy {
    #[facet(rename = "t")]
    title: String,
    #[facet(rename = "o")]
    offset: u64,
}
impl From<&ChapterEntry> for ChapterEntryProxy {
    fn from(entry: &ChapterEntry) -> Self {
        Self {
            title: entry.title.clone(),
            offset: entry.offset as u64,
        }
    }
}
impl TryFrom<ChapterEntryProxy> for ChapterEntry {
    type Error = std::num::TryFromIntError;
    fn try_from(entry: ChapterEntryProxy) -> Result<Self, Self::Error> {
        Ok(Self::new(entry.title, usize::try_from(entry.offset)?))
    }
}

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct SourceLayoutProxy {
    #[facet(rename = "enc")]
    encoding: String,
    #[facet(rename = "bom", default)]
    bom_len: u64,
    #[facet(rename = "src")]
    source_len: u64,
    #[facet(rename = "txt")]
    text_len: u64,
}
impl From<&SourceLayout> for SourceLayoutProxy {
    fn from(layout: &SourceLayout) -> Self {
        Self {
            encoding: layout.encoding.clone(),
            bom_len: layout.bom_len,
            source_len: layout.source_len,
            text_len: layout.text_len,
        }
    }
}
impl From<SourceLayoutProxy> for SourceLayout {
    fn from(layout: SourceLayoutProxy) -> Self {
        Self {
            encoding: layout.encoding,
            bom_len: layout.bom_len,
            source_len: layout.source_len,
            text_len: layout.text_len,
        }
    }
}
