use quire_toc::ChapterEntry;

/// Where the reader is in a document's lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    NoDocument,
    Ingesting,
    Ready,
}

/// Snapshot of everything a presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderView {
    pub phase: Phase,
    pub toc: Vec<ChapterEntry>,
    pub current_chapter_index: usize,
    pub current_chapter_content: String,
    pub is_loading: bool,
    /// Set when the document had no detectable chapters and only a bounded
    /// prefix of it is available.
    pub show_large_file_notification: bool,
}
