//! The reader: one active document, its chapters, and the published view.

use exn::ResultExt;
use quire_cache::{CacheRecord, Database, Repository, SourceLayout, StateStore};
use quire_config::{Config, DEFAULT_PREFIX_CAP_BYTES, ReaderConfig};
use quire_storage::{FileIdentity, SourceRef};
use quire_toc::{ChapterEntry, ChapterSpan};
use tokio::sync::watch;
use tracing::{Span, instrument};

use crate::error::{ErrorKind, Result};
use crate::slice;
use crate::view::{Phase, ReaderView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Bytes of a structureless document kept as its single pseudo-chapter.
    pub prefix_cap_bytes: usize,
}
impl Default for ReaderOptions {
    fn default() -> Self {
        Self { prefix_cap_bytes: DEFAULT_PREFIX_CAP_BYTES }
    }
}
impl From<&ReaderConfig> for ReaderOptions {
    fn from(config: &ReaderConfig) -> Self {
        Self { prefix_cap_bytes: config.prefix_cap_bytes }
    }
}

/// The document currently being read.
#[derive(Debug)]
struct Active {
    file_id: FileIdentity,
    toc: Vec<ChapterEntry>,
    /// Held for the lifetime of the document so chapters survive a lost cache.
    source: Option<SourceRef>,
    layout: Option<SourceLayout>,
}
impl Active {
    /// Chapters that can be loaded; a document without structure still has
    /// its pseudo-chapter.
    fn chapter_count(&self) -> usize {
        self.toc.len().max(1)
    }
}

/// Ingests documents and serves their chapters.
///
/// Chapters come from the content cache when it has a record for the active
/// document, and are otherwise re-sliced out of the source. Storage failures
/// on either store are logged and degrade to the next option; only running
/// out of options is an error ([`ErrorKind::MissingSource`]).
///
/// Every change is published as a [`ReaderView`]; see [`subscribe`](Self::subscribe).
pub struct Reader {
    cache: Repository,
    state: StateStore,
    options: ReaderOptions,
    active: Option<Active>,
    view: watch::Sender<ReaderView>,
}

impl Reader {
    pub fn new(cache: Repository, state: StateStore, options: ReaderOptions) -> Self {
        let (view, _) = watch::channel(ReaderView::default());
        Self { cache, state, options, active: None, view }
    }

    /// Open both stores where `config` says they live.
    #[instrument(skip_all, fields(directory = %config.cache.directory.display()))]
    pub async fn open(config: &Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.cache.directory).await.or_raise(|| ErrorKind::Cache)?;
        let connections = config.reader.max_cache_connections;
        let content = Database::connect_with(config.cache.content_path(), connections)
            .await
            .or_raise(|| ErrorKind::Cache)?;
        let state = Database::connect_with(config.cache.state_path(), connections)
            .await
            .or_raise(|| ErrorKind::Cache)?;
        Ok(Self::new(
            Repository::from(&content),
            StateStore::from(&state),
            ReaderOptions::from(&config.reader),
        ))
    }

    pub fn subscribe(&self) -> watch::Receiver<ReaderView> {
        self.view.subscribe()
    }

    /// A copy of the current view.
    pub fn view(&self) -> ReaderView {
        self.view.borrow().clone()
    }

    /// Decode, index and cache `source`, replacing the active document.
    ///
    /// On success the first chapter (or the bounded prefix of a document
    /// without structure) is loaded. If the source cannot be read the
    /// previous document stays active.
    #[instrument(skip_all, fields(source = %source.path().display(), file_id, chapters))]
    pub async fn ingest(&mut self, source: SourceRef) -> Result<()> {
        let previous = self.view.borrow().clone();
        self.view.send_modify(|view| {
            view.phase = Phase::Ingesting;
            view.is_loading = true;
        });
        match self.ingest_inner(source).await {
            Ok(view) => {
                self.view.send_replace(view);
                Ok(())
            },
            Err(err) => {
                self.view.send_replace(previous);
                Err(err)
            },
        }
    }

    async fn ingest_inner(&mut self, source: SourceRef) -> Result<ReaderView> {
        let info = source.stat().await.or_raise(|| ErrorKind::Source)?;
        let file_id = info.identity();
        Span::current().record("file_id", file_id.as_str());
        let bytes = source.read().await.or_raise(|| ErrorKind::Source)?;

        // The document being replaced may only be known from the last session.
        let previous = match &self.active {
            Some(active) => Some(active.file_id.clone()),
            None => logged(self.state.file_id().await, "file id"),
        };
        if let Some(previous) = previous.filter(|previous| *previous != file_id)
            && let Err(err) = self.cache.delete(&previous).await
        {
            tracing::warn!(error = %err, file_id = %previous, "Could not evict replaced document");
        }

        let decoded = quire_decode::detect(&bytes);
        let toc = quire_toc::scan(&decoded.text);
        Span::current().record("chapters", toc.len());
        let layout = SourceLayout {
            encoding: decoded.encoding.name().to_string(),
            bom_len: quire_decode::Encoding::for_bom(&bytes).map_or(0, |(_, length)| length as u64),
            source_len: bytes.len() as u64,
            text_len: decoded.text.len() as u64,
        };

        let partial = toc.is_empty();
        let (content, chapters) = match partial {
            true => {
                let prefix = slice::truncate(&decoded.text, self.options.prefix_cap_bytes).to_string();
                tracing::info!(bytes = prefix.len(), "No chapter structure found; keeping a bounded prefix");
                let pseudo = ChapterSpan {
                    index: 0,
                    start: 0,
                    end: prefix.len(),
                    title: info.name(),
                };
                (prefix, vec![pseudo])
            },
            false => {
                let chapters = quire_toc::resolve_positions(&decoded.text, &toc);
                (decoded.text, chapters)
            },
        };
        let first = chapters
            .first()
            .and_then(|span| span.slice(&content))
            .unwrap_or_default()
            .to_string();

        let record = CacheRecord::new(file_id.clone(), content, toc.clone(), chapters);
        if let Err(err) = self.cache.put(&record).await {
            tracing::warn!(error = %err, "Content cache unavailable; chapters will be re-read from the source");
        }
        let active = Active {
            file_id,
            toc,
            source: Some(source),
            layout: Some(layout),
        };
        if let Err(err) = self.save_state(&active).await {
            tracing::warn!(error = %err, "Could not persist reading state");
        }

        let view = ReaderView {
            phase: Phase::Ready,
            toc: active.toc.clone(),
            current_chapter_index: 0,
            current_chapter_content: first,
            is_loading: false,
            show_large_file_notification: partial,
        };
        self.active = Some(active);
        Ok(view)
    }

    async fn save_state(&self, active: &Active) -> quire_cache::error::Result<()> {
        self.state.set_file_id(&active.file_id).await?;
        self.state.set_toc(&active.toc).await?;
        self.state.set_chapter_index(0).await?;
        if let Some(layout) = &active.layout {
            self.state.set_layout(layout).await?;
        }
        Ok(())
    }

    /// Load chapter `index` of the active document and make it current.
    #[instrument(skip(self), fields(file_id))]
    pub async fn load_chapter(&self, index: usize) -> Result<String> {
        let Some(active) = &self.active else {
            exn::bail!(ErrorKind::NoDocument);
        };
        Span::current().record("file_id", active.file_id.as_str());
        let count = active.chapter_count();
        if index >= count {
            exn::bail!(ErrorKind::ChapterOutOfRange { index, count });
        }

        self.view.send_modify(|view| view.is_loading = true);
        let content = match self.chapter_content(active, index).await {
            Ok(content) => content,
            Err(err) => {
                self.view.send_modify(|view| view.is_loading = false);
                return Err(err);
            },
        };
        if let Err(err) = self.state.set_chapter_index(index).await {
            tracing::warn!(error = %err, "Could not persist chapter index");
        }
        self.view.send_modify(|view| {
            view.phase = Phase::Ready;
            view.current_chapter_index = index;
            view.current_chapter_content = content.clone();
            view.is_loading = false;
        });
        Ok(content)
    }

    async fn chapter_content(&self, active: &Active, index: usize) -> Result<String> {
        match self.cache.chapter_text(&active.file_id, index).await {
            Ok(Some(text)) => return Ok(text),
            Ok(None) => tracing::debug!(index, "Chapter not cached"),
            Err(err) => tracing::warn!(error = %err, "Content cache unavailable; falling back to source"),
        }
        let missing = || ErrorKind::MissingSource(active.file_id.to_string());
        let Some(source) = &active.source else {
            exn::bail!(missing());
        };
        self.source_chapter(source, active, index).await.or_raise(missing)
    }

    /// Degraded path: slice the chapter straight out of the source bytes.
    async fn source_chapter(&self, source: &SourceRef, active: &Active, index: usize) -> quire_storage::error::Result<String> {
        if active.toc.is_empty() {
            let cap = self.options.prefix_cap_bytes;
            let bytes = source.read_head(cap).await?;
            let encoding = active.layout.as_ref().and_then(slice::encoding_of);
            let text = slice::decode_fragment(&bytes, encoding, true);
            return Ok(slice::truncate(&text, cap).to_string());
        }
        let layout = match &active.layout {
            Some(layout) => layout.clone(),
            None => {
                // Unknown encoding: assume offsets line up and let detection decide.
                let size = source.stat().await?.size;
                SourceLayout {
                    encoding: String::new(),
                    bom_len: 0,
                    source_len: size,
                    text_len: size,
                }
            },
        };
        let range = slice::source_range(&active.toc, index, &layout);
        tracing::debug!(index, start = range.start, end = range.end, "Re-slicing chapter from source");
        let bytes = source.read_range(range).await?;
        Ok(slice::decode_fragment(&bytes, slice::encoding_of(&layout), true))
    }

    /// Resume the document recorded in the reading state, if any.
    ///
    /// Returns `false` when there is nothing to resume. If the content cache
    /// no longer has the document, the TOC and position are still restored
    /// and chapter loads fail with [`ErrorKind::MissingSource`] until the
    /// source is [attached](Self::attach_source) or ingested again.
    #[instrument(skip(self))]
    pub async fn restore(&mut self) -> Result<bool> {
        let Some(file_id) = logged(self.state.file_id().await, "file id") else {
            return Ok(false);
        };
        let toc = logged(self.state.toc().await, "toc").unwrap_or_default();
        let layout = logged(self.state.layout().await, "layout");
        let stored = logged(self.state.chapter_index().await, "chapter index").unwrap_or(0);

        let active = Active { file_id, toc, source: None, layout };
        let index = match stored < active.chapter_count() {
            true => stored,
            false => 0,
        };
        self.view.send_replace(ReaderView {
            phase: Phase::Ready,
            toc: active.toc.clone(),
            current_chapter_index: index,
            ..ReaderView::default()
        });
        self.active = Some(active);

        match self.load_chapter(index).await {
            Ok(_) => {
                let partial = self.active.as_ref().is_some_and(|active| active.toc.is_empty());
                self.view.send_modify(|view| view.show_large_file_notification = partial);
            },
            Err(err) if matches!(&*err, ErrorKind::MissingSource(_)) => {
                tracing::info!("Restored reading position without content; the source must be reopened");
            },
            Err(err) => return Err(err),
        }
        Ok(true)
    }

    /// Hand the reader a source for the active document without re-ingesting.
    ///
    /// If no chapter content is shown yet, the current chapter is loaded.
    #[instrument(skip_all, fields(source = %source.path().display()))]
    pub async fn attach_source(&mut self, source: SourceRef) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            exn::bail!(ErrorKind::NoDocument);
        };
        let identity = source.identity().await.or_raise(|| ErrorKind::Source)?;
        if identity != active.file_id {
            exn::bail!(ErrorKind::SourceMismatch);
        }
        active.source = Some(source);

        let (index, empty) = {
            let view = self.view.borrow();
            (view.current_chapter_index, view.current_chapter_content.is_empty())
        };
        if empty {
            self.load_chapter(index).await?;
        }
        Ok(())
    }

    /// Load the chapter after the current one; `None` at the last chapter.
    pub async fn next_chapter(&self) -> Result<Option<String>> {
        let Some(active) = &self.active else {
            exn::bail!(ErrorKind::NoDocument);
        };
        let index = self.view.borrow().current_chapter_index + 1;
        if index >= active.chapter_count() {
            return Ok(None);
        }
        self.load_chapter(index).await.map(Some)
    }

    /// Load the chapter before the current one; `None` at the first chapter.
    pub async fn previous_chapter(&self) -> Result<Option<String>> {
        if self.active.is_none() {
            exn::bail!(ErrorKind::NoDocument);
        }
        let current = self.view.borrow().current_chapter_index;
        match current.checked_sub(1) {
            Some(index) => self.load_chapter(index).await.map(Some),
            None => Ok(None),
        }
    }

    /// Forget the active document: its cache record, the reading state, and
    /// the source reference.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) {
        if let Some(active) = self.active.take()
            && let Err(err) = self.cache.delete(&active.file_id).await
        {
            tracing::warn!(error = %err, "Could not delete cached document");
        }
        if let Err(err) = self.state.clear().await {
            tracing::warn!(error = %err, "Could not clear reading state");
        }
        self.view.send_replace(ReaderView::default());
    }
}

/// Unwrap a state value, treating a failed read like a missing one.
fn logged<T>(result: quire_cache::error::Result<Option<T>>, key: &'static str) -> Option<T> {
    result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, key, "Could not read reading state");
        None
    })
}
