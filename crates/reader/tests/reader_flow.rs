//! End-to-end reader behavior against in-memory sources and caches.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use quire_cache::{Database, Repository, StateStore};
use quire_config::{CacheConfig, Config};
use quire_reader::error::ErrorKind;
use quire_reader::{Phase, Reader, ReaderOptions, ReaderView};
use quire_storage::backend::{MemoryBackend, SourceBackend};
use quire_storage::{FileInfo, SourceRef};
use time::UtcDateTime;
use tokio::sync::Notify;

const NOVEL: &str = "前言\n第一章 简介\n这是第一章的内容\n第二章 详细说明\n这是第二章的内容\n第三章 结尾\n全文完";
const SEQUEL: &str = "第一章 重逢\n又见面了\n第二章 告别\n再见";
/// Two volumes restarting their chapter numbers, with a title mentioned in prose.
const VOLUMES: &str = "序言\n第一卷 起\n第一章 开始\n本章与第二章有关\n更多内容\n第二章 成长\n正文二\n第二卷 承\n第一章 重逢\n正文三\n第二章 离别\n尾声部分";

struct Stores {
    content: Database,
    state: Database,
}
impl Stores {
    async fn new() -> Self {
        Self {
            content: Database::connect_in_memory().await.unwrap(),
            state: Database::connect_in_memory().await.unwrap(),
        }
    }

    fn reader(&self, options: ReaderOptions) -> Reader {
        Reader::new(Repository::from(&self.content), StateStore::from(&self.state), options)
    }
}

fn source(name: &str, text: &str) -> SourceRef {
    SourceRef::memory(name, text.as_bytes().to_vec(), UtcDateTime::UNIX_EPOCH).unwrap()
}

/// Every chapter in order, concatenated.
async fn read_through(reader: &Reader) -> String {
    let mut joined = String::new();
    for index in 0..reader.view().toc.len() {
        joined.push_str(&reader.load_chapter(index).await.unwrap());
    }
    joined
}

fn after_first_heading(text: &str) -> &str {
    &text[text.find("第一卷").unwrap()..]
}

// =============================================================================
// Cache path
// =============================================================================

#[tokio::test]
async fn test_cached_chapters_are_exact_spans() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    reader.ingest(source("novel.txt", NOVEL)).await.unwrap();

    let file_id = source("novel.txt", NOVEL).identity().await.unwrap();
    let record = Repository::from(&stores.content).get(&file_id).await.unwrap().unwrap();
    assert_eq!(record.content, NOVEL);
    assert_eq!(record.toc.len(), 3);
    for index in 0..record.chapters.len() {
        let chapter = reader.load_chapter(index).await.unwrap();
        assert_eq!(chapter, record.chapter(index).unwrap());
        assert_eq!(reader.view().current_chapter_content, chapter);
    }
    assert_eq!(reader.load_chapter(2).await.unwrap(), "第三章 结尾\n全文完");
}

#[tokio::test]
async fn test_chapter_index_is_persisted() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
    let state = StateStore::from(&stores.state);
    assert_eq!(state.chapter_index().await.unwrap(), Some(0));

    reader.load_chapter(2).await.unwrap();
    assert_eq!(state.chapter_index().await.unwrap(), Some(2));
    assert_eq!(state.toc().await.unwrap().unwrap().len(), 3);
}

#[tokio::test]
async fn test_out_of_range_keeps_position() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
    reader.load_chapter(1).await.unwrap();

    let err = reader.load_chapter(3).await.unwrap_err();
    assert!(matches!(*err, ErrorKind::ChapterOutOfRange { index: 3, count: 3 }));
    assert_eq!(reader.view().current_chapter_index, 1);
    assert_eq!(StateStore::from(&stores.state).chapter_index().await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_cached_chapters_cover_whole_text() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    reader.ingest(source("volumes.txt", VOLUMES)).await.unwrap();

    assert_eq!(reader.view().toc.len(), 6);
    assert!(reader.load_chapter(0).await.unwrap().contains("更多内容"));
    assert!(reader.load_chapter(4).await.unwrap().starts_with("第一章 重逢"));
    assert_eq!(read_through(reader).await, after_first_heading(VOLUMES));
}

// =============================================================================
// Degraded paths
// =============================================================================

#[tokio::test]
async fn test_source_chapters_cover_whole_text() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    reader.ingest(source("volumes.txt", VOLUMES)).await.unwrap();
    stores.content.close().await;

    assert_eq!(read_through(reader).await, after_first_heading(VOLUMES));
}

#[tokio::test]
async fn test_source_with_byte_order_mark() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    let bytes = [b"\xEF\xBB\xBF".as_slice(), VOLUMES.as_bytes()].concat();
    reader
        .ingest(SourceRef::memory("volumes.txt", bytes, UtcDateTime::UNIX_EPOCH).unwrap())
        .await
        .unwrap();
    stores.content.close().await;

    assert_eq!(reader.load_chapter(1).await.unwrap(), "第二章 成长\n正文二\n");
    assert_eq!(read_through(reader).await, after_first_heading(VOLUMES));
}

#[tokio::test]
async fn test_source_serves_chapters_without_cache() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
    stores.content.close().await;

    let chapter = reader.load_chapter(1).await.unwrap();
    assert!(chapter.starts_with("第二章 详细说明"));
    assert!(chapter.contains("这是第二章的内容"));
    assert_eq!(reader.view().current_chapter_index, 1);
}

#[tokio::test]
async fn test_ingest_survives_unavailable_cache() {
    let stores = Stores::new().await;
    stores.content.close().await;
    stores.state.close().await;
    let reader = &mut stores.reader(ReaderOptions::default());

    reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
    let view = reader.view();
    assert_eq!(view.phase, Phase::Ready);
    assert_eq!(view.toc.len(), 3);
    assert!(view.current_chapter_content.starts_with("第一章"));
    assert!(!reader.load_chapter(2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_source_and_cache() {
    let stores = Stores::new().await;
    let backend = Arc::new(MemoryBackend::default());
    let path = backend.insert("novel.txt", NOVEL, UtcDateTime::UNIX_EPOCH).await.unwrap();
    let reader = &mut stores.reader(ReaderOptions::default());
    reader.ingest(SourceRef::new(backend.clone(), &path)).await.unwrap();

    stores.content.close().await;
    backend.remove(&path).await.unwrap();
    let err = reader.load_chapter(1).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::MissingSource(_)));
    assert!(!err.is_retryable());
    // The failed load leaves the view as it was.
    let view = reader.view();
    assert_eq!(view.current_chapter_index, 0);
    assert!(!view.is_loading);
}

// =============================================================================
// Documents without structure
// =============================================================================

#[tokio::test]
async fn test_structureless_document_keeps_bounded_prefix() {
    let stores = Stores::new().await;
    let text = "这只是一段没有任何章节标记的文字。".repeat(200);
    let reader = &mut stores.reader(ReaderOptions { prefix_cap_bytes: 64 });
    reader.ingest(source("notes.txt", &text)).await.unwrap();

    let view = reader.view();
    assert!(view.toc.is_empty());
    assert!(view.show_large_file_notification);
    assert!(!view.current_chapter_content.is_empty());
    assert!(view.current_chapter_content.len() <= 64);
    assert!(text.starts_with(&view.current_chapter_content));

    assert_eq!(reader.load_chapter(0).await.unwrap(), view.current_chapter_content);
    let err = reader.load_chapter(1).await.unwrap_err();
    assert!(matches!(*err, ErrorKind::ChapterOutOfRange { index: 1, count: 1 }));
}

#[tokio::test]
async fn test_structureless_prefix_from_source() {
    let stores = Stores::new().await;
    let text = "没有章节。".repeat(100);
    let reader = &mut stores.reader(ReaderOptions { prefix_cap_bytes: 64 });
    reader.ingest(source("notes.txt", &text)).await.unwrap();
    stores.content.close().await;

    let prefix = reader.load_chapter(0).await.unwrap();
    assert!(!prefix.is_empty());
    assert!(prefix.len() <= 64);
    assert!(text.starts_with(&prefix));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_new_document_supersedes_previous() {
    let stores = Stores::new().await;
    let repo = Repository::from(&stores.content);
    let reader = &mut stores.reader(ReaderOptions::default());
    let first = source("novel.txt", NOVEL);
    let second = source("sequel.txt", SEQUEL);
    let (first_id, second_id) = (first.identity().await.unwrap(), second.identity().await.unwrap());

    reader.ingest(first).await.unwrap();
    reader.load_chapter(2).await.unwrap();
    reader.ingest(second).await.unwrap();

    assert!(!repo.exists(&first_id).await.unwrap());
    assert!(repo.exists(&second_id).await.unwrap());
    let view = reader.view();
    assert_eq!(view.current_chapter_index, 0);
    assert_eq!(view.current_chapter_content, "第一章 重逢\n又见面了\n");
    let state = StateStore::from(&stores.state);
    assert_eq!(state.file_id().await.unwrap(), Some(second_id));
    assert_eq!(state.chapter_index().await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_reingesting_same_document_keeps_record() {
    let stores = Stores::new().await;
    let repo = Repository::from(&stores.content);
    let reader = &mut stores.reader(ReaderOptions::default());
    reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
    reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
    let file_id = source("novel.txt", NOVEL).identity().await.unwrap();
    assert!(repo.exists(&file_id).await.unwrap());
}

#[tokio::test]
async fn test_failed_ingest_keeps_previous_document() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
    reader.load_chapter(1).await.unwrap();
    let before = reader.view();

    let nowhere = SourceRef::new(Arc::new(MemoryBackend::default()), "gone.txt");
    let err = reader.ingest(nowhere).await.unwrap_err();
    assert!(matches!(*err, ErrorKind::Source));
    assert_eq!(reader.view(), before);
    assert!(reader.next_chapter().await.unwrap().is_some());
}

#[tokio::test]
async fn test_restore_from_cache() {
    let stores = Stores::new().await;
    {
        let reader = &mut stores.reader(ReaderOptions::default());
        reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
        reader.load_chapter(1).await.unwrap();
    }

    let reader = &mut stores.reader(ReaderOptions::default());
    assert!(reader.restore().await.unwrap());
    let view = reader.view();
    assert_eq!(view.phase, Phase::Ready);
    assert_eq!(view.toc.len(), 3);
    assert_eq!(view.current_chapter_index, 1);
    assert_eq!(view.current_chapter_content, "第二章 详细说明\n这是第二章的内容\n");
}

#[tokio::test]
async fn test_restore_without_content_then_attach() {
    let stores = Stores::new().await;
    {
        let reader = &mut stores.reader(ReaderOptions::default());
        reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
        reader.load_chapter(2).await.unwrap();
    }
    // The content cache is lost; the reading state survives.
    let fresh = Stores { content: Database::connect_in_memory().await.unwrap(), state: stores.state };

    let reader = &mut fresh.reader(ReaderOptions::default());
    assert!(reader.restore().await.unwrap());
    let view = reader.view();
    assert_eq!(view.toc.len(), 3);
    assert_eq!(view.current_chapter_index, 2);
    assert!(view.current_chapter_content.is_empty());
    let err = reader.load_chapter(2).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::MissingSource(_)));

    let err = reader.attach_source(source("sequel.txt", SEQUEL)).await.unwrap_err();
    assert!(matches!(*err, ErrorKind::SourceMismatch));

    reader.attach_source(source("novel.txt", NOVEL)).await.unwrap();
    let view = reader.view();
    assert_eq!(view.current_chapter_index, 2);
    assert!(view.current_chapter_content.starts_with("第三章 结尾"));
    assert!(reader.previous_chapter().await.unwrap().unwrap().starts_with("第二章"));
}

#[tokio::test]
async fn test_restore_with_nothing_saved() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    assert!(!reader.restore().await.unwrap());
    assert_eq!(reader.view(), ReaderView::default());
}

#[tokio::test]
async fn test_attach_without_document() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    let err = reader.attach_source(source("novel.txt", NOVEL)).await.unwrap_err();
    assert!(matches!(*err, ErrorKind::NoDocument));
}

#[tokio::test]
async fn test_clear_forgets_everything() {
    let stores = Stores::new().await;
    let reader = &mut stores.reader(ReaderOptions::default());
    let novel = source("novel.txt", NOVEL);
    let file_id = novel.identity().await.unwrap();
    reader.ingest(novel).await.unwrap();

    reader.clear().await;
    assert_eq!(reader.view(), ReaderView::default());
    assert!(!Repository::from(&stores.content).exists(&file_id).await.unwrap());
    assert_eq!(StateStore::from(&stores.state).file_id().await.unwrap(), None);
    assert!(!reader.restore().await.unwrap());
    assert!(matches!(*reader.load_chapter(0).await.unwrap_err(), ErrorKind::NoDocument));
}

#[tokio::test]
async fn test_open_from_config_and_resume() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config {
        cache: CacheConfig {
            directory: temp_dir.path().join("cache"),
            ..CacheConfig::default()
        },
        ..Config::default()
    };
    {
        let mut reader = Reader::open(&config).await.unwrap();
        reader.ingest(source("novel.txt", NOVEL)).await.unwrap();
        reader.load_chapter(1).await.unwrap();
    }
    assert!(config.cache.content_path().is_file());
    assert!(config.cache.state_path().is_file());

    let mut reader = Reader::open(&config).await.unwrap();
    assert!(reader.restore().await.unwrap());
    assert_eq!(reader.view().current_chapter_index, 1);
    assert!(reader.view().current_chapter_content.starts_with("第二章"));
}

// =============================================================================
// Published view
// =============================================================================

/// A source whose full read waits until released.
struct GatedBackend {
    inner: MemoryBackend,
    gate: Notify,
}

#[async_trait]
impl SourceBackend for GatedBackend {
    fn name(&self) -> &str {
        "gated"
    }

    async fn exists(&self, path: &Path) -> quire_storage::error::Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> quire_storage::error::Result<Vec<u8>> {
        self.gate.notified().await;
        self.inner.read(path).await
    }

    async fn read_head(&self, path: &Path, bytes: usize) -> quire_storage::error::Result<Vec<u8>> {
        self.inner.read_head(path, bytes).await
    }

    async fn read_range(&self, path: &Path, range: Range<u64>) -> quire_storage::error::Result<Vec<u8>> {
        self.inner.read_range(path, range).await
    }

    async fn stat(&self, path: &Path) -> quire_storage::error::Result<FileInfo> {
        self.inner.stat(path).await
    }
}

#[tokio::test]
async fn test_loading_is_observable_during_ingest() {
    let stores = Stores::new().await;
    let backend = Arc::new(GatedBackend {
        inner: MemoryBackend::default()
            .with_file("novel.txt", NOVEL, UtcDateTime::UNIX_EPOCH)
            .unwrap(),
        gate: Notify::new(),
    });
    let reader = &mut stores.reader(ReaderOptions::default());
    let mut views = reader.subscribe();

    let watcher = async {
        let view = views.wait_for(|view| view.is_loading).await.unwrap().clone();
        backend.gate.notify_one();
        view
    };
    let (ingested, during) = tokio::join!(reader.ingest(SourceRef::new(backend.clone(), "novel.txt")), watcher);
    ingested.unwrap();

    assert_eq!(during.phase, Phase::Ingesting);
    let after = reader.view();
    assert_eq!(after.phase, Phase::Ready);
    assert!(!after.is_loading);
    assert_eq!(after.toc.len(), 3);
}
