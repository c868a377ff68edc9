//! Small key/value store for the reading position.

use exn::ResultExt;
use facet_json::{from_str as from_json, to_string as to_json};
use quire_storage::FileIdentity;
use quire_toc::ChapterEntry;
use sqlx::SqlitePool;

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::document::{toc_from_json, toc_to_json};
use crate::models::{SourceLayout, SourceLayoutProxy};

#[derive(Debug, Clone, Copy)]
enum Key {
    Toc,
    ChapterIndex,
    FileId,
    Layout,
}
impl Key {
    fn as_str(self) -> &'static str {
        match self {
            Self::Toc => "toc",
            Self::ChapterIndex => "chapter_index",
            Self::FileId => "file_id",
            Self::Layout => "layout",
        }
    }
}

/// Reading state, each value under an independent key.
///
/// Any value may be missing (never written, or written by an older session
/// that failed halfway); callers treat `None` as "start fresh".
#[derive(Debug, Clone)]
pub struct StateStore {
    pool: SqlitePool,
}
impl From<&Database> for StateStore {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl StateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn get(&self, key: Key) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(include_str!("../queries/get_state.sql"))
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: Key, value: String) -> Result<()> {
        sqlx::query(include_str!("../queries/set_state.sql"))
            .bind(key.as_str())
            .bind(value)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub async fn toc(&self) -> Result<Option<Vec<ChapterEntry>>> {
        self.get(Key::Toc).await?.map(|json| toc_from_json(&json)).transpose()
    }

    pub async fn set_toc(&self, toc: &[ChapterEntry]) -> Result<()> {
        self.set(Key::Toc, toc_to_json(toc)?).await
    }

    pub async fn chapter_index(&self) -> Result<Option<usize>> {
        self.get(Key::ChapterIndex)
            .await?
            .map(|value| value.parse::<usize>().or_raise(|| ErrorKind::InvalidData("chapter index")))
            .transpose()
    }

    pub async fn set_chapter_index(&self, index: usize) -> Result<()> {
        self.set(Key::ChapterIndex, index.to_string()).await
    }

    pub async fn file_id(&self) -> Result<Option<FileIdentity>> {
        self.get(Key::FileId)
            .await?
            .map(|value| FileIdentity::parse(value).or_raise(|| ErrorKind::InvalidData("file id")))
            .transpose()
    }

    pub async fn set_file_id(&self, file_id: &FileIdentity) -> Result<()> {
        self.set(Key::FileId, file_id.to_string()).await
    }

    pub async fn layout(&self) -> Result<Option<SourceLayout>> {
        self.get(Key::Layout)
            .await?
            .map(|json| {
                from_json::<SourceLayoutProxy>(&json)
                    .map(SourceLayout::from)
                    .or_raise(|| ErrorKind::InvalidData("layout"))
            })
            .transpose()
    }

    pub async fn set_layout(&self, layout: &SourceLayout) -> Result<()> {
        let json = to_json(&SourceLayoutProxy::from(layout)).or_raise(|| ErrorKind::InvalidData("layout"))?;
        self.set(Key::Layout, json).await
    }

    /// Forget every value.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query(include_str!("../queries/clear_state.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::UtcDateTime;

    async fn setup() -> (Database, StateStore) {
        let db = Database::connect_in_memory().await.unwrap();
        let state = StateStore::from(&db);
        (db, state)
    }

    #[tokio::test]
    async fn test_empty_state() {
        let (_db, state) = setup().await;
        assert_eq!(state.toc().await.unwrap(), None);
        assert_eq!(state.chapter_index().await.unwrap(), None);
        assert_eq!(state.file_id().await.unwrap(), None);
        assert_eq!(state.layout().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_values_are_independent() {
        let (_db, state) = setup().await;
        let toc = vec![ChapterEntry::new("第一章", 0), ChapterEntry::new("第二章", 30)];
        state.set_toc(&toc).await.unwrap();
        state.set_chapter_index(1).await.unwrap();
        assert_eq!(state.toc().await.unwrap(), Some(toc));
        assert_eq!(state.chapter_index().await.unwrap(), Some(1));
        assert_eq!(state.file_id().await.unwrap(), None);

        state.set_chapter_index(0).await.unwrap();
        assert_eq!(state.chapter_index().await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_file_id_and_layout() {
        let (_db, state) = setup().await;
        let file_id = FileIdentity::new("novel.txt", 10, UtcDateTime::UNIX_EPOCH);
        let layout = SourceLayout { encoding: "UTF-8".to_string(), bom_len: 0, source_len: 10, text_len: 10 };
        state.set_file_id(&file_id).await.unwrap();
        state.set_layout(&layout).await.unwrap();
        assert_eq!(state.file_id().await.unwrap(), Some(file_id));
        assert_eq!(state.layout().await.unwrap(), Some(layout));
    }

    #[tokio::test]
    async fn test_clear() {
        let (_db, state) = setup().await;
        state.set_chapter_index(3).await.unwrap();
        state.set_toc(&[]).await.unwrap();
        state.clear().await.unwrap();
        assert_eq!(state.chapter_index().await.unwrap(), None);
        assert_eq!(state.toc().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_value() {
        let (db, state) = setup().await;
        sqlx::query("INSERT INTO reader_state (key, value) VALUES ('chapter_index', 'seven')")
            .execute(db.pool())
            .await
            .unwrap();
        let err = state.chapter_index().await.unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidData(_)));
    }
}
