//! Content cache repository.

use exn::ResultExt;
use quire_storage::FileIdentity;
use quire_toc::ChapterSpan;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{CacheRecord, ChapterRow, DocumentRow};

/// Repository for [`CacheRecord`]s, keyed by [`FileIdentity`].
///
/// A record is written as a unit: its document row and all of its chapter
/// rows are replaced in one transaction, so a reader never sees the spans of
/// one ingestion next to the text of another.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the record for `record.file_id`.
    #[instrument(skip_all, fields(file_id = %record.file_id, bytes = record.content.len(), chapters = record.chapters.len()))]
    pub async fn put(&self, record: &CacheRecord) -> Result<()> {
        let document = DocumentRow::try_from(record)?;
        let chapters = record.chapters.iter().map(ChapterRow::try_from).collect::<Result<Vec<_>>>()?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/upsert_document.sql"))
            .bind(&document.file_id)
            .bind(document.content)
            .bind(document.toc)
            .bind(document.cached_at)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/delete_chapters.sql"))
            .bind(&document.file_id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        for chapter in chapters {
            sqlx::query(include_str!("../queries/insert_chapter.sql"))
                .bind(&document.file_id)
                .bind(chapter.idx)
                .bind(chapter.start_offset)
                .bind(chapter.end_offset)
                .bind(chapter.title)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Fetch the complete record, text included.
    pub async fn get(&self, file_id: &FileIdentity) -> Result<Option<CacheRecord>> {
        let document: Option<DocumentRow> = sqlx::query_as(include_str!("../queries/get_document.sql"))
            .bind(file_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let Some(document) = document else {
            return Ok(None);
        };
        let chapters: Vec<ChapterRow> = sqlx::query_as(include_str!("../queries/get_chapters.sql"))
            .bind(file_id.as_str())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        CacheRecord::from_rows(document, chapters).map(Some)
    }

    /// Fetch only the resolved spans of a record (empty if there is none).
    pub async fn chapters(&self, file_id: &FileIdentity) -> Result<Vec<ChapterSpan>> {
        let rows: Vec<ChapterRow> = sqlx::query_as(include_str!("../queries/get_chapters.sql"))
            .bind(file_id.as_str())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ChapterSpan::try_from).collect()
    }

    /// Read the text of one chapter without loading the rest of the document.
    ///
    /// Returns `None` if there is no record or no chapter with that index.
    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn chapter_text(&self, file_id: &FileIdentity, index: usize) -> Result<Option<String>> {
        let index = i64::try_from(index).or_raise(|| ErrorKind::InvalidData("chapter index"))?;
        let text: Option<(Option<Vec<u8>>,)> = sqlx::query_as(include_str!("../queries/get_chapter_text.sql"))
            .bind(file_id.as_str())
            .bind(index)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        text.map(|(bytes,)| {
            String::from_utf8(bytes.unwrap_or_default()).or_raise(|| ErrorKind::InvalidData("chapter text"))
        })
        .transpose()
    }

    pub async fn exists(&self, file_id: &FileIdentity) -> Result<bool> {
        let (exists,): (i64,) = sqlx::query_as(include_str!("../queries/document_exists.sql"))
            .bind(file_id.as_str())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(exists != 0)
    }

    /// Delete a record and its chapters. Returns `false` if there was none.
    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn delete(&self, file_id: &FileIdentity) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_document.sql"))
            .bind(file_id.as_str())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
