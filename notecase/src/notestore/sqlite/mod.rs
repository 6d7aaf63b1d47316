//! SQLite storage of notes
//!
//! Metadata lives in the `notes` table and content in `notes_content`, see `schema.sql`.
use crate::errors::NoteStoreError;
use crate::note::{Note, NoteID, NotePreview};
use crate::NoteStore;
use chrono::Utc;
use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::Path;

mod queries;
use queries::*;

pub struct SQLiteStoreBuilder {
    db_options: SqliteConnectOptions,
}

impl SQLiteStoreBuilder {
    pub fn new(db_options: SqliteConnectOptions) -> Self {
        Self { db_options }
    }

    /// Use the database file at `path`, creating it if needed.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self::new(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
        )
    }

    /// Connect and create the tables if they don't exist yet.
    pub async fn build(self) -> Result<SQLiteStore, NoteStoreError> {
        let db_pool = SqlitePool::connect_with(self.db_options.foreign_keys(true)).await?;
        sqlx::raw_sql(SCHEMA).execute(&db_pool).await?;
        Ok(SQLiteStore { db_pool })
    }
}

pub struct SQLiteStore {
    db_pool: SqlitePool,
}

impl SQLiteStore {
    async fn get_note_by_id(&self, id: &NoteID) -> Result<Note, NoteStoreError> {
        match select_note(&self.db_pool, id.try_to_i64()?).await? {
            Some(row) => Note::try_from(row),
            None => Err(NoteStoreError::NoteNotExist(id.clone())),
        }
    }
}

impl NoteStore for SQLiteStore {
    fn new_note(&self, title: String) -> BoxFuture<Result<Note, NoteStoreError>> {
        Box::pin(async move {
            let id = insert_note(&self.db_pool, &title, Utc::now()).await?;
            self.get_note_by_id(&id.into()).await
        })
    }

    fn list_notes(&self) -> BoxFuture<Result<Vec<Note>, NoteStoreError>> {
        Box::pin(async move {
            select_notes(&self.db_pool)
                .await?
                .into_iter()
                .map(Note::try_from)
                .collect()
        })
    }

    fn list_notes_with_preview(
        &self,
        preview_len: usize,
    ) -> BoxFuture<Result<Vec<NotePreview>, NoteStoreError>> {
        Box::pin(async move {
            select_notes_with_content(&self.db_pool)
                .await?
                .into_iter()
                .map(|row| row.into_preview(preview_len))
                .collect()
        })
    }

    fn get_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<Note, NoteStoreError>> {
        Box::pin(async move { self.get_note_by_id(id).await })
    }

    fn update_note<'a>(
        &'a self,
        id: &'a NoteID,
        title: String,
    ) -> BoxFuture<'a, Result<Note, NoteStoreError>> {
        Box::pin(async move {
            if !update_title(&self.db_pool, id.try_to_i64()?, &title, Utc::now()).await? {
                return Err(NoteStoreError::NoteNotExist(id.clone()));
            }
            self.get_note_by_id(id).await
        })
    }

    fn delete_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<(), NoteStoreError>> {
        Box::pin(async move { delete_note(&self.db_pool, id.try_to_i64()?).await })
    }

    fn get_content<'a>(
        &'a self,
        note: &'a Note,
    ) -> BoxFuture<'a, Result<Vec<u8>, NoteStoreError>> {
        Box::pin(async move {
            let content = select_content(&self.db_pool, note.id.try_to_i64()?).await?;
            Ok(content.unwrap_or_default())
        })
    }

    fn set_content<'a>(
        &'a self,
        note: &'a Note,
        content: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), NoteStoreError>> {
        Box::pin(async move {
            let id = note.id.try_to_i64()?;
            upsert_content(&self.db_pool, id, &content).await?;
            touch_note(&self.db_pool, id, Utc::now()).await
        })
    }
}
