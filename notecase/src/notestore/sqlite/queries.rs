use crate::contenttype::ContentType;
use crate::errors::NoteStoreError;
use crate::note::{preview_of, Note, NotePreview};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

pub(super) const SCHEMA: &str = include_str!("schema.sql");

pub(super) fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, NoteStoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| NoteStoreError::ParseError(format!("invalid timestamp `{}`: {}", raw, e)))
}

#[derive(sqlx::FromRow)]
pub(super) struct SQLiteNoteRow {
    id: i64,
    title: String,
    created_on: String,
    updated_on: String,
    content_type_id: i64,
}

impl TryFrom<SQLiteNoteRow> for Note {
    type Error = NoteStoreError;

    fn try_from(row: SQLiteNoteRow) -> Result<Self, Self::Error> {
        Ok(Note {
            id: row.id.into(),
            title: row.title,
            created_on: parse_time(&row.created_on)?,
            updated_on: Some(parse_time(&row.updated_on)?),
            content_type: ContentType::from(row.content_type_id),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct SQLiteNoteRowWithContent {
    #[sqlx(flatten)]
    note: SQLiteNoteRow,
    content: Option<Vec<u8>>,
}

impl SQLiteNoteRowWithContent {
    pub(super) fn into_preview(self, preview_len: usize) -> Result<NotePreview, NoteStoreError> {
        let note = Note::try_from(self.note)?;
        let content_preview = if note.content_type.is_known() {
            self.content
                .filter(|c| !c.is_empty())
                .map(|c| preview_of(&c, preview_len))
        } else {
            None
        };
        Ok(NotePreview {
            note,
            content_preview,
        })
    }
}

pub(super) async fn insert_note(
    pool: &SqlitePool,
    title: &str,
    now: DateTime<Utc>,
) -> Result<i64, NoteStoreError> {
    let now = format_time(now);
    let res = sqlx::query(
        r#"INSERT INTO notes (title, created_on, updated_on, content_type_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(title)
    .bind(&now)
    .bind(&now)
    .bind(ContentType::Structured.id())
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

pub(super) async fn select_note(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<SQLiteNoteRow>, NoteStoreError> {
    let row = sqlx::query_as::<_, SQLiteNoteRow>(
        r#"
        SELECT id, title, created_on, updated_on, content_type_id
        FROM notes
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub(super) async fn select_notes(pool: &SqlitePool) -> Result<Vec<SQLiteNoteRow>, NoteStoreError> {
    let rows = sqlx::query_as::<_, SQLiteNoteRow>(
        r#"
        SELECT id, title, created_on, updated_on, content_type_id
        FROM notes
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub(super) async fn select_notes_with_content(
    pool: &SqlitePool,
) -> Result<Vec<SQLiteNoteRowWithContent>, NoteStoreError> {
    let rows = sqlx::query_as::<_, SQLiteNoteRowWithContent>(
        r#"
        SELECT
            notes.id,
            notes.title,
            notes.created_on,
            notes.updated_on,
            notes.content_type_id,
            notes_content.content
        FROM notes
        LEFT JOIN notes_content ON notes.id = notes_content.note_id
        ORDER BY notes.id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns whether the note exists.
pub(super) async fn update_title(
    pool: &SqlitePool,
    id: i64,
    title: &str,
    now: DateTime<Utc>,
) -> Result<bool, NoteStoreError> {
    let res = sqlx::query(r#"UPDATE notes SET title = ?, updated_on = ? WHERE id = ?"#)
        .bind(title)
        .bind(format_time(now))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub(super) async fn touch_note(
    pool: &SqlitePool,
    id: i64,
    now: DateTime<Utc>,
) -> Result<(), NoteStoreError> {
    sqlx::query(r#"UPDATE notes SET updated_on = ? WHERE id = ?"#)
        .bind(format_time(now))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// The content row goes away through `ON DELETE CASCADE`.
pub(super) async fn delete_note(pool: &SqlitePool, id: i64) -> Result<(), NoteStoreError> {
    sqlx::query(r#"DELETE FROM notes WHERE id = ?"#)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(super) async fn select_content(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<Vec<u8>>, NoteStoreError> {
    let content: Option<Option<Vec<u8>>> =
        sqlx::query_scalar(r#"SELECT content FROM notes_content WHERE note_id = ?"#)
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(content.flatten())
}

pub(super) async fn upsert_content(
    pool: &SqlitePool,
    id: i64,
    content: &[u8],
) -> Result<(), NoteStoreError> {
    sqlx::query(
        r#"
        INSERT INTO notes_content (note_id, content) VALUES (?, ?)
            ON CONFLICT(note_id) DO UPDATE SET content = excluded.content
        "#,
    )
    .bind(id)
    .bind(content)
    .execute(pool)
    .await?;
    Ok(())
}
