use thiserror::Error;

use crate::NoteID;

#[derive(Error, Debug)]
pub enum NoteStoreError {
    #[error("note `{0}` doesn't exist")]
    NoteNotExist(NoteID),
    #[error("`{0}` is not a valid note ID")]
    InvalidNoteID(NoteID),
    #[error("index cannot be parsed: {0}")]
    ParseError(String),
    #[error("invalid request: {0}")]
    ValidationError(String),
    #[error("no note ID left after `{0}`")]
    IDOverflow(NoteID),
    #[error("note has unknown content type `{0}`")]
    UnknownContentType(i64),
    #[error("io error")]
    IOError(#[from] std::io::Error),
    #[error("SQLite error")]
    SQLiteError(#[from] sqlx::Error),
}
