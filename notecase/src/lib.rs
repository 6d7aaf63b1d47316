//! Notecase: a small personal notebook with pluggable storage.
pub mod contenttype;
pub mod errors;
pub mod index;
pub mod note;
pub mod notestore;
pub mod service;

pub use contenttype::ContentType;
pub use errors::NoteStoreError;
pub use note::{Note, NoteID, NotePreview};
pub use notestore::{BoxedNoteStore, FlatFileStore, NoteStore, SQLiteStore, SQLiteStoreBuilder};
pub use service::NoteService;
