//! Storage backends of notes.
use crate::errors::NoteStoreError;
use crate::note::{preview_of, Note, NoteID, NotePreview};
use futures::future::BoxFuture;

mod flat_file;
mod sqlite;

pub use flat_file::FlatFileStore;
pub use sqlite::{SQLiteStore, SQLiteStoreBuilder};


pub type BoxedNoteStore = Box<dyn NoteStore>;

/// An abstraction for storage backends.
///
/// A store keeps the metadata of notes (the index) and, separately, the content of each note.
pub trait NoteStore: Send + Sync {
    /// Create a new note without content.
    ///
    /// The storage backend assigns the [`NoteID`] and the creation time.
    fn new_note(&self, title: String) -> BoxFuture<Result<Note, NoteStoreError>>;
    /// Get the metadata of all notes.
    fn list_notes(&self) -> BoxFuture<Result<Vec<Note>, NoteStoreError>>;
    /// Get the metadata of all notes, each with the first `preview_len` bytes of its content.
    ///
    /// Notes without content, or whose content type is unknown, get no preview.
    fn list_notes_with_preview(
        &self,
        preview_len: usize,
    ) -> BoxFuture<Result<Vec<NotePreview>, NoteStoreError>> {
        Box::pin(async move {
            let notes = self.list_notes().await?;
            let mut previews = Vec::with_capacity(notes.len());
            for note in notes {
                let content_preview = if note.content_type.is_known() {
                    let content = self.get_content(&note).await?;
                    (!content.is_empty()).then(|| preview_of(&content, preview_len))
                } else {
                    None
                };
                previews.push(NotePreview {
                    note,
                    content_preview,
                });
            }
            Ok(previews)
        })
    }
    /// Get the metadata of a note.
    ///
    /// Fails with [`NoteStoreError::NoteNotExist`] if there is no such note.
    fn get_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<Note, NoteStoreError>>;
    /// Change the title of a note.
    ///
    /// Stores that track modification time update it as well.
    fn update_note<'a>(
        &'a self,
        id: &'a NoteID,
        title: String,
    ) -> BoxFuture<'a, Result<Note, NoteStoreError>>;
    /// Delete a note together with its content.
    ///
    /// Deleting a note that doesn't exist succeeds and changes nothing.
    fn delete_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<(), NoteStoreError>>;
    /// Read the content of a note.
    ///
    /// A note that was never written to has empty content.
    fn get_content<'a>(&'a self, note: &'a Note) -> BoxFuture<'a, Result<Vec<u8>, NoteStoreError>>;
    /// Replace the content of a note.
    fn set_content<'a>(
        &'a self,
        note: &'a Note,
        content: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), NoteStoreError>>;
}
