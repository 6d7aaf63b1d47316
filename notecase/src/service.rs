//! Operations on notes, independent of the storage backend.
use crate::errors::NoteStoreError;
use crate::note::{Note, NoteID, NotePreview};
use crate::notestore::BoxedNoteStore;

/// Preview lengths must be strictly between 0 and this.
pub const MAX_PREVIEW_LEN: usize = 100000;

pub struct NoteService {
    store: BoxedNoteStore,
}

impl NoteService {
    pub fn new(store: BoxedNoteStore) -> Self {
        NoteService { store }
    }

    pub async fn create_note(&self, title: String) -> Result<Note, NoteStoreError> {
        self.store.new_note(title).await
    }

    pub async fn list_notes(&self) -> Result<Vec<Note>, NoteStoreError> {
        self.store.list_notes().await
    }

    pub async fn list_notes_with_preview(
        &self,
        preview_len: usize,
    ) -> Result<Vec<NotePreview>, NoteStoreError> {
        if preview_len == 0 || preview_len >= MAX_PREVIEW_LEN {
            return Err(NoteStoreError::ValidationError(format!(
                "preview length must be between 0 and {} exclusive, got {}",
                MAX_PREVIEW_LEN, preview_len
            )));
        }
        self.store.list_notes_with_preview(preview_len).await
    }

    pub async fn get_note(&self, id: &NoteID) -> Result<Note, NoteStoreError> {
        self.store.get_note(id).await
    }

    /// Change the title of a note that was loaded earlier.
    ///
    /// Nothing is written if the title stays the same.
    pub async fn update_note(&self, note: &Note, title: String) -> Result<Note, NoteStoreError> {
        if note.title == title {
            return Ok(note.clone());
        }
        self.store.update_note(&note.id, title).await
    }

    pub async fn delete_note(&self, id: &NoteID) -> Result<(), NoteStoreError> {
        self.store.delete_note(id).await
    }

    pub async fn get_content(&self, note: &Note) -> Result<Vec<u8>, NoteStoreError> {
        check_content_type(note)?;
        self.store.get_content(note).await
    }

    pub async fn set_content(&self, note: &Note, content: Vec<u8>) -> Result<(), NoteStoreError> {
        check_content_type(note)?;
        self.store.set_content(note, content).await
    }
}

fn check_content_type(note: &Note) -> Result<(), NoteStoreError> {
    if note.content_type.is_known() {
        Ok(())
    } else {
        Err(NoteStoreError::UnknownContentType(note.content_type.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contenttype::ContentType;
    use crate::notestore::NoteStore;
    use crate::FlatFileStore;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Counts title updates reaching the wrapped store.
    struct CountingStore {
        inner: FlatFileStore,
        updates: Arc<AtomicUsize>,
    }

    impl NoteStore for CountingStore {
        fn new_note(&self, title: String) -> BoxFuture<Result<Note, NoteStoreError>> {
            self.inner.new_note(title)
        }

        fn list_notes(&self) -> BoxFuture<Result<Vec<Note>, NoteStoreError>> {
            self.inner.list_notes()
        }

        fn get_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<Note, NoteStoreError>> {
            self.inner.get_note(id)
        }

        fn update_note<'a>(
            &'a self,
            id: &'a NoteID,
            title: String,
        ) -> BoxFuture<'a, Result<Note, NoteStoreError>> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.inner.update_note(id, title)
        }

        fn delete_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<(), NoteStoreError>> {
            self.inner.delete_note(id)
        }

        fn get_content<'a>(
            &'a self,
            note: &'a Note,
        ) -> BoxFuture<'a, Result<Vec<u8>, NoteStoreError>> {
            self.inner.get_content(note)
        }

        fn set_content<'a>(
            &'a self,
            note: &'a Note,
            content: Vec<u8>,
        ) -> BoxFuture<'a, Result<(), NoteStoreError>> {
            self.inner.set_content(note, content)
        }
    }

    fn get_service() -> (TempDir, NoteService, Arc<AtomicUsize>) {
        let dir = tempfile::tempdir().unwrap();
        let updates = Arc::new(AtomicUsize::new(0));
        let store = CountingStore {
            inner: FlatFileStore::open(dir.path()).unwrap(),
            updates: updates.clone(),
        };
        (dir, NoteService::new(Box::new(store)), updates)
    }

    #[tokio::test]
    async fn groceries() {
        let (_dir, service, _) = get_service();
        let note = service.create_note("groceries".to_owned()).await.unwrap();
        assert_eq!(note.title, "groceries");
        assert!(service.get_content(&note).await.unwrap().is_empty());
        service
            .set_content(&note, b"eggs\nmilk\n".to_vec())
            .await
            .unwrap();
        assert_eq!(service.get_content(&note).await.unwrap(), b"eggs\nmilk\n");
        service.delete_note(&note.id).await.unwrap();
        assert!(matches!(
            service.get_note(&note.id).await,
            Err(NoteStoreError::NoteNotExist(_))
        ));
    }

    #[tokio::test]
    async fn unchanged_title_is_not_written() {
        let (_dir, service, updates) = get_service();
        let note = service.create_note("Foo".to_owned()).await.unwrap();
        let same = service.update_note(&note, "Foo".to_owned()).await.unwrap();
        assert_eq!(same, note);
        assert_eq!(updates.load(Ordering::SeqCst), 0);
        let changed = service.update_note(&note, "Bar".to_owned()).await.unwrap();
        assert_eq!(changed.title, "Bar");
        assert_eq!(updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn preview_length_bounds() {
        let (_dir, service, _) = get_service();
        let note = service.create_note("a".to_owned()).await.unwrap();
        service.set_content(&note, b"abcdefgh".to_vec()).await.unwrap();
        for len in [0, MAX_PREVIEW_LEN, MAX_PREVIEW_LEN + 1] {
            assert!(matches!(
                service.list_notes_with_preview(len).await,
                Err(NoteStoreError::ValidationError(_))
            ));
        }
        let previews = service.list_notes_with_preview(5).await.unwrap();
        assert_eq!(previews[0].content_preview.as_deref(), Some("abcde..."));
        let previews = service
            .list_notes_with_preview(MAX_PREVIEW_LEN - 1)
            .await
            .unwrap();
        assert_eq!(previews[0].content_preview.as_deref(), Some("abcdefgh"));
    }

    #[tokio::test]
    async fn unknown_content_type_is_rejected() {
        let (_dir, service, _) = get_service();
        let mut note = service.create_note("a".to_owned()).await.unwrap();
        note.content_type = ContentType::Unknown(7);
        assert!(matches!(
            service.get_content(&note).await,
            Err(NoteStoreError::UnknownContentType(7))
        ));
        assert!(matches!(
            service.set_content(&note, b"x".to_vec()).await,
            Err(NoteStoreError::UnknownContentType(7))
        ));
    }
}
