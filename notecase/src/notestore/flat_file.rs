//! Flat-file storage of notes
//!
//! ```text
//! <root>/
//!   index.txt                 # metadata of all notes, see crate::index
//!   note001712345678901.txt   # content of one note
//! ```
//!
//! The index is read and rewritten as a whole on every operation.
use crate::contenttype::ContentType;
use crate::errors::NoteStoreError;
use crate::index::{self, IndexRecord};
use crate::{Note, NoteID, NoteStore};
use chrono::Utc;
use futures::future::BoxFuture;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const INDEX_FILE: &str = "index.txt";

fn note_file_name(millis: i64) -> String {
    format!("note{:015}.txt", millis)
}

impl From<&IndexRecord> for Note {
    fn from(r: &IndexRecord) -> Note {
        Note {
            id: r.id.clone(),
            title: r.title.clone(),
            created_on: r.created_on,
            updated_on: None,
            content_type: ContentType::Structured,
        }
    }
}

/// Synchronous access to the files of a store.
#[derive(Clone)]
struct NoteFiles {
    root: PathBuf,
}

impl NoteFiles {
    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn load_index(&self) -> Result<Vec<IndexRecord>, NoteStoreError> {
        let text = fs::read_to_string(self.index_path())?;
        index::parse_index(&text)
    }

    /// Truncate and rewrite the index.
    ///
    /// Not atomic: a crash in the middle leaves a truncated index behind.
    fn save_index(&self, records: &[IndexRecord]) -> Result<(), NoteStoreError> {
        fs::write(self.index_path(), index::serialize_index(records))?;
        Ok(())
    }

    fn content_path(&self, record: &IndexRecord) -> PathBuf {
        if record.path.is_relative() {
            self.root.join(&record.path)
        } else {
            record.path.clone()
        }
    }

    /// Create an empty file for the content of a new note.
    fn create_note_file(&self) -> Result<PathBuf, NoteStoreError> {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let path = self.root.join(note_file_name(millis));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn find_record(&self, id: &NoteID) -> Result<IndexRecord, NoteStoreError> {
        let records = self.load_index()?;
        index::lookup(id, &records)
            .cloned()
            .ok_or_else(|| NoteStoreError::NoteNotExist(id.clone()))
    }

    /// Returns the new note and its numeric ID.
    fn new_note(&self, title: String, last_id: i64) -> Result<(Note, i64), NoteStoreError> {
        let mut records = self.load_index()?;
        let id = index::numeric_id(&index::next_id(&records)?).max(index::id_after(last_id)?);
        let path = self.create_note_file()?;
        let record = IndexRecord {
            id: id.into(),
            title: index::single_line(&title),
            path,
            created_on: Utc::now(),
        };
        let note = Note::from(&record);
        records.push(record);
        self.save_index(&records)?;
        Ok((note, id))
    }

    fn update_note(&self, id: &NoteID, title: String) -> Result<Note, NoteStoreError> {
        let mut records = self.load_index()?;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| NoteStoreError::NoteNotExist(id.clone()))?;
        record.title = index::single_line(&title);
        let note = Note::from(&*record);
        self.save_index(&records)?;
        Ok(note)
    }

    fn delete_note(&self, id: &NoteID) -> Result<(), NoteStoreError> {
        let mut records = self.load_index()?;
        let record = match index::remove(id, &mut records) {
            Some(r) => r,
            None => return Ok(()),
        };
        match fs::remove_file(self.content_path(&record)) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        self.save_index(&records)
    }

    fn read_content(&self, record: &IndexRecord) -> Result<Vec<u8>, NoteStoreError> {
        match fs::read(self.content_path(record)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_content(&self, id: &NoteID, content: Vec<u8>) -> Result<(), NoteStoreError> {
        let record = self.find_record(id)?;
        fs::write(self.content_path(&record), content)?;
        Ok(())
    }
}

pub struct FlatFileStore {
    files: NoteFiles,
    /// Held for every read-modify-write of the index within this process.
    ///
    /// Guards the largest ID handed out so far, so that IDs of deleted notes are not reused
    /// while the store is open.
    last_id: Mutex<i64>,
}

impl FlatFileStore {
    /// Open the store rooted at a directory, creating the directory and an empty index if
    /// needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, NoteStoreError> {
        let root = root.as_ref().to_path_buf();
        create_private_dir(&root)?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(root.join(INDEX_FILE))?;
        Ok(FlatFileStore {
            files: NoteFiles { root },
            last_id: Mutex::new(0),
        })
    }

    pub fn index_path(&self) -> PathBuf {
        self.files.index_path()
    }

    /// Run file operations on the blocking thread pool.
    async fn with_files<T, F>(&self, f: F) -> Result<T, NoteStoreError>
    where
        F: FnOnce(&NoteFiles) -> Result<T, NoteStoreError> + Send + 'static,
        T: Send + 'static,
    {
        let files = self.files.clone();
        tokio::task::spawn_blocking(move || f(&files))
            .await
            .map_err(|e| NoteStoreError::IOError(std::io::Error::new(ErrorKind::Other, e)))?
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

impl NoteStore for FlatFileStore {
    fn new_note(&self, title: String) -> BoxFuture<Result<Note, NoteStoreError>> {
        Box::pin(async move {
            let mut last_id = self.last_id.lock().await;
            let previous = *last_id;
            let (note, id) = self
                .with_files(move |files| files.new_note(title, previous))
                .await?;
            *last_id = id;
            Ok(note)
        })
    }

    fn list_notes(&self) -> BoxFuture<Result<Vec<Note>, NoteStoreError>> {
        Box::pin(async move {
            let _guard = self.last_id.lock().await;
            self.with_files(|files| Ok(files.load_index()?.iter().map(Note::from).collect()))
                .await
        })
    }

    fn get_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<Note, NoteStoreError>> {
        Box::pin(async move {
            let _guard = self.last_id.lock().await;
            let id = id.clone();
            self.with_files(move |files| Ok(Note::from(&files.find_record(&id)?)))
                .await
        })
    }

    fn update_note<'a>(
        &'a self,
        id: &'a NoteID,
        title: String,
    ) -> BoxFuture<'a, Result<Note, NoteStoreError>> {
        Box::pin(async move {
            let _guard = self.last_id.lock().await;
            let id = id.clone();
            self.with_files(move |files| files.update_note(&id, title))
                .await
        })
    }

    fn delete_note<'a>(&'a self, id: &'a NoteID) -> BoxFuture<'a, Result<(), NoteStoreError>> {
        Box::pin(async move {
            let _guard = self.last_id.lock().await;
            let id = id.clone();
            self.with_files(move |files| files.delete_note(&id)).await
        })
    }

    fn get_content<'a>(
        &'a self,
        note: &'a Note,
    ) -> BoxFuture<'a, Result<Vec<u8>, NoteStoreError>> {
        Box::pin(async move {
            let record = {
                let _guard = self.last_id.lock().await;
                let id = note.id.clone();
                self.with_files(move |files| files.find_record(&id)).await?
            };
            self.with_files(move |files| files.read_content(&record))
                .await
        })
    }

    fn set_content<'a>(
        &'a self,
        note: &'a Note,
        content: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), NoteStoreError>> {
        Box::pin(async move {
            let _guard = self.last_id.lock().await;
            let id = note.id.clone();
            self.with_files(move |files| files.write_content(&id, content))
                .await
        })
    }
}
