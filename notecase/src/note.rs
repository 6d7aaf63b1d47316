//! Core types of Notecase.
use crate::contenttype::ContentType;
use crate::errors::NoteStoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// ID of notes.
///
/// In a given note store ([`crate::notestore`]), [`NoteID`] uniquely identifies a note.
/// The flat-file store accepts any string, while the SQLite store only hands out
/// (and only understands) integers.
///
/// On the wire, an ID in canonical integer form is a JSON number, anything else a string.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Hash)]
#[serde(into = "WireID", from = "WireID")]
pub struct NoteID {
    id: String,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireID {
    Integer(i64),
    Text(String),
}

impl From<NoteID> for WireID {
    fn from(id: NoteID) -> WireID {
        match id.id.parse::<i64>() {
            Ok(n) if n.to_string() == id.id => WireID::Integer(n),
            _ => WireID::Text(id.id),
        }
    }
}

impl From<WireID> for NoteID {
    fn from(id: WireID) -> NoteID {
        match id {
            WireID::Integer(n) => n.into(),
            WireID::Text(s) => s.into(),
        }
    }
}

impl From<NoteID> for String {
    fn from(id: NoteID) -> String {
        id.id
    }
}

impl From<String> for NoteID {
    fn from(id: String) -> NoteID {
        NoteID::new(id)
    }
}

impl From<&str> for NoteID {
    fn from(id: &str) -> NoteID {
        NoteID::new(id.to_owned())
    }
}

impl From<i64> for NoteID {
    fn from(id: i64) -> NoteID {
        NoteID::new(id.to_string())
    }
}

impl NoteID {
    pub fn new(id: String) -> Self {
        NoteID { id }
    }

    /// Interpret the ID as an integer, as used by the SQLite store.
    pub fn try_to_i64(&self) -> Result<i64, NoteStoreError> {
        self.id
            .trim()
            .parse()
            .map_err(|_| NoteStoreError::InvalidNoteID(self.clone()))
    }
}

impl Display for NoteID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl AsRef<str> for NoteID {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

/// Metadata of a note, as handed out by every store.
///
/// The content lives separately and is fetched with
/// [`NoteStore::get_content`](crate::NoteStore::get_content).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteID,
    pub title: String,
    pub created_on: DateTime<Utc>,
    /// Only tracked by the SQLite store.
    pub updated_on: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub content_type: ContentType,
}

/// A note listed together with the beginning of its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotePreview {
    #[serde(flatten)]
    pub note: Note,
    pub content_preview: Option<String>,
}

/// Marker appended to previews whose content was cut short.
pub const PREVIEW_ELLIPSIS: &str = "...";

/// Build the preview of some content.
///
/// Content longer than `max_len` bytes is cut at `max_len` bytes and gets
/// [`PREVIEW_ELLIPSIS`] appended. A cut in the middle of a UTF-8 sequence is
/// replaced lossily.
pub fn preview_of(content: &[u8], max_len: usize) -> String {
    if content.len() > max_len {
        let mut preview = String::from_utf8_lossy(&content[..max_len]).into_owned();
        preview.push_str(PREVIEW_ELLIPSIS);
        preview
    } else {
        String::from_utf8_lossy(content).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates() {
        assert_eq!(preview_of(b"abcdefgh", 5), "abcde...");
    }

    #[test]
    fn preview_short_content() {
        assert_eq!(preview_of(b"abcde", 5), "abcde");
        assert_eq!(preview_of(b"", 5), "");
    }

    #[test]
    fn integer_id() {
        assert_eq!(NoteID::from("42").try_to_i64().unwrap(), 42);
        assert!(matches!(
            NoteID::from("forty-two").try_to_i64(),
            Err(NoteStoreError::InvalidNoteID(_))
        ));
    }

    #[test]
    fn serialize_note_without_content_type() {
        let note = Note {
            id: 3.into(),
            title: "groceries".to_owned(),
            created_on: DateTime::from_timestamp(0, 0).unwrap(),
            updated_on: None,
            content_type: ContentType::Structured,
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["title"], "groceries");
        assert!(json["updated_on"].is_null());
        assert!(json.get("content_type").is_none());
    }

    #[test]
    fn id_wire_form() {
        let cases = [
            (NoteID::from(7), serde_json::json!(7)),
            (NoteID::from("-12"), serde_json::json!(-12)),
            (NoteID::from("007"), serde_json::json!("007")),
            (NoteID::from("abc"), serde_json::json!("abc")),
        ];
        for (id, json) in cases {
            assert_eq!(serde_json::to_value(&id).unwrap(), json);
            assert_eq!(serde_json::from_value::<NoteID>(json).unwrap(), id);
        }
    }
}
