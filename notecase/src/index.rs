//! The plain-text index of the flat-file store.
//!
//! The index holds the metadata of every note, one field per line:
//!
//! ```text
//! id: 1
//! title: groceries
//! path: /home/me/.notes/note001700000000000.txt
//! created_on: 2024-01-01T12:00:00Z
//!
//! id: 2
//! ...
//! ```
//!
//! `id`, `title` and `path` are required and must appear in that order.
//! `created_on` is optional. Blank lines anywhere between fields and records are ignored.
//! Titles are kept as written after the single space following the colon, other values
//! are trimmed.
use crate::errors::NoteStoreError;
use crate::NoteID;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;
use std::path::PathBuf;

const ID_FIELD: &str = "id";
const TITLE_FIELD: &str = "title";
const PATH_FIELD: &str = "path";
const CREATED_ON_FIELD: &str = "created_on";

/// One note as listed in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub id: NoteID,
    pub title: String,
    /// File holding the content of the note.
    pub path: PathBuf,
    /// Unix epoch if the index doesn't say.
    pub created_on: DateTime<Utc>,
}

fn raw_field_value<'a>(name: &str, line: &'a str) -> Option<&'a str> {
    let value = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}

fn field_value<'a>(name: &str, line: &'a str) -> Option<&'a str> {
    raw_field_value(name, line).map(str::trim)
}

fn expect_field<'a>(
    name: &str,
    line: Option<(usize, &'a str)>,
    after: &str,
    value_of: fn(&str, &'a str) -> Option<&'a str>,
) -> Result<String, NoteStoreError> {
    match line {
        Some((lineno, line)) => value_of(name, line)
            .map(str::to_owned)
            .ok_or_else(|| {
                NoteStoreError::ParseError(format!(
                    "line {}: expected `{}:`, found `{}`",
                    lineno + 1,
                    name,
                    line
                ))
            }),
        None => Err(NoteStoreError::ParseError(format!(
            "index ends before `{}:` of {}",
            name, after
        ))),
    }
}

/// Parse the whole index.
///
/// Either every record parses or an error is returned.
pub fn parse_index(text: &str) -> Result<Vec<IndexRecord>, NoteStoreError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .peekable();
    let mut records = Vec::new();
    while let Some(first) = lines.next() {
        let id = expect_field(ID_FIELD, Some(first), "a record", field_value)?;
        let after = format!("note `{}`", id);
        let title = expect_field(TITLE_FIELD, lines.next(), &after, raw_field_value)?;
        let path = expect_field(PATH_FIELD, lines.next(), &after, field_value)?;
        let created_on = match lines.peek().and_then(|&(_, l)| field_value(CREATED_ON_FIELD, l)) {
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| {
                    NoteStoreError::ParseError(format!(
                        "invalid `{}` of note `{}`: {}",
                        CREATED_ON_FIELD, id, e
                    ))
                })?;
                lines.next();
                parsed.with_timezone(&Utc)
            }
            None => DateTime::<Utc>::default(),
        };
        records.push(IndexRecord {
            id: id.into(),
            title,
            path: path.into(),
            created_on,
        });
    }
    Ok(records)
}

/// Line breaks would split a value over several fields.
///
/// Stores apply this before handing out a title, so that what they return
/// matches what a later parse of the index gives back.
pub fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Render the index in the fixed field order, each record followed by a blank line.
pub fn serialize_index(records: &[IndexRecord]) -> String {
    let mut out = String::new();
    for r in records {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}: {}", ID_FIELD, single_line(r.id.as_ref()));
        let _ = writeln!(out, "{}: {}", TITLE_FIELD, single_line(&r.title));
        let _ = writeln!(
            out,
            "{}: {}",
            PATH_FIELD,
            single_line(&r.path.to_string_lossy())
        );
        let _ = writeln!(
            out,
            "{}: {}",
            CREATED_ON_FIELD,
            r.created_on.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        );
        out.push('\n');
    }
    out
}

/// The numeric value of an ID, with non-numeric IDs counting as zero.
pub(crate) fn numeric_id(id: &NoteID) -> i64 {
    id.as_ref().trim().parse().unwrap_or(0)
}

/// One more than the largest numeric ID in the index.
pub fn next_id(records: &[IndexRecord]) -> Result<NoteID, NoteStoreError> {
    let max = records
        .iter()
        .map(|r| numeric_id(&r.id))
        .max()
        .unwrap_or(0)
        .max(0);
    id_after(max).map(NoteID::from)
}

pub(crate) fn id_after(id: i64) -> Result<i64, NoteStoreError> {
    id.checked_add(1)
        .ok_or_else(|| NoteStoreError::IDOverflow(id.into()))
}

pub fn lookup<'a>(id: &NoteID, records: &'a [IndexRecord]) -> Option<&'a IndexRecord> {
    records.iter().find(|r| &r.id == id)
}

/// Remove the record of a note, returning it if it was there.
pub fn remove(id: &NoteID, records: &mut Vec<IndexRecord>) -> Option<IndexRecord> {
    let pos = records.iter().position(|r| &r.id == id)?;
    Some(records.remove(pos))
}
