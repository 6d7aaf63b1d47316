//! Where the content of a note lives.

/// Storage tag of a note's content.
///
/// Stores persist the tag as an integer. Unknown values are kept around
/// so that the metadata of such notes can still be listed, but their content
/// cannot be read or written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Content is kept by the note store itself, next to the metadata.
    #[default]
    Structured,
    Unknown(i64),
}

impl ContentType {
    pub fn id(&self) -> i64 {
        match self {
            ContentType::Structured => 1,
            ContentType::Unknown(id) => *id,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ContentType::Unknown(_))
    }
}

impl From<i64> for ContentType {
    fn from(id: i64) -> ContentType {
        match id {
            1 => ContentType::Structured,
            other => ContentType::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrip() {
        assert_eq!(ContentType::from(1), ContentType::Structured);
        assert_eq!(ContentType::Structured.id(), 1);
        assert_eq!(ContentType::from(7), ContentType::Unknown(7));
        assert!(!ContentType::from(7).is_known());
    }
}
