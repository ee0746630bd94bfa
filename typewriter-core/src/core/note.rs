use serde::{Deserialize, Serialize};

/// A titled, timestamped document belonging to exactly one section.
///
/// `content` is an opaque markup blob produced by the document editor;
/// storage imposes no structure on it. Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub section_id: String,
    pub title: String,
    pub content: String,
    pub last_edited: i64,
    pub created_at: i64,
}

/// A partial update to a note. Fields left as `None` are not touched.
///
/// Every applied patch refreshes the note's `last_edited` timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NotePatch {
    /// Returns a patch that replaces only the note's content.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    /// Returns a patch that replaces only the note's title.
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    /// True when no field is set. Empty patches are rejected, not applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}
