use crate::Note;
use serde::{Deserialize, Serialize};

/// A named, collapsible grouping of notes.
///
/// The `notes` list is not a stored column — it is populated by a join at
/// read time ([`Database::all_data`](crate::Database::all_data)) and is empty
/// on shapes that do not carry nested notes. `is_open` is the persisted
/// collapsed-state flag. Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub name: String,
    pub is_open: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// The row shape returned by [`Database::list_sections`](crate::Database::list_sections):
/// a section annotated with a derived note count, without nested notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub id: String,
    pub name: String,
    pub is_open: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub note_count: usize,
}

/// A partial update to a section. Fields left as `None` are not touched.
///
/// Every applied patch refreshes the section's `updated_at` timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionPatch {
    pub name: Option<String>,
    pub is_open: Option<bool>,
}

impl SectionPatch {
    /// Returns a patch that renames the section.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_open: None,
        }
    }

    /// Returns a patch that sets the collapsed/expanded flag.
    #[must_use]
    pub fn is_open(is_open: bool) -> Self {
        Self {
            name: None,
            is_open: Some(is_open),
        }
    }

    /// True when no field is set. Empty patches are rejected, not applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_open.is_none()
    }
}
