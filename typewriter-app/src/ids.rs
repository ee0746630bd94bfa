//! Caller-site id generation for sections and notes.
//!
//! Ids are assigned by the creator, not by storage. The `section-`/`note-`
//! prefixes are a display convention; the random UUID suffix makes collisions
//! under rapid creation a non-concern, unlike wall-clock-derived ids.

use uuid::Uuid;

/// Returns a fresh unique section id, e.g. `section-4f9f…`.
#[must_use]
pub fn section_id() -> String {
    format!("section-{}", Uuid::new_v4())
}

/// Returns a fresh unique note id, e.g. `note-b1d2…`.
#[must_use]
pub fn note_id() -> String {
    format!("note-{}", Uuid::new_v4())
}
