//! Core persistence library for TypeWriter — a local-first note-taking
//! application that organizes notes into collapsible sections.
//!
//! The primary entry point is [`Database`], which represents the open
//! `notes.db` SQLite store. All durable state lives there; consumers hold
//! only derived copies. Construction is initialization — a [`Database`]
//! (or the [`Storage`] it wraps) only exists once the store has been opened
//! and its schema ensured, so no half-initialized handle is representable.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    database::Database,
    error::{Result, TypewriterError},
    note::{Note, NotePatch},
    section::{Section, SectionPatch, SectionSummary},
    storage::{default_data_dir, default_db_path, Storage, DATA_DIR_NAME, DB_FILE_NAME},
};
