//! Error types for the TypeWriter core library.

use thiserror::Error;

/// All errors that can occur within the TypeWriter core library.
#[derive(Debug, Error)]
pub enum TypewriterError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store could not be created or opened. Unrecoverable for the session.
    #[error("Storage initialization failed: {0}")]
    Init(String),

    /// An operation was invoked before the store was initialized.
    #[error("Database not initialized. Call initialize first.")]
    NotInitialized,

    /// A section ID was targeted by an update that does not exist.
    #[error("Section not found: {0}")]
    SectionNotFound(String),

    /// A note ID was requested that does not exist in the database.
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// A create supplied an ID that already exists.
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// A note create referenced a section that does not exist.
    #[error("No such section: {0}")]
    MissingSection(String),

    /// An update was called with no fields to apply.
    #[error("Update contains no fields")]
    EmptyPatch,

    /// A required field was empty or otherwise unacceptable.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A remote call reported failure through its response envelope.
    #[error("Remote operation failed: {0}")]
    Remote(String),

    /// Data crossing the RPC boundary could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`TypewriterError`].
pub type Result<T> = std::result::Result<T, TypewriterError>;

impl TypewriterError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::Init(_) => "Could not open the notes database".to_string(),
            Self::NotInitialized => "The notes database is not ready yet".to_string(),
            Self::SectionNotFound(_) => "Section no longer exists".to_string(),
            Self::NoteNotFound(_) => "Note no longer exists".to_string(),
            Self::DuplicateId(_) => "An item with this id already exists".to_string(),
            Self::MissingSection(_) => "The section for this note no longer exists".to_string(),
            Self::EmptyPatch => "Nothing to update".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::Remote(msg) => msg.clone(),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_initialized_message_names_initialize() {
        let e = TypewriterError::NotInitialized;
        assert!(e.to_string().contains("initialize"));
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let e = TypewriterError::NoteNotFound("note-123".to_string());
        assert!(!e.user_message().contains("note-123"));
    }
}
