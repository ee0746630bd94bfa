//! High-level typed operations over the TypeWriter note store.
//!
//! [`Database`] translates between the storage engine's row shape and the
//! application's semantic shape: boolean coercion for `is_open`, nested note
//! lists, creation-order sections and recency-ordered notes. It is the only
//! module that issues SQL against [`Storage`].

use crate::{
    Note, NotePatch, Result, Section, SectionPatch, SectionSummary, Storage, TypewriterError,
};
use log::debug;
use rusqlite::{ffi, OptionalExtension, ToSql};
use std::path::Path;

/// An open note database: a [`Storage`] handle plus the typed operations
/// the RPC boundary exposes.
///
/// All operations are synchronous and atomic at the single-statement level;
/// the one multi-row mutation, deleting a section together with its notes,
/// is enforced declaratively by the schema's cascade foreign key.
pub struct Database {
    storage: Storage,
}

impl Database {
    /// Opens (or creates) the note database at the default location,
    /// `<home>/TypeWriter/notes.db`.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::Init`] if the store cannot be opened.
    pub fn open_default(key: Option<&str>) -> Result<Self> {
        Ok(Self {
            storage: Storage::open_default(key)?,
        })
    }

    /// Opens (or creates) the note database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::Init`] if the store cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, key: Option<&str>) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(path, key)?,
        })
    }

    /// Closes the underlying store.
    pub fn close(self) -> Result<()> {
        self.storage.close()
    }

    /// Returns all sections in creation order, each annotated with its note
    /// count. Nested notes are not fetched; see [`Self::all_data`].
    pub fn list_sections(&self) -> Result<Vec<SectionSummary>> {
        let mut stmt = self.storage.connection().prepare(
            "SELECT s.id, s.name, s.is_open, s.created_at, s.updated_at,
                    COUNT(n.id) AS note_count
             FROM sections s
             LEFT JOIN notes n ON n.section_id = s.id
             GROUP BY s.id
             ORDER BY s.created_at, s.rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SectionSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    is_open: row.get::<_, i64>(2)? != 0,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                    note_count: row.get::<_, i64>(5)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Inserts a new section with the caller-supplied `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::DuplicateId`] if `id` already exists, or
    /// [`TypewriterError::Validation`] if `name` is blank.
    pub fn create_section(&self, id: &str, name: &str) -> Result<()> {
        require_non_blank(name, "Section name cannot be empty")?;
        let now = now_millis();
        self.storage
            .connection()
            .execute(
                "INSERT INTO sections (id, name, is_open, created_at, updated_at)
                 VALUES (?, ?, 1, ?, ?)",
                rusqlite::params![id, name, now, now],
            )
            .map_err(|e| map_constraint(e, id, None))?;
        debug!("created section {id}");
        Ok(())
    }

    /// Applies the supplied fields of `patch` to the section `id`, always
    /// refreshing `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::EmptyPatch`] if no field is set,
    /// [`TypewriterError::SectionNotFound`] if no row matches `id`, or
    /// [`TypewriterError::Validation`] if the new name is blank.
    pub fn update_section(&self, id: &str, patch: &SectionPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(TypewriterError::EmptyPatch);
        }

        let now = now_millis();
        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<&dyn ToSql> = Vec::new();
        if let Some(name) = &patch.name {
            require_non_blank(name, "Section name cannot be empty")?;
            sets.push("name = ?");
            params.push(name);
        }
        if let Some(is_open) = &patch.is_open {
            sets.push("is_open = ?");
            params.push(is_open);
        }
        sets.push("updated_at = ?");
        params.push(&now);
        params.push(&id);

        let sql = format!("UPDATE sections SET {} WHERE id = ?", sets.join(", "));
        let affected = self.storage.connection().execute(&sql, params.as_slice())?;
        if affected == 0 {
            return Err(TypewriterError::SectionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Deletes the section `id` and, via cascade, all of its notes.
    ///
    /// Deleting a nonexistent section is not an error.
    pub fn delete_section(&self, id: &str) -> Result<()> {
        let affected = self
            .storage
            .connection()
            .execute("DELETE FROM sections WHERE id = ?", [id])?;
        debug!("deleted section {id} (existed: {})", affected > 0);
        Ok(())
    }

    /// Returns the notes of `section_id`, most recently edited first.
    ///
    /// Ties on `last_edited` fall back to insertion recency. An unknown
    /// section yields an empty list.
    pub fn notes_by_section(&self, section_id: &str) -> Result<Vec<Note>> {
        let mut stmt = self.storage.connection().prepare(
            "SELECT id, section_id, title, content, last_edited, created_at
             FROM notes
             WHERE section_id = ?
             ORDER BY last_edited DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map([section_id], map_note_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Fetches a single note by ID.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::NoteNotFound`] if no row matches `id`.
    pub fn get_note(&self, id: &str) -> Result<Note> {
        self.storage
            .connection()
            .query_row(
                "SELECT id, section_id, title, content, last_edited, created_at
                 FROM notes WHERE id = ?",
                [id],
                map_note_row,
            )
            .optional()?
            .ok_or_else(|| TypewriterError::NoteNotFound(id.to_string()))
    }

    /// Inserts a new note with the caller-supplied `id` into `section_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::DuplicateId`] if `id` already exists,
    /// [`TypewriterError::MissingSection`] if `section_id` does not reference
    /// an existing section, or [`TypewriterError::Validation`] if `title`
    /// is blank.
    pub fn create_note(&self, id: &str, section_id: &str, title: &str, content: &str) -> Result<()> {
        require_non_blank(title, "Note title cannot be empty")?;
        let now = now_millis();
        self.storage
            .connection()
            .execute(
                "INSERT INTO notes (id, section_id, title, content, last_edited, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                rusqlite::params![id, section_id, title, content, now, now],
            )
            .map_err(|e| map_constraint(e, id, Some(section_id)))?;
        debug!("created note {id} in section {section_id}");
        Ok(())
    }

    /// Applies the supplied fields of `patch` to the note `id`, always
    /// refreshing `last_edited`.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::EmptyPatch`] if no field is set,
    /// [`TypewriterError::NoteNotFound`] if no row matches `id`, or
    /// [`TypewriterError::Validation`] if the new title is blank.
    pub fn update_note(&self, id: &str, patch: &NotePatch) -> Result<()> {
        if patch.is_empty() {
            return Err(TypewriterError::EmptyPatch);
        }

        let now = now_millis();
        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<&dyn ToSql> = Vec::new();
        if let Some(title) = &patch.title {
            require_non_blank(title, "Note title cannot be empty")?;
            sets.push("title = ?");
            params.push(title);
        }
        if let Some(content) = &patch.content {
            sets.push("content = ?");
            params.push(content);
        }
        sets.push("last_edited = ?");
        params.push(&now);
        params.push(&id);

        let sql = format!("UPDATE notes SET {} WHERE id = ?", sets.join(", "));
        let affected = self.storage.connection().execute(&sql, params.as_slice())?;
        if affected == 0 {
            return Err(TypewriterError::NoteNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Deletes the note `id`. Deleting a nonexistent note is not an error.
    pub fn delete_note(&self, id: &str) -> Result<()> {
        let affected = self
            .storage
            .connection()
            .execute("DELETE FROM notes WHERE id = ?", [id])?;
        debug!("deleted note {id} (existed: {})", affected > 0);
        Ok(())
    }

    /// Returns the full section → notes tree in the shape the UI consumes:
    /// sections in creation order, each with its notes nested most recently
    /// edited first. This is the single call made at startup.
    pub fn all_data(&self) -> Result<Vec<Section>> {
        let mut sections = {
            let mut stmt = self.storage.connection().prepare(
                "SELECT id, name, is_open, created_at, updated_at
                 FROM sections
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Section {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        is_open: row.get::<_, i64>(2)? != 0,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                        notes: Vec::new(),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        for section in &mut sections {
            section.notes = self.notes_by_section(&section.id)?;
        }
        Ok(sections)
    }
}

fn map_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        section_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        last_edited: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Current wall-clock time in unix milliseconds.
fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn require_non_blank(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TypewriterError::Validation(message.to_string()));
    }
    Ok(())
}

/// Maps SQLite constraint violations on insert to the typed errors the
/// façade promises: primary-key collisions become [`TypewriterError::DuplicateId`],
/// foreign-key failures become [`TypewriterError::MissingSection`].
fn map_constraint(e: rusqlite::Error, id: &str, section_id: Option<&str>) -> TypewriterError {
    if let rusqlite::Error::SqliteFailure(f, _) = &e {
        match f.extended_code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                return TypewriterError::DuplicateId(id.to_string());
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                if let Some(section_id) = section_id {
                    return TypewriterError::MissingSection(section_id.to_string());
                }
            }
            _ => {}
        }
    }
    TypewriterError::Database(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("notes.db"), None).unwrap();
        (dir, db)
    }

    // Timestamps are millisecond-granular; force successive operations into
    // distinct instants so ordering assertions are deterministic.
    fn tick() {
        sleep(Duration::from_millis(5));
    }

    #[test]
    fn test_create_and_list_sections() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();
        tick();
        db.create_section("s2", "Home").unwrap();
        db.create_note("n1", "s1", "Todo", "").unwrap();

        let sections = db.list_sections().unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].id, "s1");
        assert_eq!(sections[0].note_count, 1);
        assert_eq!(sections[1].id, "s2");
        assert_eq!(sections[1].note_count, 0);
        assert!(sections[0].is_open);
    }

    #[test]
    fn test_duplicate_section_id_rejected_without_mutation() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();

        let err = db.create_section("s1", "Other").unwrap_err();
        assert!(matches!(err, TypewriterError::DuplicateId(_)));

        let sections = db.list_sections().unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Work");
    }

    #[test]
    fn test_blank_section_name_rejected() {
        let (_dir, db) = open_db();
        let err = db.create_section("s1", "   ").unwrap_err();
        assert!(matches!(err, TypewriterError::Validation(_)));
        assert!(db.list_sections().unwrap().is_empty());
    }

    #[test]
    fn test_update_section_partial_fields() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();
        let before = db.list_sections().unwrap()[0].clone();

        tick();
        db.update_section("s1", &SectionPatch::is_open(false)).unwrap();
        let after = db.list_sections().unwrap()[0].clone();
        assert!(!after.is_open);
        assert_eq!(after.name, "Work");
        assert!(after.updated_at > before.updated_at);

        db.update_section("s1", &SectionPatch::name("Projects")).unwrap();
        let renamed = db.list_sections().unwrap()[0].clone();
        assert_eq!(renamed.name, "Projects");
        assert!(!renamed.is_open);
    }

    #[test]
    fn test_empty_patch_rejected_and_state_unchanged() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();
        let before = db.list_sections().unwrap();

        let err = db.update_section("s1", &SectionPatch::default()).unwrap_err();
        assert!(matches!(err, TypewriterError::EmptyPatch));
        assert_eq!(db.list_sections().unwrap(), before);

        db.create_note("n1", "s1", "Todo", "").unwrap();
        let err = db.update_note("n1", &NotePatch::default()).unwrap_err();
        assert!(matches!(err, TypewriterError::EmptyPatch));
    }

    #[test]
    fn test_update_missing_section_not_found() {
        let (_dir, db) = open_db();
        let err = db
            .update_section("ghost", &SectionPatch::name("x"))
            .unwrap_err();
        assert!(matches!(err, TypewriterError::SectionNotFound(_)));
    }

    #[test]
    fn test_delete_section_cascades_to_notes() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();
        db.create_note("n1", "s1", "One", "").unwrap();
        db.create_note("n2", "s1", "Two", "").unwrap();
        db.create_note("n3", "s1", "Three", "").unwrap();

        db.delete_section("s1").unwrap();

        assert!(db.notes_by_section("s1").unwrap().is_empty());
        for id in ["n1", "n2", "n3"] {
            assert!(matches!(
                db.get_note(id),
                Err(TypewriterError::NoteNotFound(_))
            ));
        }
    }

    #[test]
    fn test_deletes_are_idempotent() {
        let (_dir, db) = open_db();
        db.delete_section("nonexistent").unwrap();
        db.delete_note("nonexistent").unwrap();
    }

    #[test]
    fn test_create_note_requires_existing_section() {
        let (_dir, db) = open_db();
        let err = db.create_note("n1", "ghost", "Todo", "").unwrap_err();
        assert!(matches!(err, TypewriterError::MissingSection(_)));
    }

    #[test]
    fn test_duplicate_note_id_rejected() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();
        db.create_note("n1", "s1", "Todo", "").unwrap();
        let err = db.create_note("n1", "s1", "Again", "").unwrap_err();
        assert!(matches!(err, TypewriterError::DuplicateId(_)));
    }

    #[test]
    fn test_update_note_refreshes_last_edited() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();
        db.create_note("n1", "s1", "Todo", "").unwrap();
        let before = db.get_note("n1").unwrap();

        tick();
        db.update_note("n1", &NotePatch::content("buy milk")).unwrap();
        let after = db.get_note("n1").unwrap();
        assert_eq!(after.content, "buy milk");
        assert_eq!(after.title, "Todo");
        assert!(after.last_edited > before.last_edited);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn test_notes_ordered_by_recency() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();
        db.create_note("n1", "s1", "First", "").unwrap();
        tick();
        db.create_note("n2", "s1", "Second", "").unwrap();

        let ids: Vec<String> = db
            .notes_by_section("s1")
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, ["n2", "n1"]);

        tick();
        db.update_note("n1", &NotePatch::content("touched")).unwrap();
        let ids: Vec<String> = db
            .notes_by_section("s1")
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, ["n1", "n2"]);
    }

    #[test]
    fn test_all_data_builds_nested_tree() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();
        db.create_note("n1", "s1", "Todo", "").unwrap();

        let tree = db.all_data().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "s1");
        assert_eq!(tree[0].name, "Work");
        assert!(tree[0].is_open);
        assert_eq!(tree[0].notes.len(), 1);
        assert_eq!(tree[0].notes[0].id, "n1");
        assert_eq!(tree[0].notes[0].title, "Todo");
        assert_eq!(tree[0].notes[0].content, "");
    }

    #[test]
    fn test_collapsed_flag_survives_round_trip() {
        let (_dir, db) = open_db();
        db.create_section("s1", "Work").unwrap();
        db.update_section("s1", &SectionPatch::is_open(false)).unwrap();
        let tree = db.all_data().unwrap();
        assert!(!tree[0].is_open);
    }
}
