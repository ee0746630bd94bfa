//! In-memory mirror of the section → notes tree for the UI.
//!
//! The mirror is a derived, possibly stale copy — storage always wins on the
//! next fetch. Creates and deletes call the boundary first and touch the
//! local tree only on success, so the mirror never shows an entity that
//! failed to persist. Content edits are the opposite trade: the tree is
//! mutated immediately and the write is deferred behind a per-note debounce
//! timer, collapsing a burst of keystrokes into one statement.

use crate::rpc::{Envelope, Request, RpcServer};
use log::warn;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use typewriter_core::{Note, NotePatch, Result, Section, SectionPatch, TypewriterError};

/// Quiet period after the last keystroke before a note's content is written.
pub const CONTENT_SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// The mirror's view of the request/response boundary.
///
/// One method wide on purpose: the mirror does not care whether calls cross
/// a real process boundary or land on an in-process [`RpcServer`]. Tests
/// substitute recording or failing implementations.
pub trait NotesClient: Send + Sync {
    fn call(&self, request: Request) -> Envelope;
}

impl NotesClient for RpcServer {
    fn call(&self, request: Request) -> Envelope {
        self.handle(request)
    }
}

/// A render-ready copy of the section tree, kept approximately synchronized
/// with storage.
///
/// Content edits arm cancellable save tasks on the ambient tokio runtime, so
/// a `NotesMirror` must live inside one. At most one save task exists per
/// note: arming replaces (aborts) any earlier task for the same id, so only
/// the latest content is ever sent.
pub struct NotesMirror {
    client: Arc<dyn NotesClient>,
    sections: Vec<Section>,
    pending_saves: HashMap<String, JoinHandle<()>>,
    failed_saves: Arc<Mutex<HashSet<String>>>,
    debounce: Duration,
}

impl NotesMirror {
    /// A mirror over `client` with the standard 500 ms content debounce.
    #[must_use]
    pub fn new(client: Arc<dyn NotesClient>) -> Self {
        Self::with_debounce(client, CONTENT_SAVE_DEBOUNCE)
    }

    /// A mirror with a custom debounce window. Tests use short windows.
    #[must_use]
    pub fn with_debounce(client: Arc<dyn NotesClient>, debounce: Duration) -> Self {
        Self {
            client,
            sections: Vec::new(),
            pending_saves: HashMap::new(),
            failed_saves: Arc::new(Mutex::new(HashSet::new())),
            debounce,
        }
    }

    /// The current section tree, in render order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Replaces the tree with the stored state via one `get-all-data` call.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::Remote`] if the call fails; the previous
    /// tree is left untouched so the caller can keep showing its error state
    /// rather than an empty mirror.
    pub fn load(&mut self) -> Result<()> {
        let envelope = self.client.call(Request::GetAllData);
        if !envelope.success {
            return Err(remote_error(envelope, "get-all-data"));
        }
        self.sections = match envelope.data {
            Some(data) => serde_json::from_value(data)?,
            None => Vec::new(),
        };
        Ok(())
    }

    /// Creates a section with a fresh id, returning the id.
    ///
    /// The local tree is extended only after the boundary reports success.
    pub fn add_section(&mut self, name: &str) -> Result<String> {
        let id = crate::ids::section_id();
        let envelope = self.client.call(Request::CreateSection {
            id: id.clone(),
            name: name.to_string(),
        });
        if !envelope.success {
            return Err(remote_error(envelope, "create-section"));
        }

        let now = chrono::Utc::now().timestamp_millis();
        self.sections.push(Section {
            id: id.clone(),
            name: name.to_string(),
            is_open: true,
            created_at: now,
            updated_at: now,
            notes: Vec::new(),
        });
        Ok(id)
    }

    /// Flips a section's collapsed/expanded flag, persisting immediately —
    /// toggles are low-frequency, so no debounce applies.
    pub fn toggle_section(&mut self, section_id: &str) -> Result<()> {
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.id == section_id)
            .ok_or_else(|| TypewriterError::SectionNotFound(section_id.to_string()))?;
        let next = !section.is_open;

        let envelope = self.client.call(Request::UpdateSection {
            id: section_id.to_string(),
            updates: SectionPatch::is_open(next),
        });
        if !envelope.success {
            return Err(remote_error(envelope, "update-section"));
        }

        section.is_open = next;
        Ok(())
    }

    /// Deletes a section and drops it (with its notes) from the local tree,
    /// cancelling any pending saves for those notes.
    pub fn delete_section(&mut self, section_id: &str) -> Result<()> {
        let envelope = self.client.call(Request::DeleteSection {
            id: section_id.to_string(),
        });
        if !envelope.success {
            return Err(remote_error(envelope, "delete-section"));
        }

        if let Some(index) = self.sections.iter().position(|s| s.id == section_id) {
            let removed = self.sections.remove(index);
            for note in &removed.notes {
                self.forget_note(&note.id);
            }
        }
        Ok(())
    }

    /// Creates a note with a fresh id and empty content, returning the id.
    pub fn add_note(&mut self, section_id: &str, title: &str) -> Result<String> {
        let id = crate::ids::note_id();
        let envelope = self.client.call(Request::CreateNote {
            id: id.clone(),
            section_id: section_id.to_string(),
            title: title.to_string(),
            content: String::new(),
        });
        if !envelope.success {
            return Err(remote_error(envelope, "create-note"));
        }

        let now = chrono::Utc::now().timestamp_millis();
        if let Some(section) = self.sections.iter_mut().find(|s| s.id == section_id) {
            // Newest edit sorts first, matching the order the next fetch returns.
            section.notes.insert(
                0,
                Note {
                    id: id.clone(),
                    section_id: section_id.to_string(),
                    title: title.to_string(),
                    content: String::new(),
                    last_edited: now,
                    created_at: now,
                },
            );
        }
        Ok(id)
    }

    /// Applies a content edit optimistically and (re)arms the note's
    /// debounced save.
    ///
    /// Any edit within the debounce window aborts the previous timer, so a
    /// typing burst produces exactly one write carrying the final content.
    /// A failed background save is logged and recorded (see
    /// [`Self::is_unsaved`]), never surfaced as a fault — this covers the
    /// race where the note is deleted out from under a pending write.
    pub fn edit_note_content(&mut self, note_id: &str, content: &str) {
        let Some(note) = self
            .sections
            .iter_mut()
            .flat_map(|s| s.notes.iter_mut())
            .find(|n| n.id == note_id)
        else {
            return;
        };
        note.content = content.to_string();
        note.last_edited = chrono::Utc::now().timestamp_millis();

        let client = Arc::clone(&self.client);
        let failed = Arc::clone(&self.failed_saves);
        let id = note_id.to_string();
        let content = content.to_string();
        let debounce = self.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let envelope = client.call(Request::UpdateNote {
                id: id.clone(),
                updates: NotePatch::content(content),
            });
            let mut failed = failed.lock().expect("failed-save set poisoned");
            if envelope.success {
                failed.remove(&id);
            } else {
                warn!(
                    "debounced save for note {id} failed: {}",
                    envelope.error.as_deref().unwrap_or("unknown error")
                );
                failed.insert(id);
            }
        });
        if let Some(previous) = self.pending_saves.insert(note_id.to_string(), handle) {
            previous.abort();
        }
    }

    /// Deletes a note and drops it from the local tree, cancelling any
    /// pending save for it.
    pub fn delete_note(&mut self, note_id: &str) -> Result<()> {
        let envelope = self.client.call(Request::DeleteNote {
            id: note_id.to_string(),
        });
        if !envelope.success {
            return Err(remote_error(envelope, "delete-note"));
        }

        for section in &mut self.sections {
            section.notes.retain(|n| n.id != note_id);
        }
        self.forget_note(note_id);
        Ok(())
    }

    /// True if the note's most recent background save failed and has not
    /// been retried successfully — the note should be shown as unsaved.
    #[must_use]
    pub fn is_unsaved(&self, note_id: &str) -> bool {
        self.failed_saves
            .lock()
            .expect("failed-save set poisoned")
            .contains(note_id)
    }

    /// Number of debounced saves currently armed or in flight.
    #[must_use]
    pub fn pending_save_count(&mut self) -> usize {
        self.pending_saves.retain(|_, handle| !handle.is_finished());
        self.pending_saves.len()
    }

    fn forget_note(&mut self, note_id: &str) {
        if let Some(handle) = self.pending_saves.remove(note_id) {
            handle.abort();
        }
        self.failed_saves
            .lock()
            .expect("failed-save set poisoned")
            .remove(note_id);
    }
}

fn remote_error(envelope: Envelope, operation: &str) -> TypewriterError {
    TypewriterError::Remote(
        envelope
            .error
            .unwrap_or_else(|| format!("{operation} failed")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcServer;
    use tempfile::TempDir;

    /// An in-process boundary that records every request it serves.
    struct RecordingClient {
        _dir: TempDir,
        server: RpcServer,
        requests: Mutex<Vec<Request>>,
        fail_note_updates: bool,
    }

    impl RecordingClient {
        fn new() -> Arc<Self> {
            Self::build(false)
        }

        fn failing_note_updates() -> Arc<Self> {
            Self::build(true)
        }

        fn build(fail_note_updates: bool) -> Arc<Self> {
            let dir = TempDir::new().unwrap();
            let server = RpcServer::at_path(dir.path().join("notes.db"));
            assert!(server.handle(Request::Initialize { key: None }).success);
            Arc::new(Self {
                _dir: dir,
                server,
                requests: Mutex::new(Vec::new()),
                fail_note_updates,
            })
        }

        fn note_update_contents(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter_map(|r| match r {
                    Request::UpdateNote { updates, .. } => updates.content.clone(),
                    _ => None,
                })
                .collect()
        }

        fn stored_tree(&self) -> Vec<Section> {
            let envelope = self.server.handle(Request::GetAllData);
            serde_json::from_value(envelope.data.unwrap()).unwrap()
        }
    }

    impl NotesClient for RecordingClient {
        fn call(&self, request: Request) -> Envelope {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_note_updates && matches!(request, Request::UpdateNote { .. }) {
                return Envelope::failure("disk full");
            }
            self.server.handle(request)
        }
    }

    fn mirror_over(client: &Arc<RecordingClient>) -> NotesMirror {
        NotesMirror::with_debounce(
            Arc::clone(client) as Arc<dyn NotesClient>,
            Duration::from_millis(30),
        )
    }

    #[tokio::test]
    async fn test_load_populates_tree_from_storage() {
        let client = RecordingClient::new();
        let mut mirror = mirror_over(&client);
        mirror.load().unwrap();
        let section = mirror.add_section("Work").unwrap();
        mirror.add_note(&section, "Todo").unwrap();

        let mut fresh = mirror_over(&client);
        fresh.load().unwrap();
        assert_eq!(fresh.sections().len(), 1);
        assert_eq!(fresh.sections()[0].name, "Work");
        assert_eq!(fresh.sections()[0].notes[0].title, "Todo");
    }

    #[tokio::test]
    async fn test_load_failure_is_an_error_not_an_empty_tree() {
        let dir = TempDir::new().unwrap();
        // Never initialized: every call fails.
        let server = Arc::new(RpcServer::at_path(dir.path().join("notes.db")));
        let mut mirror = NotesMirror::new(server as Arc<dyn NotesClient>);
        assert!(mirror.load().is_err());
        assert!(mirror.sections().is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_leaves_mirror_untouched() {
        let dir = TempDir::new().unwrap();
        let server = Arc::new(RpcServer::at_path(dir.path().join("notes.db")));
        let mut mirror = NotesMirror::new(server as Arc<dyn NotesClient>);
        assert!(mirror.add_section("Work").is_err());
        assert!(mirror.sections().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_persists_immediately() {
        let client = RecordingClient::new();
        let mut mirror = mirror_over(&client);
        let section = mirror.add_section("Work").unwrap();

        mirror.toggle_section(&section).unwrap();
        assert!(!mirror.sections()[0].is_open);
        assert!(!client.stored_tree()[0].is_open);

        mirror.toggle_section(&section).unwrap();
        assert!(client.stored_tree()[0].is_open);
    }

    #[tokio::test]
    async fn test_debounce_collapses_burst_into_one_write() {
        let client = RecordingClient::new();
        let mut mirror = mirror_over(&client);
        let section = mirror.add_section("Work").unwrap();
        let note = mirror.add_note(&section, "Todo").unwrap();

        mirror.edit_note_content(&note, "b");
        tokio::time::sleep(Duration::from_millis(10)).await;
        mirror.edit_note_content(&note, "bu");
        tokio::time::sleep(Duration::from_millis(10)).await;
        mirror.edit_note_content(&note, "buy milk");

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(client.note_update_contents(), ["buy milk"]);
        assert_eq!(client.stored_tree()[0].notes[0].content, "buy milk");
        assert_eq!(mirror.pending_save_count(), 0);
    }

    #[tokio::test]
    async fn test_mirror_shows_edit_before_save_fires() {
        let client = RecordingClient::new();
        let mut mirror = mirror_over(&client);
        let section = mirror.add_section("Work").unwrap();
        let note = mirror.add_note(&section, "Todo").unwrap();

        mirror.edit_note_content(&note, "draft");
        assert_eq!(mirror.sections()[0].notes[0].content, "draft");
        assert!(client.note_update_contents().is_empty());
        assert_eq!(mirror.pending_save_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_note_cancels_pending_save() {
        let client = RecordingClient::new();
        let mut mirror = mirror_over(&client);
        let section = mirror.add_section("Work").unwrap();
        let note = mirror.add_note(&section, "Todo").unwrap();

        mirror.edit_note_content(&note, "doomed");
        mirror.delete_note(&note).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(client.note_update_contents().is_empty());
        assert!(mirror.sections()[0].notes.is_empty());
        assert!(client.stored_tree()[0].notes.is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_marks_note_unsaved_without_rollback() {
        let client = RecordingClient::failing_note_updates();
        let mut mirror = mirror_over(&client);
        let section = mirror.add_section("Work").unwrap();
        let note = mirror.add_note(&section, "Todo").unwrap();

        mirror.edit_note_content(&note, "kept locally");
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(mirror.is_unsaved(&note));
        assert_eq!(mirror.sections()[0].notes[0].content, "kept locally");
    }
}
