//! The request/response surface exposed to the UI process.
//!
//! Every storage operation crosses this boundary as a named, serializable
//! [`Request`] and comes back as a uniform [`Envelope`]. The boundary does no
//! business logic of its own — field validation lives in the
//! [`Database`] façade — but it is the last line of defense against a storage
//! error crashing the caller: every [`TypewriterError`] is caught here and
//! flattened to `{success: false, error}`.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Mutex;
use typewriter_core::{
    default_db_path, Database, NotePatch, Result, SectionPatch, TypewriterError,
};

/// The closed set of operations the UI may invoke.
///
/// Serializes with an `op` tag in kebab-case and camelCase arguments, e.g.
/// `{"op":"create-note","id":"note-1","sectionId":"section-1","title":"Todo"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Request {
    /// Opens the store, creating file and schema on first run. The optional
    /// key is an inert passthrough on plain SQLite.
    Initialize {
        #[serde(default)]
        key: Option<String>,
    },
    /// Fetches the full section → notes tree. The UI's single startup call.
    GetAllData,
    CreateSection {
        id: String,
        name: String,
    },
    UpdateSection {
        id: String,
        updates: SectionPatch,
    },
    DeleteSection {
        id: String,
    },
    CreateNote {
        id: String,
        section_id: String,
        title: String,
        #[serde(default)]
        content: String,
    },
    UpdateNote {
        id: String,
        updates: NotePatch,
    },
    DeleteNote {
        id: String,
    },
}

/// The uniform response wrapper: `{success, data?, error?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// A bare success with no payload.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    /// A success carrying a payload.
    #[must_use]
    pub fn with_data(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failure carrying a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Serves [`Request`]s against an explicitly owned [`Database`] handle.
///
/// The handle slot starts empty; every operation except
/// [`Request::Initialize`] fails fast with
/// [`TypewriterError::NotInitialized`] until an initialize succeeds. Each
/// call executes to completion before its envelope is produced — there is no
/// streaming and no partial result.
pub struct RpcServer {
    db: Mutex<Option<Database>>,
    db_path: PathBuf,
}

impl RpcServer {
    /// A server backed by the default store location,
    /// `<home>/TypeWriter/notes.db`.
    #[must_use]
    pub fn new() -> Self {
        Self::at_path(default_db_path())
    }

    /// A server backed by the store at `path`.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: Mutex::new(None),
            db_path: path.into(),
        }
    }

    /// Executes one request, flattening any failure into the envelope.
    pub fn handle(&self, request: Request) -> Envelope {
        match self.dispatch(request) {
            Ok(Some(data)) => Envelope::with_data(data),
            Ok(None) => Envelope::ok(),
            Err(e) => {
                warn!("request failed: {e}");
                Envelope::failure(e.to_string())
            }
        }
    }

    /// Executes one request arriving as raw JSON, for transports that ship
    /// bytes. Malformed requests become failure envelopes, never faults.
    pub fn handle_json(&self, raw: &str) -> String {
        let envelope = match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.handle(request),
            Err(e) => Envelope::failure(format!("malformed request: {e}")),
        };
        serde_json::to_string(&envelope).unwrap_or_else(|e| {
            warn!("response serialization failed: {e}");
            r#"{"success":false,"error":"response serialization failed"}"#.to_string()
        })
    }

    /// Releases the database handle. Idempotent, and safe to call when
    /// `initialize` never ran.
    pub fn close(&self) {
        if let Some(db) = self.db.lock().expect("database lock poisoned").take() {
            if let Err(e) = db.close() {
                warn!("error closing note store: {e}");
            }
        }
    }

    fn dispatch(&self, request: Request) -> Result<Option<Value>> {
        let mut guard = self.db.lock().expect("database lock poisoned");

        match request {
            Request::Initialize { key } => {
                // Drop any prior handle first so a failed re-initialize
                // leaves no stale handle behind.
                guard.take();
                *guard = Some(Database::open(&self.db_path, key.as_deref())?);
                Ok(None)
            }
            Request::GetAllData => {
                Ok(Some(serde_json::to_value(require_db(&guard)?.all_data()?)?))
            }
            Request::CreateSection { id, name } => {
                require_db(&guard)?.create_section(&id, &name)?;
                Ok(None)
            }
            Request::UpdateSection { id, updates } => {
                require_db(&guard)?.update_section(&id, &updates)?;
                Ok(None)
            }
            Request::DeleteSection { id } => {
                require_db(&guard)?.delete_section(&id)?;
                Ok(None)
            }
            Request::CreateNote {
                id,
                section_id,
                title,
                content,
            } => {
                require_db(&guard)?.create_note(&id, &section_id, &title, &content)?;
                Ok(None)
            }
            Request::UpdateNote { id, updates } => {
                require_db(&guard)?.update_note(&id, &updates)?;
                Ok(None)
            }
            Request::DeleteNote { id } => {
                require_db(&guard)?.delete_note(&id)?;
                Ok(None)
            }
        }
    }
}

impl Default for RpcServer {
    fn default() -> Self {
        Self::new()
    }
}

/// The database handle, or [`TypewriterError::NotInitialized`] when no
/// `initialize` has succeeded yet.
fn require_db(db: &Option<Database>) -> Result<&Database> {
    db.as_ref().ok_or(TypewriterError::NotInitialized)
}
