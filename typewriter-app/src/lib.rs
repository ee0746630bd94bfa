//! Application surface for TypeWriter.
//!
//! This crate is what the window shell embeds: the RPC boundary
//! ([`rpc::RpcServer`]) serving the closed set of named operations the UI
//! process may invoke, and the UI state mirror ([`mirror::NotesMirror`])
//! holding the render-ready tree with optimistic edits and debounced
//! persistence. The windowing toolkit, menus and the rich-text editor live
//! outside this workspace and talk to it only through [`rpc::Request`] /
//! [`rpc::Envelope`] values.

pub mod ids;
pub mod mirror;
pub mod rpc;

// Re-export the core library so the shell depends on one crate.
pub use typewriter_core::*;

#[doc(inline)]
pub use mirror::{NotesClient, NotesMirror, CONTENT_SAVE_DEBOUNCE};
#[doc(inline)]
pub use rpc::{Envelope, Request, RpcServer};
