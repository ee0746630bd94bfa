//! Internal domain modules for the TypeWriter core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod database;
pub mod error;
pub mod note;
pub mod section;
pub mod storage;

#[doc(inline)]
pub use database::Database;
#[doc(inline)]
pub use error::{Result, TypewriterError};
#[doc(inline)]
pub use note::{Note, NotePatch};
#[doc(inline)]
pub use section::{Section, SectionPatch, SectionSummary};
#[doc(inline)]
pub use storage::{default_data_dir, default_db_path, Storage, DATA_DIR_NAME, DB_FILE_NAME};
