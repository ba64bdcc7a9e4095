//! dirman - directory manager library
//!
//! Path-scoped file and folder operations plus a few small automation
//! helpers (relative dates, item comparison, running Python scripts).

pub mod archive;
pub mod compare;
pub mod config;
pub mod dates;
pub mod operations;
pub mod script;

pub use archive::{ArchiveError, ArchiveFormat};
pub use compare::{CompareError, ItemComparer};
pub use config::Config;
pub use dates::{DateError, DateHelper, TimeOffset, TimeUnit};
pub use operations::{CopyOptions, CopyReport, DirError, DirectoryManager, EntrySize};
pub use script::{ScriptError, ScriptOutcome, ScriptRunner};
