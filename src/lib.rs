//! # backupsync - Home Assistant backups to Dropbox
//!
//! Periodically copies the backup archives listed by the Supervisor API into
//! a Dropbox folder, remembers what was already copied, and keeps at most a
//! configured number of archives in Dropbox.
//!
//! ## Running one cycle
//!
//! ```rust,ignore
//! use backupsync::state::TransferStateStore;
//! use backupsync::sync::SyncOrchestrator;
//!
//! let orchestrator = SyncOrchestrator::new(source, dest, TransferStateStore::new(&state_dir));
//! let result = orchestrator.run_cycle("/HomeAssistant/Backups", 10).await?;
//! println!("uploaded {:?}, skipped {:?}", result.uploaded, result.skipped);
//! ```
//!
//! ## Serving
//!
//! [`service::BackupService`] wraps cycles with a single-flight guard and
//! last-run tracking; [`scheduler::Scheduler`] fires it periodically and
//! [`serve::build_router`] exposes `GET /status` and `POST /trigger`.

pub mod chunking;
pub mod config;
pub mod destination;
pub mod error;
pub mod logging;
pub mod retention;
pub mod scheduler;
pub mod serve;
pub mod service;
pub mod source;
pub mod state;
pub mod sync;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AuthError, BackupError, ConfigError, StateError, TransportError, UploadError};
pub use types::{CycleResult, RunOutcome, SourceItem, TransferRecord, TransferState};

// vim: ts=4
