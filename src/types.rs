//! Data model shared by the sync engine, the scheduler and the control surface

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One archive already copied to the destination.
///
/// Field names follow the on-disk `uploaded.json` layout; camelCase spellings
/// are accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferRecord {
	/// Display name of the archive at the source
	pub name: String,

	/// Source-defined timestamp, kept verbatim
	pub date: String,

	/// Full destination path the archive was committed to
	#[serde(alias = "dropboxPath")]
	pub dropbox_path: String,

	/// Local ISO-8601 time the upload finished
	#[serde(alias = "uploadedAt")]
	pub uploaded_at: String,
}

/// Every transferred archive, keyed by source key (slug)
pub type TransferState = BTreeMap<String, TransferRecord>;

/// An archive listed by the source inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
	/// Stable opaque identifier, the idempotency key
	pub key: String,

	pub name: String,

	pub timestamp: String,
}

/// An entry directly under a destination folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
	pub path: String,

	/// Server-side modification time; folders and deleted entries have none
	pub modified_at: Option<DateTime<Utc>>,
}

/// Per-cycle summary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CycleResult {
	pub uploaded: Vec<String>,
	pub skipped: Vec<String>,
	pub errors: Vec<String>,
}

/// Result of one guarded run, as reported in `lastResult`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunOutcome {
	/// The cycle ran; individual items may still have failed
	Completed(CycleResult),

	/// The cycle could not run at all
	Failed { error: String },
}

impl RunOutcome {
	pub fn failed(error: impl ToString) -> Self {
		RunOutcome::Failed { error: error.to_string() }
	}

	pub fn is_success(&self) -> bool {
		matches!(self, RunOutcome::Completed(result) if result.errors.is_empty())
	}
}

/// Last-run tracking that survives restarts (`last_run.json`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunHistory {
	pub last_run: Option<DateTime<Local>>,
	pub last_result: Option<RunOutcome>,
}

/// Whether a cycle currently holds the single-flight guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
	Idle,
	Running,
}

/// Body of `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
	pub state: ServiceState,
	pub authorized: bool,
	pub last_run: Option<DateTime<Local>>,
	pub next_run: Option<DateTime<Local>>,
	pub last_result: Option<RunOutcome>,
	pub interval_hours: f64,
}

/// OAuth tokens persisted in `tokens.json`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tokens {
	#[serde(alias = "accessToken")]
	pub access_token: Option<String>,

	#[serde(alias = "refreshToken")]
	pub refresh_token: Option<String>,

	#[serde(alias = "expiresAt")]
	pub expires_at: Option<String>,
}


// vim: ts=4
