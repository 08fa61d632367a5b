//! State management and persistence
//!
//! Three JSON files live in the state directory, each rewritten whole on
//! every change:
//! - `uploaded.json`: transfer state, `{slug: TransferRecord}`
//! - `tokens.json`: Dropbox OAuth tokens
//! - `last_run.json`: last run time and outcome

use crate::error::StateError;
use crate::logging::*;
use crate::types::{RunHistory, Tokens, TransferState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const UPLOADED_FILE: &str = "uploaded.json";
pub const TOKENS_FILE: &str = "tokens.json";
pub const LAST_RUN_FILE: &str = "last_run.json";

/// A single JSON document on disk
#[derive(Debug, Clone)]
struct JsonFile {
	path: PathBuf,
}

impl JsonFile {
	fn new(path: PathBuf) -> Self {
		JsonFile { path }
	}

	/// Read and parse the file. `Ok(None)` when it does not exist.
	async fn read<T: DeserializeOwned>(&self) -> Result<Option<T>, StateError> {
		let contents = match tokio::fs::read_to_string(&self.path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(StateError::LoadFailed { source: Box::new(e) }),
		};

		serde_json::from_str(&contents).map(Some).map_err(|e| StateError::Corrupted {
			message: format!("{}: {}", self.path.display(), e),
		})
	}

	/// Like `read`, but any failure is logged and treated as absent
	async fn read_or_none<T: DeserializeOwned>(&self) -> Option<T> {
		match self.read().await {
			Ok(value) => value,
			Err(e) => {
				warn!("Ignoring unreadable state file: {}", e);
				None
			}
		}
	}

	/// Replace the file atomically: write a sibling temp file, then rename
	async fn write<T: Serialize>(&self, value: &T) -> Result<(), StateError> {
		let parent = self.path.parent().unwrap_or(Path::new("."));
		tokio::fs::create_dir_all(parent)
			.await
			.map_err(|e| StateError::SaveFailed { source: Box::new(e) })?;

		let json = serde_json::to_string_pretty(value)
			.map_err(|e| StateError::SaveFailed { source: Box::new(e) })?;

		let tmp = self.path.with_extension("json.tmp");
		tokio::fs::write(&tmp, json)
			.await
			.map_err(|e| StateError::SaveFailed { source: Box::new(e) })?;
		tokio::fs::rename(&tmp, &self.path)
			.await
			.map_err(|e| StateError::SaveFailed { source: Box::new(e) })
	}

	async fn remove(&self) -> Result<(), StateError> {
		match tokio::fs::remove_file(&self.path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StateError::SaveFailed { source: Box::new(e) }),
		}
	}
}

/// Durable `slug -> TransferRecord` mapping
#[derive(Debug, Clone)]
pub struct TransferStateStore {
	file: JsonFile,
}

impl TransferStateStore {
	pub fn new(state_dir: &Path) -> Self {
		TransferStateStore { file: JsonFile::new(state_dir.join(UPLOADED_FILE)) }
	}

	/// Load the transfer state. A missing or corrupt file yields an empty map.
	pub async fn load(&self) -> TransferState {
		self.file.read_or_none().await.unwrap_or_default()
	}

	/// Overwrite the persisted transfer state, creating the directory if needed
	pub async fn save(&self, state: &TransferState) -> Result<(), StateError> {
		self.file.write(state).await
	}

	pub fn path(&self) -> &Path {
		&self.file.path
	}
}

/// Dropbox OAuth token storage
#[derive(Debug, Clone)]
pub struct TokenStore {
	file: JsonFile,
}

impl TokenStore {
	pub fn new(state_dir: &Path) -> Self {
		TokenStore { file: JsonFile::new(state_dir.join(TOKENS_FILE)) }
	}

	pub async fn load(&self) -> Option<Tokens> {
		self.file.read_or_none().await
	}

	pub async fn save(&self, tokens: &Tokens) -> Result<(), StateError> {
		self.file.write(tokens).await
	}

	/// Remove stored tokens; no-op when none are stored
	pub async fn clear(&self) -> Result<(), StateError> {
		self.file.remove().await
	}

	/// A refresh token is stored
	pub async fn is_authorized(&self) -> bool {
		self.load()
			.await
			.and_then(|t| t.refresh_token)
			.map(|t| !t.is_empty())
			.unwrap_or(false)
	}
}

/// Last-run tracking storage
#[derive(Debug, Clone)]
pub struct RunHistoryStore {
	file: JsonFile,
}

impl RunHistoryStore {
	pub fn new(state_dir: &Path) -> Self {
		RunHistoryStore { file: JsonFile::new(state_dir.join(LAST_RUN_FILE)) }
	}

	pub async fn load(&self) -> RunHistory {
		self.file.read_or_none().await.unwrap_or_default()
	}

	pub async fn save(&self, history: &RunHistory) -> Result<(), StateError> {
		self.file.write(history).await
	}
}


// vim: ts=4
