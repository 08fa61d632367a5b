//! One backup cycle: enumerate, transfer what is new, enforce retention
//!
//! Items are handled strictly one after another. The transfer state is
//! saved after every successful upload, so a crash mid-cycle loses at most
//! the archive in flight. A failing item is reported and the cycle moves on.

use chrono::Local;
use std::sync::Arc;
use std::time::Duration;

use crate::chunking::{ChunkedUploader, DEFAULT_CALL_TIMEOUT};
use crate::destination::DestinationStore;
use crate::error::BackupError;
use crate::logging::*;
use crate::retention::RetentionEnforcer;
use crate::source::SourceInventory;
use crate::state::TransferStateStore;
use crate::types::{CycleResult, SourceItem, TransferRecord, TransferState};
use crate::utils::with_deadline;

/// Runs backup cycles against one source and one destination
pub struct SyncOrchestrator {
	source: Arc<dyn SourceInventory>,
	dest: Arc<dyn DestinationStore>,
	store: TransferStateStore,
	call_timeout: Duration,
}

impl SyncOrchestrator {
	pub fn new(
		source: Arc<dyn SourceInventory>,
		dest: Arc<dyn DestinationStore>,
		store: TransferStateStore,
	) -> Self {
		SyncOrchestrator { source, dest, store, call_timeout: DEFAULT_CALL_TIMEOUT }
	}

	/// Deadline for each individual source and destination call
	pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
		self.call_timeout = timeout;
		self
	}

	/// Run a full cycle into `destination_folder`, keeping at most
	/// `max_items` archives there (`<= 0` keeps everything).
	///
	/// Only a failure to list the source is returned as an error; every
	/// per-item fault ends up in [`CycleResult::errors`].
	pub async fn run_cycle(
		&self,
		destination_folder: &str,
		max_items: i64,
	) -> Result<CycleResult, BackupError> {
		let mut result = CycleResult::default();
		let mut state = self.store.load().await;

		let items = with_deadline("list backups", self.call_timeout, self.source.list()).await?;
		info!("Found {} backups at the source", items.len());

		let uploader = ChunkedUploader::new(self.dest.clone()).with_call_timeout(self.call_timeout);

		for item in &items {
			if state.contains_key(&item.key) {
				debug!("Skipping {} ({}): already uploaded", item.name, item.key);
				result.skipped.push(item.name.clone());
				continue;
			}

			match self.transfer_item(&uploader, item, destination_folder, &mut state).await {
				Ok(()) => result.uploaded.push(item.name.clone()),
				Err(e) => {
					error!("Failed to backup {}: {}", item.name, e);
					result.errors.push(format!("{}: {}", item.name, e));
				}
			}
		}

		if max_items > 0 {
			RetentionEnforcer::new(self.dest.clone(), self.store.clone())
				.with_call_timeout(self.call_timeout)
				.enforce(destination_folder, max_items, state)
				.await;
		}

		info!(
			"Cycle finished: {} uploaded, {} skipped, {} errors",
			result.uploaded.len(),
			result.skipped.len(),
			result.errors.len()
		);
		Ok(result)
	}

	async fn transfer_item(
		&self,
		uploader: &ChunkedUploader,
		item: &SourceItem,
		destination_folder: &str,
		state: &mut TransferState,
	) -> Result<(), BackupError> {
		info!("Downloading backup: {} ({})", item.name, item.key);
		let data =
			with_deadline("download backup", self.call_timeout, self.source.download(&item.key)).await?;

		let path = destination_path(destination_folder, &item.name, &item.timestamp);
		uploader.upload(&data, &path).await?;

		let record = TransferRecord {
			name: item.name.clone(),
			date: item.timestamp.clone(),
			dropbox_path: path,
			uploaded_at: Local::now().to_rfc3339(),
		};
		state.insert(item.key.clone(), record);

		if let Err(e) = self.store.save(state).await {
			// Not persisted, so not tracked: the next cycle uploads it again.
			state.remove(&item.key);
			return Err(e.into());
		}
		Ok(())
	}
}

/// Compose `{folder}/{name}_{timestamp}.tar` with path separators and spaces
/// in the name and colons in the timestamp made filesystem-safe
pub fn destination_path(folder: &str, name: &str, timestamp: &str) -> String {
	let safe_name = name.replace('/', "_").replace(' ', "_");
	let safe_date = timestamp.replace(':', "-");
	format!("{}/{}_{}.tar", folder.trim_end_matches('/'), safe_name, safe_date)
}


// vim: ts=4
