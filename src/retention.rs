//! Retention: cap the number of archives kept at the destination

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::chunking::DEFAULT_CALL_TIMEOUT;
use crate::destination::DestinationStore;
use crate::logging::*;
use crate::state::TransferStateStore;
use crate::types::{RemoteEntry, TransferState};
use crate::utils::with_deadline;

/// Deletes the oldest destination entries beyond a cap and drops the
/// matching transfer records
pub struct RetentionEnforcer {
	dest: Arc<dyn DestinationStore>,
	store: TransferStateStore,
	call_timeout: Duration,
}

impl RetentionEnforcer {
	pub fn new(dest: Arc<dyn DestinationStore>, store: TransferStateStore) -> Self {
		RetentionEnforcer { dest, store, call_timeout: DEFAULT_CALL_TIMEOUT }
	}

	/// Deadline for each listing or deletion call
	pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
		self.call_timeout = timeout;
		self
	}

	/// Keep at most `max_items` entries directly under `folder`.
	///
	/// `max_items <= 0` disables retention. Listing or deletion faults are
	/// logged and end the pass early; they are never returned. The state is
	/// persisted once after the pass, including any deletions made before a
	/// fault.
	pub async fn enforce(&self, folder: &str, max_items: i64, mut state: TransferState) -> TransferState {
		if max_items <= 0 {
			return state;
		}
		let max_items = usize::try_from(max_items).unwrap_or(usize::MAX);

		let listing = with_deadline("files/list_folder", self.call_timeout, self.dest.list_folder(folder));
		let mut entries = match listing.await {
			Ok(entries) => entries,
			Err(e) => {
				error!("Retention check failed: {}", e);
				return state;
			}
		};
		sort_oldest_first(&mut entries);

		let mut queue = VecDeque::from(entries);
		while queue.len() > max_items {
			let Some(oldest) = queue.pop_front() else {
				break;
			};

			info!("Retention: deleting {}", oldest.path);
			let deleted = with_deadline("files/delete_v2", self.call_timeout, self.dest.delete(&oldest.path));
			if let Err(e) = deleted.await {
				error!("Retention check failed: could not delete {}: {}", oldest.path, e);
				break;
			}

			let dropped = forget_path(&mut state, &oldest.path);
			debug!("Retention: dropped {} record(s) for {}", dropped, oldest.path);
		}

		if let Err(e) = self.store.save(&state).await {
			warn!("Failed to save state after retention: {}", e);
		}
		state
	}
}

/// Ascending by modification time; entries without one count as oldest
pub fn sort_oldest_first(entries: &mut [RemoteEntry]) {
	entries.sort_by(|a, b| a.modified_at.cmp(&b.modified_at));
}

/// Remove every record pointing at `path`; returns how many were removed
pub fn forget_path(state: &mut TransferState, path: &str) -> usize {
	let before = state.len();
	state.retain(|_, record| record.dropbox_path != path);
	before - state.len()
}


// vim: ts=4
