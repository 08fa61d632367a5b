//! In-memory collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use backupsync::destination::{DestinationProvider, DestinationStore};
use backupsync::error::{AuthError, TransportError};
use backupsync::source::SourceInventory;
use backupsync::types::{RemoteEntry, SourceItem};

// ============================================================================
// Source
// ============================================================================

#[derive(Default)]
pub struct FakeSource {
	items: Mutex<Vec<SourceItem>>,
	data: Mutex<HashMap<String, Vec<u8>>>,
	failing: Mutex<BTreeSet<String>>,
	list_error: Mutex<Option<String>>,
	list_delay: Mutex<Option<Duration>>,
	pub downloads: AtomicUsize,
}

impl FakeSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add an archive with `size` bytes of patterned content
	pub fn add(&self, key: &str, name: &str, timestamp: &str, size: usize) {
		self.add_with_data(key, name, timestamp, pattern(size));
	}

	pub fn add_with_data(&self, key: &str, name: &str, timestamp: &str, data: Vec<u8>) {
		self.items.lock().unwrap().push(SourceItem {
			key: key.to_string(),
			name: name.to_string(),
			timestamp: timestamp.to_string(),
		});
		self.data.lock().unwrap().insert(key.to_string(), data);
	}

	pub fn fail_download(&self, key: &str) {
		self.failing.lock().unwrap().insert(key.to_string());
	}

	pub fn fail_list(&self, message: &str) {
		*self.list_error.lock().unwrap() = Some(message.to_string());
	}

	pub fn delay_list(&self, delay: Duration) {
		*self.list_delay.lock().unwrap() = Some(delay);
	}

	pub fn download_count(&self) -> usize {
		self.downloads.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl SourceInventory for FakeSource {
	async fn list(&self) -> Result<Vec<SourceItem>, TransportError> {
		let delay = *self.list_delay.lock().unwrap();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		if let Some(message) = self.list_error.lock().unwrap().clone() {
			return Err(TransportError::Api { status: 502, body: message });
		}
		Ok(self.items.lock().unwrap().clone())
	}

	async fn download(&self, key: &str) -> Result<Vec<u8>, TransportError> {
		self.downloads.fetch_add(1, Ordering::SeqCst);
		if self.failing.lock().unwrap().contains(key) {
			return Err(TransportError::Api { status: 500, body: format!("{} unavailable", key) });
		}
		self.data
			.lock()
			.unwrap()
			.get(key)
			.cloned()
			.ok_or(TransportError::Api { status: 404, body: "no such backup".to_string() })
	}
}

/// Deterministic, position-dependent content so misplaced ranges are caught
pub fn pattern(size: usize) -> Vec<u8> {
	(0..size).map(|i| (i % 251) as u8).collect()
}

// ============================================================================
// Destination
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Upload { path: String, len: usize },
	Start { len: usize },
	Append { session: String, offset: u64, len: usize },
	Finish { session: String, offset: u64, len: usize, path: String },
	List { path: String },
	Delete { path: String },
}

#[derive(Default)]
pub struct FakeDestination {
	calls: Mutex<Vec<Call>>,
	sessions: Mutex<HashMap<String, Vec<u8>>>,
	files: Mutex<BTreeMap<String, Vec<u8>>>,
	entries: Mutex<Vec<RemoteEntry>>,
	clock: AtomicUsize,
	fail_upload_containing: Mutex<Option<String>>,
	fail_list: Mutex<bool>,
	fail_delete: Mutex<Option<String>>,
	call_delay: Mutex<Option<Duration>>,
}

impl FakeDestination {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().unwrap().clone()
	}

	pub fn file(&self, path: &str) -> Option<Vec<u8>> {
		self.files.lock().unwrap().get(path).cloned()
	}

	pub fn entry_paths(&self) -> Vec<String> {
		self.entries.lock().unwrap().iter().map(|e| e.path.clone()).collect()
	}

	/// Pre-existing remote entry with the given modification time
	pub fn seed_entry(&self, path: &str, modified_at: Option<DateTime<Utc>>) {
		self.entries.lock().unwrap().push(RemoteEntry { path: path.to_string(), modified_at });
	}

	pub fn fail_uploads_containing(&self, needle: &str) {
		*self.fail_upload_containing.lock().unwrap() = Some(needle.to_string());
	}

	pub fn fail_listing(&self) {
		*self.fail_list.lock().unwrap() = true;
	}

	pub fn fail_delete_of(&self, path: &str) {
		*self.fail_delete.lock().unwrap() = Some(path.to_string());
	}

	pub fn delay_calls(&self, delay: Duration) {
		*self.call_delay.lock().unwrap() = Some(delay);
	}

	async fn maybe_delay(&self) {
		let delay = *self.call_delay.lock().unwrap();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
	}

	fn check_upload(&self, path: &str) -> Result<(), TransportError> {
		if let Some(needle) = self.fail_upload_containing.lock().unwrap().as_ref() {
			if path.contains(needle.as_str()) {
				return Err(TransportError::Api { status: 507, body: "insufficient_space".into() });
			}
		}
		Ok(())
	}

	fn commit(&self, path: &str, data: Vec<u8>) {
		let tick = self.clock.fetch_add(1, Ordering::SeqCst) as i64;
		let modified_at = Utc.timestamp_opt(1_700_000_000 + tick, 0).single();
		self.files.lock().unwrap().insert(path.to_string(), data);
		let mut entries = self.entries.lock().unwrap();
		entries.retain(|e| e.path != path);
		entries.push(RemoteEntry { path: path.to_string(), modified_at });
	}
}

#[async_trait]
impl DestinationStore for FakeDestination {
	async fn upload(&self, data: &[u8], path: &str) -> Result<(), TransportError> {
		self.maybe_delay().await;
		self.calls.lock().unwrap().push(Call::Upload { path: path.to_string(), len: data.len() });
		self.check_upload(path)?;
		self.commit(path, data.to_vec());
		Ok(())
	}

	async fn session_start(&self, data: &[u8]) -> Result<String, TransportError> {
		self.maybe_delay().await;
		self.calls.lock().unwrap().push(Call::Start { len: data.len() });
		let mut sessions = self.sessions.lock().unwrap();
		let id = format!("session-{}", sessions.len() + 1);
		sessions.insert(id.clone(), data.to_vec());
		Ok(id)
	}

	async fn session_append(
		&self,
		data: &[u8],
		session_id: &str,
		offset: u64,
	) -> Result<(), TransportError> {
		self.maybe_delay().await;
		self.calls.lock().unwrap().push(Call::Append {
			session: session_id.to_string(),
			offset,
			len: data.len(),
		});
		let mut sessions = self.sessions.lock().unwrap();
		let buf = sessions
			.get_mut(session_id)
			.ok_or(TransportError::Api { status: 404, body: "not_found".into() })?;
		if buf.len() as u64 != offset {
			return Err(TransportError::Api { status: 409, body: "incorrect_offset".into() });
		}
		buf.extend_from_slice(data);
		Ok(())
	}

	async fn session_finish(
		&self,
		data: &[u8],
		session_id: &str,
		offset: u64,
		path: &str,
	) -> Result<(), TransportError> {
		self.maybe_delay().await;
		self.calls.lock().unwrap().push(Call::Finish {
			session: session_id.to_string(),
			offset,
			len: data.len(),
			path: path.to_string(),
		});
		self.check_upload(path)?;
		let mut buf = self
			.sessions
			.lock()
			.unwrap()
			.remove(session_id)
			.ok_or(TransportError::Api { status: 404, body: "not_found".into() })?;
		if buf.len() as u64 != offset {
			return Err(TransportError::Api { status: 409, body: "incorrect_offset".into() });
		}
		buf.extend_from_slice(data);
		self.commit(path, buf);
		Ok(())
	}

	async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
		self.maybe_delay().await;
		self.calls.lock().unwrap().push(Call::List { path: path.to_string() });
		if *self.fail_list.lock().unwrap() {
			return Err(TransportError::Api { status: 409, body: "path/not_found".into() });
		}
		Ok(self.entries.lock().unwrap().clone())
	}

	async fn delete(&self, path: &str) -> Result<(), TransportError> {
		self.maybe_delay().await;
		self.calls.lock().unwrap().push(Call::Delete { path: path.to_string() });
		if self.fail_delete.lock().unwrap().as_deref() == Some(path) {
			return Err(TransportError::Api { status: 500, body: "internal".into() });
		}
		self.entries.lock().unwrap().retain(|e| e.path != path);
		self.files.lock().unwrap().remove(path);
		Ok(())
	}
}

// ============================================================================
// Provider
// ============================================================================

pub struct FakeProvider {
	dest: Option<Arc<FakeDestination>>,
	pub connects: AtomicUsize,
}

impl FakeProvider {
	pub fn authorized(dest: Arc<FakeDestination>) -> Self {
		FakeProvider { dest: Some(dest), connects: AtomicUsize::new(0) }
	}

	pub fn unauthorized() -> Self {
		FakeProvider { dest: None, connects: AtomicUsize::new(0) }
	}
}

#[async_trait]
impl DestinationProvider for FakeProvider {
	async fn connect(&self) -> Result<Arc<dyn DestinationStore>, AuthError> {
		self.connects.fetch_add(1, Ordering::SeqCst);
		match &self.dest {
			Some(dest) => Ok(dest.clone() as Arc<dyn DestinationStore>),
			None => Err(AuthError::NotAuthorized),
		}
	}

	async fn is_authorized(&self) -> bool {
		self.dest.is_some()
	}
}

pub fn utc(secs: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(secs, 0).unwrap()
}

// vim: ts=4
