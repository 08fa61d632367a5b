//! Backup service: the context shared by the schedule loop and the control
//! surface
//!
//! [`BackupService`] owns the single-flight guard, the credential check and
//! the last-run tracking. Every cycle, scheduled or manual, goes through it.

use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::chunking::DEFAULT_CALL_TIMEOUT;
use crate::destination::DestinationProvider;
use crate::error::{AuthError, BackupError, TransportError};
use crate::logging::*;
use crate::scheduler::Scheduler;
use crate::source::SourceInventory;
use crate::state::{RunHistoryStore, TransferStateStore};
use crate::sync::SyncOrchestrator;
use crate::types::{CycleResult, RunHistory, RunOutcome, ServiceState, StatusReport};

/// Where and how much to back up
#[derive(Debug, Clone)]
pub struct ServiceSettings {
	/// Destination folder
	pub backup_path: String,

	/// Retention cap; `<= 0` keeps everything
	pub max_backups: i64,

	/// Deadline for each remote call made during a cycle
	pub call_timeout: Duration,
}

impl Default for ServiceSettings {
	fn default() -> Self {
		ServiceSettings {
			backup_path: "/HomeAssistant/Backups".to_string(),
			max_backups: 10,
			call_timeout: DEFAULT_CALL_TIMEOUT,
		}
	}
}

pub struct BackupService {
	source: Arc<dyn SourceInventory>,
	provider: Arc<dyn DestinationProvider>,
	store: TransferStateStore,
	history_store: RunHistoryStore,
	history: RwLock<RunHistory>,
	guard: Mutex<()>,
	settings: ServiceSettings,
}

impl BackupService {
	/// Build the service, restoring last-run tracking from `state_dir`
	pub async fn new(
		source: Arc<dyn SourceInventory>,
		provider: Arc<dyn DestinationProvider>,
		state_dir: &Path,
		settings: ServiceSettings,
	) -> Self {
		let history_store = RunHistoryStore::new(state_dir);
		let history = history_store.load().await;

		BackupService {
			source,
			provider,
			store: TransferStateStore::new(state_dir),
			history_store,
			history: RwLock::new(history),
			guard: Mutex::new(()),
			settings,
		}
	}

	/// Run a cycle for the schedule loop, waiting for any running cycle first
	pub async fn run_scheduled(&self) -> RunOutcome {
		let _running = self.guard.lock().await;
		self.run_and_record().await
	}

	/// Run a manual cycle. Fails with [`BackupError::Busy`] instead of
	/// waiting when another cycle is in progress.
	pub async fn trigger(&self) -> Result<RunOutcome, BackupError> {
		let _running = self.guard.try_lock().map_err(|_| BackupError::Busy)?;
		Ok(self.run_and_record().await)
	}

	async fn run_and_record(&self) -> RunOutcome {
		let outcome = match self.run_cycle().await {
			Ok(result) => RunOutcome::Completed(result),
			Err(BackupError::Auth(AuthError::NotAuthorized | AuthError::Rejected { .. })) => {
				warn!("Skipping backup: not authorized with Dropbox");
				RunOutcome::failed(AuthError::NotAuthorized)
			}
			Err(e) => {
				error!("Backup failed: {}", e);
				RunOutcome::failed(e)
			}
		};

		let mut history = self.history.write().await;
		history.last_run = Some(Local::now());
		history.last_result = Some(outcome.clone());
		if let Err(e) = self.history_store.save(&history).await {
			warn!("Failed to save last run: {}", e);
		}

		outcome
	}

	async fn run_cycle(&self) -> Result<CycleResult, BackupError> {
		let dest = tokio::time::timeout(self.settings.call_timeout, self.provider.connect())
			.await
			.map_err(|_| AuthError::Transport(TransportError::Timeout {
				operation: "connect destination",
				secs: self.settings.call_timeout.as_secs(),
			}))??;
		SyncOrchestrator::new(self.source.clone(), dest, self.store.clone())
			.with_call_timeout(self.settings.call_timeout)
			.run_cycle(&self.settings.backup_path, self.settings.max_backups)
			.await
	}

	/// `Running` while a cycle holds the guard
	pub fn state(&self) -> ServiceState {
		match self.guard.try_lock() {
			Ok(_) => ServiceState::Idle,
			Err(_) => ServiceState::Running,
		}
	}

	pub async fn history(&self) -> RunHistory {
		self.history.read().await.clone()
	}

	pub async fn is_authorized(&self) -> bool {
		self.provider.is_authorized().await
	}

	pub fn settings(&self) -> &ServiceSettings {
		&self.settings
	}

	pub fn transfer_store(&self) -> &TransferStateStore {
		&self.store
	}
}

/// Everything the HTTP layer, the stdin reader and `main` need, passed
/// explicitly instead of living in globals
#[derive(Clone)]
pub struct AppContext {
	pub service: Arc<BackupService>,
	pub scheduler: Arc<Scheduler>,
}

impl AppContext {
	pub fn new(service: Arc<BackupService>, scheduler: Arc<Scheduler>) -> Self {
		AppContext { service, scheduler }
	}

	pub async fn status(&self) -> StatusReport {
		let history = self.service.history().await;
		StatusReport {
			state: self.service.state(),
			authorized: self.service.is_authorized().await,
			last_run: history.last_run,
			next_run: self.scheduler.next_run(),
			last_result: history.last_result,
			interval_hours: self.scheduler.interval_hours(),
		}
	}
}

// vim: ts=4
