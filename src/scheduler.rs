//! Periodic backup scheduling
//!
//! The loop anchors its cadence to its own iterations: it computes the next
//! run, sleeps until then, runs one cycle and repeats. Manual triggers go
//! straight to [`BackupService`] and never move the next scheduled run.

use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::logging::*;
use crate::service::BackupService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
	/// No loop task
	Idle,
	/// Loop task active
	Running,
}

pub struct Scheduler {
	interval_hours: f64,
	task: Mutex<Option<JoinHandle<()>>>,
	next_run: Arc<RwLock<Option<DateTime<Local>>>>,
}

impl Scheduler {
	pub fn new(interval_hours: f64) -> Self {
		Scheduler { interval_hours, task: Mutex::new(None), next_run: Arc::new(RwLock::new(None)) }
	}

	/// Start the loop. Returns false without doing anything when the
	/// interval disables scheduling or the loop is already running.
	pub fn start(&self, service: Arc<BackupService>) -> bool {
		if self.interval_hours.is_nan() || self.interval_hours <= 0.0 {
			info!("Scheduler disabled (interval_hours={})", self.interval_hours);
			return false;
		}
		let interval = match Duration::try_from_secs_f64(self.interval_hours * 3600.0) {
			Ok(interval) => interval,
			Err(e) => {
				warn!("Scheduler disabled, unusable interval {}: {}", self.interval_hours, e);
				return false;
			}
		};

		let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
		if task.as_ref().is_some_and(|t| !t.is_finished()) {
			return false;
		}

		let next_run = self.next_run.clone();
		*task = Some(tokio::spawn(run_loop(interval, service, next_run)));
		info!("Scheduler started with interval {} hours", self.interval_hours);
		true
	}

	/// Cancel the loop and return to `Idle`. A cycle in progress is dropped
	/// at its next await point; nothing is recorded for it.
	pub fn stop(&self) {
		let handle = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
		if let Some(handle) = handle {
			handle.abort();
			*self.next_run.write().unwrap_or_else(|e| e.into_inner()) = None;
			info!("Scheduler stopped");
		}
	}

	pub fn state(&self) -> SchedulerState {
		let task = self.task.lock().unwrap_or_else(|e| e.into_inner());
		match task.as_ref() {
			Some(handle) if !handle.is_finished() => SchedulerState::Running,
			_ => SchedulerState::Idle,
		}
	}

	/// When the loop will next fire; `None` while idle
	pub fn next_run(&self) -> Option<DateTime<Local>> {
		*self.next_run.read().unwrap_or_else(|e| e.into_inner())
	}

	pub fn interval_hours(&self) -> f64 {
		self.interval_hours
	}
}

impl Drop for Scheduler {
	fn drop(&mut self) {
		self.stop();
	}
}

async fn run_loop(
	interval: Duration,
	service: Arc<BackupService>,
	next_run: Arc<RwLock<Option<DateTime<Local>>>>,
) {
	loop {
		let next = chrono::Duration::from_std(interval)
			.ok()
			.and_then(|d| Local::now().checked_add_signed(d));
		*next_run.write().unwrap_or_else(|e| e.into_inner()) = next;
		if let Some(next) = next {
			info!("Next backup scheduled at {}", next.format("%Y-%m-%d %H:%M:%S"));
		}

		tokio::time::sleep(interval).await;

		info!("Scheduled backup starting");
		let outcome = service.run_scheduled().await;
		if outcome.is_success() {
			info!("Scheduled backup completed: {:?}", outcome);
		} else {
			warn!("Scheduled backup finished with errors: {:?}", outcome);
		}
	}
}

// vim: ts=4
