//! Full backup cycles with fake source and destination

mod common;

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use backupsync::chunking::CHUNK_SIZE;
use backupsync::destination::DestinationStore;
use backupsync::source::SourceInventory;
use backupsync::state::TransferStateStore;
use backupsync::sync::SyncOrchestrator;
use backupsync::error::TransportError;
use backupsync::{BackupError, CycleResult};
use common::{pattern, Call, FakeDestination, FakeSource};

const FOLDER: &str = "/HomeAssistant/Backups";

struct Fixture {
	dir: TempDir,
	source: Arc<FakeSource>,
	dest: Arc<FakeDestination>,
}

impl Fixture {
	fn new() -> Self {
		Fixture {
			dir: TempDir::new().unwrap(),
			source: Arc::new(FakeSource::new()),
			dest: Arc::new(FakeDestination::new()),
		}
	}

	fn store(&self) -> TransferStateStore {
		TransferStateStore::new(self.dir.path())
	}

	fn orchestrator(&self) -> SyncOrchestrator {
		SyncOrchestrator::new(
			self.source.clone() as Arc<dyn SourceInventory>,
			self.dest.clone() as Arc<dyn DestinationStore>,
			self.store(),
		)
	}
}

#[tokio::test]
async fn test_uploads_new_items() {
	let fx = Fixture::new();
	fx.source.add("a1", "Full Backup", "2025-01-01T10:00:00", 100);
	fx.source.add("b2", "Partial", "2025-01-02T10:00:00", 200);

	let result = fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	assert_eq!(result.uploaded, vec!["Full Backup", "Partial"]);
	assert!(result.skipped.is_empty());
	assert!(result.errors.is_empty());

	let path = format!("{}/Full_Backup_2025-01-01T10-00-00.tar", FOLDER);
	assert_eq!(fx.dest.file(&path).unwrap(), pattern(100));

	let state = fx.store().load().await;
	assert_eq!(state.len(), 2);
	assert_eq!(state["a1"].dropbox_path, path);
	assert_eq!(state["a1"].date, "2025-01-01T10:00:00");
	assert_eq!(state["a1"].name, "Full Backup");
	assert!(!state["a1"].uploaded_at.is_empty());
}

#[tokio::test]
async fn test_second_cycle_is_idempotent() {
	let fx = Fixture::new();
	fx.source.add("a1", "one", "t1", 10);
	fx.source.add("b2", "two", "t2", 10);

	fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();
	let downloads = fx.source.download_count();
	let calls = fx.dest.calls().len();

	let result = fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	assert!(result.uploaded.is_empty());
	assert_eq!(result.skipped, vec!["one", "two"]);
	assert_eq!(fx.source.download_count(), downloads, "Known items are never downloaded again");
	assert_eq!(fx.dest.calls().len(), calls);
}

#[tokio::test]
async fn test_partial_failure_continues() {
	let fx = Fixture::new();
	fx.source.add("k1", "item1", "t1", 10);
	fx.source.add("k2", "item2", "t2", 10);
	fx.source.add("k3", "item3", "t3", 10);
	fx.dest.fail_uploads_containing("item2");

	let result = fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	assert_eq!(result.uploaded, vec!["item1", "item3"]);
	assert_eq!(result.errors, vec!["item2: Upload failed: API error 507: insufficient_space"]);

	let state = fx.store().load().await;
	assert!(state.contains_key("k1"));
	assert!(!state.contains_key("k2"), "Failed items stay eligible for the next cycle");
	assert!(state.contains_key("k3"));
}

#[tokio::test]
async fn test_download_failure_is_item_error() {
	let fx = Fixture::new();
	fx.source.add("k1", "item1", "t1", 10);
	fx.source.add("k2", "item2", "t2", 10);
	fx.source.fail_download("k1");

	let result = fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	assert_eq!(result.uploaded, vec!["item2"]);
	assert_eq!(result.errors, vec!["item1: API error 500: k1 unavailable"]);
}

#[tokio::test]
async fn test_failed_item_retried_next_cycle() {
	let fx = Fixture::new();
	fx.source.add("k1", "item1", "t1", 10);
	fx.source.fail_download("k1");
	fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	let fresh = Fixture { dir: fx.dir, source: Arc::new(FakeSource::new()), dest: fx.dest };
	fresh.source.add("k1", "item1", "t1", 10);
	let result = fresh.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	assert_eq!(result.uploaded, vec!["item1"]);
}

#[tokio::test]
async fn test_source_list_failure_is_cycle_error() {
	let fx = Fixture::new();
	fx.source.fail_list("supervisor unavailable");

	let err = fx.orchestrator().run_cycle(FOLDER, 3).await.unwrap_err();

	assert!(matches!(err, BackupError::Transport(_)));
	assert!(fx.dest.calls().is_empty());
}

#[tokio::test]
async fn test_stalled_source_list_times_out() {
	let fx = Fixture::new();
	fx.source.delay_list(Duration::from_secs(3600));

	let orchestrator = fx.orchestrator().with_call_timeout(Duration::from_millis(50));
	let cycle = orchestrator.run_cycle(FOLDER, 3);
	let err = tokio::time::timeout(Duration::from_secs(5), cycle)
		.await
		.expect("cycle hung")
		.unwrap_err();

	assert!(matches!(err, BackupError::Transport(TransportError::Timeout { .. })), "got {:?}", err);
	assert!(fx.dest.calls().is_empty());
}

#[tokio::test]
async fn test_empty_source() {
	let fx = Fixture::new();

	let result = fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	assert_eq!(result, CycleResult::default());
	assert!(fx.dest.calls().is_empty());
}

#[tokio::test]
async fn test_large_item_goes_through_session() {
	let fx = Fixture::new();
	fx.source.add("big", "big", "t", CHUNK_SIZE * 2 + 7);

	fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	let calls = fx.dest.calls();
	assert!(matches!(calls[0], Call::Start { .. }));
	assert!(matches!(calls.last(), Some(Call::Finish { .. })));
	assert_eq!(fx.dest.file(&format!("{}/big_t.tar", FOLDER)).unwrap(), pattern(CHUNK_SIZE * 2 + 7));
}

#[tokio::test]
async fn test_state_saved_after_each_item() {
	let fx = Fixture::new();
	fx.source.add("k1", "item1", "t1", 10);
	fx.source.add("k2", "item2", "t2", 10);
	// Second item fails: the first must already be on disk on its own
	fx.source.fail_download("k2");

	fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	let state = fx.store().load().await;
	assert_eq!(state.keys().collect::<Vec<_>>(), vec!["k1"]);
}

#[tokio::test]
async fn test_retention_runs_after_uploads() {
	let fx = Fixture::new();
	for n in 1..=4 {
		fx.source.add(&format!("k{}", n), &format!("item{}", n), "t", 10);
	}

	let result = fx.orchestrator().run_cycle(FOLDER, 2).await.unwrap();

	assert_eq!(result.uploaded.len(), 4);
	assert!(fx.dest.calls().contains(&Call::List { path: FOLDER.to_string() }));
	assert_eq!(
		fx.dest.entry_paths(),
		vec![format!("{}/item3_t.tar", FOLDER), format!("{}/item4_t.tar", FOLDER)]
	);

	let state = fx.store().load().await;
	assert_eq!(state.keys().collect::<Vec<_>>(), vec!["k3", "k4"]);
}

#[tokio::test]
async fn test_retention_disabled_no_listing() {
	let fx = Fixture::new();
	fx.source.add("k1", "item1", "t", 10);

	fx.orchestrator().run_cycle(FOLDER, 0).await.unwrap();

	assert!(!fx.dest.calls().iter().any(|c| matches!(c, Call::List { .. })));
}

#[tokio::test]
async fn test_retention_runs_even_when_items_fail() {
	let fx = Fixture::new();
	fx.dest.seed_entry(&format!("{}/old.tar", FOLDER), Some(common::utc(1_000)));
	fx.dest.seed_entry(&format!("{}/older.tar", FOLDER), Some(common::utc(500)));
	fx.source.add("k1", "item1", "t", 10);
	fx.source.fail_download("k1");

	let result = fx.orchestrator().run_cycle(FOLDER, 1).await.unwrap();

	assert_eq!(result.errors.len(), 1);
	assert_eq!(fx.dest.entry_paths(), vec![format!("{}/old.tar", FOLDER)]);
}

// vim: ts=4
