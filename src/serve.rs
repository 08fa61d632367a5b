//! Control surface: HTTP status/trigger endpoints and stdin commands

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::future::Future;
use std::io::BufRead;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::error::BackupError;
use crate::logging::*;
use crate::service::{AppContext, BackupService};
use crate::types::{RunOutcome, StatusReport};

async fn status_handler(State(ctx): State<AppContext>) -> Json<StatusReport> {
	Json(ctx.status().await)
}

async fn trigger_handler(State(ctx): State<AppContext>) -> Response {
	match ctx.service.trigger().await {
		Ok(outcome @ RunOutcome::Completed(_)) => {
			Json(json!({ "status": "success", "result": outcome })).into_response()
		}
		Ok(RunOutcome::Failed { error }) => {
			error!("Manual backup failed: {}", error);
			(StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "status": "error", "error": error })))
				.into_response()
		}
		Err(e @ BackupError::Busy) => {
			(StatusCode::CONFLICT, Json(json!({ "status": "error", "error": e.to_string() })))
				.into_response()
		}
		Err(e) => {
			error!("Manual backup failed: {}", e);
			(StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "status": "error", "error": e.to_string() })))
				.into_response()
		}
	}
}

/// Build the HTTP router over the shared context
pub fn build_router(ctx: AppContext) -> Router {
	Router::new()
		.route("/status", get(status_handler))
		.route("/trigger", post(trigger_handler))
		.with_state(ctx)
}

/// Serve the control surface on `listen` until `shutdown` resolves
pub async fn serve_http<F>(ctx: AppContext, listen: &str, shutdown: F) -> std::io::Result<()>
where
	F: Future<Output = ()> + Send + 'static,
{
	let listener = tokio::net::TcpListener::bind(listen).await?;
	info!("Control surface listening on {}", listener.local_addr()?);
	axum::serve(listener, build_router(ctx)).with_graceful_shutdown(shutdown).await
}

async fn handle_command(line: &str, service: &BackupService) {
	match line.trim() {
		"" => {}
		"trigger" => {
			info!("Received 'trigger' command via stdin");
			match service.trigger().await {
				Ok(outcome) => info!("Stdin-triggered backup completed: {:?}", outcome),
				Err(e) => warn!("Stdin-triggered backup not started: {}", e),
			}
		}
		other => warn!("Unknown stdin command: {}", other),
	}
}

/// Dispatch line commands until EOF. `trigger` runs a manual cycle.
pub async fn read_commands<R>(reader: R, service: Arc<BackupService>)
where
	R: AsyncBufRead + Unpin,
{
	let mut lines = reader.lines();
	loop {
		match lines.next_line().await {
			Ok(Some(line)) => handle_command(&line, &service).await,
			Ok(None) => break,
			Err(e) => {
				warn!("Command reader stopped: {}", e);
				break;
			}
		}
	}
}

/// Read commands from the process's stdin.
///
/// Lines are read on a detached OS thread and handed to a runtime task, so
/// an open stdin never keeps the runtime from shutting down. Aborting the
/// returned task stops dispatching; the thread exits on its next line or
/// with the process.
pub fn spawn_stdin_reader(service: Arc<BackupService>) -> tokio::task::JoinHandle<()> {
	let (tx, mut rx) = mpsc::channel::<String>(16);

	let spawned = std::thread::Builder::new().name("stdin-reader".to_string()).spawn(move || {
		for line in std::io::stdin().lock().lines() {
			match line {
				Ok(line) => {
					if tx.blocking_send(line).is_err() {
						break;
					}
				}
				Err(e) => {
					warn!("Command reader stopped: {}", e);
					break;
				}
			}
		}
	});
	if let Err(e) = spawned {
		warn!("Stdin reader not started: {}", e);
	} else {
		info!("Stdin reader started");
	}

	tokio::spawn(async move {
		while let Some(line) = rx.recv().await {
			handle_command(&line, &service).await;
		}
	})
}

// vim: ts=4
