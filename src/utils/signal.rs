//! Signal handling for graceful termination

use crate::logging::*;

/// Resolves once SIGINT or SIGTERM is received.
///
/// If a handler cannot be installed the corresponding signal is ignored and a
/// warning is logged; the process then only stops on the remaining signal.
pub async fn shutdown_signal() {
	#[cfg(unix)]
	{
		use tokio::signal::unix::{signal, SignalKind};

		let mut sigterm = match signal(SignalKind::terminate()) {
			Ok(stream) => Some(stream),
			Err(e) => {
				warn!("Failed to setup SIGTERM handler: {}. Process will not handle SIGTERM gracefully.", e);
				None
			}
		};

		let sigterm_recv = async {
			match sigterm.as_mut() {
				Some(stream) => {
					stream.recv().await;
				}
				None => std::future::pending::<()>().await,
			}
		};

		tokio::select! {
			_ = sigterm_recv => debug!("Received SIGTERM, shutting down..."),
			_ = ctrl_c() => debug!("Received SIGINT, shutting down..."),
		}
	}

	#[cfg(not(unix))]
	{
		ctrl_c().await;
		debug!("Received Ctrl-C, shutting down...");
	}
}

async fn ctrl_c() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		warn!("Failed to setup SIGINT handler: {}. Process will not handle SIGINT gracefully.", e);
		std::future::pending::<()>().await;
	}
}

// vim: ts=4
