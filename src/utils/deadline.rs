//! Per-call deadlines for remote collaborators
//!
//! Every source, destination and token call made while a cycle holds the
//! single-flight guard goes through [`with_deadline`], so a peer that stops
//! responding fails the call instead of stalling the guard.

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// Await `call`, failing with [`TransportError::Timeout`] once `limit` elapses
pub async fn with_deadline<T, F>(
	operation: &'static str,
	limit: Duration,
	call: F,
) -> Result<T, TransportError>
where
	F: Future<Output = Result<T, TransportError>>,
{
	match tokio::time::timeout(limit, call).await {
		Ok(result) => result,
		Err(_) => Err(TransportError::Timeout { operation, secs: limit.as_secs() }),
	}
}


// vim: ts=4
