//! Chunked upload of archive payloads to the destination store
//!
//! Payloads up to [`CHUNK_SIZE`] go up in one call. Larger payloads use an
//! upload session: the first chunk opens it, full chunks are appended while
//! more than one chunk remains, and the final (possibly short) chunk commits
//! it. Every commit overwrites, so a retry replaces a half-written object.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::destination::DestinationStore;
use crate::error::{TransportError, UploadError};
use crate::logging::*;
use crate::utils::with_deadline;

/// Upload chunk size (4 MiB)
pub const CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Default deadline for a single destination call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// State of one in-flight session upload
#[derive(Debug)]
struct UploadSession {
	session_id: String,

	/// Bytes of the payload already accepted by the destination
	bytes_sent: usize,
}

/// Streams payloads of any size to a [`DestinationStore`]
pub struct ChunkedUploader {
	dest: Arc<dyn DestinationStore>,
	call_timeout: Duration,
}

impl ChunkedUploader {
	pub fn new(dest: Arc<dyn DestinationStore>) -> Self {
		ChunkedUploader { dest, call_timeout: DEFAULT_CALL_TIMEOUT }
	}

	/// Deadline applied to each individual destination call
	pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
		self.call_timeout = timeout;
		self
	}

	/// Upload `payload` to `destination_path`, replacing anything there
	pub async fn upload(&self, payload: &[u8], destination_path: &str) -> Result<(), UploadError> {
		let size = payload.len();
		info!("Uploading {} bytes to {}", size, destination_path);

		if size <= CHUNK_SIZE {
			self.timed("files/upload", self.dest.upload(payload, destination_path)).await?;
		} else {
			self.upload_session(payload, destination_path).await?;
		}

		info!("Upload complete: {}", destination_path);
		Ok(())
	}

	async fn upload_session(&self, payload: &[u8], destination_path: &str) -> Result<(), UploadError> {
		let first = &payload[..CHUNK_SIZE];
		let session_id =
			self.timed("upload_session/start", self.dest.session_start(first)).await?;
		if session_id.is_empty() {
			return Err(UploadError::Session { message: "empty session id".to_string() });
		}

		let mut session = UploadSession { session_id, bytes_sent: first.len() };
		debug!("Opened upload session {} for {}", session.session_id, destination_path);

		while payload.len() - session.bytes_sent > CHUNK_SIZE {
			let chunk = &payload[session.bytes_sent..session.bytes_sent + CHUNK_SIZE];
			self.timed(
				"upload_session/append",
				self.dest.session_append(chunk, &session.session_id, session.bytes_sent as u64),
			)
			.await?;
			session.bytes_sent += chunk.len();
			debug!("Session {}: {} of {} bytes sent", session.session_id, session.bytes_sent, payload.len());
		}

		let last = &payload[session.bytes_sent..];
		self.timed(
			"upload_session/finish",
			self.dest.session_finish(
				last,
				&session.session_id,
				session.bytes_sent as u64,
				destination_path,
			),
		)
		.await
	}

	async fn timed<T, F>(&self, operation: &'static str, call: F) -> Result<T, UploadError>
	where
		F: Future<Output = Result<T, TransportError>>,
	{
		with_deadline(operation, self.call_timeout, call).await.map_err(UploadError::from)
	}
}

// vim: ts=4
