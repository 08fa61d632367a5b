//! Destination object store seams
//!
//! The sync engine depends only on [`DestinationStore`] and obtains one per
//! cycle from a [`DestinationProvider`], which is where credentials are
//! checked. [`dropbox`] holds the production implementation.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{AuthError, TransportError};
use crate::types::RemoteEntry;

pub mod auth;
pub mod dropbox;

pub use auth::DropboxAuth;
pub use dropbox::DropboxClient;

/// Chunk-capable remote store. Every commit replaces whatever already exists
/// at the destination path.
#[async_trait]
pub trait DestinationStore: Send + Sync {
	/// Single-call upload of a complete payload
	async fn upload(&self, data: &[u8], path: &str) -> Result<(), TransportError>;

	/// Open an upload session with the first chunk; returns the session id
	async fn session_start(&self, data: &[u8]) -> Result<String, TransportError>;

	/// Append `data` at byte `offset` of the session
	async fn session_append(
		&self,
		data: &[u8],
		session_id: &str,
		offset: u64,
	) -> Result<(), TransportError>;

	/// Send the last chunk at `offset` and commit the session to `path`
	async fn session_finish(
		&self,
		data: &[u8],
		session_id: &str,
		offset: u64,
		path: &str,
	) -> Result<(), TransportError>;

	/// Entries directly under `path`
	async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, TransportError>;

	async fn delete(&self, path: &str) -> Result<(), TransportError>;
}

/// Hands out an authenticated destination store
#[async_trait]
pub trait DestinationProvider: Send + Sync {
	async fn connect(&self) -> Result<Arc<dyn DestinationStore>, AuthError>;

	/// Credentials are present; does not contact the remote
	async fn is_authorized(&self) -> bool;
}

// vim: ts=4
