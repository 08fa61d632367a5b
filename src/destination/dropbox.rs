//! Dropbox HTTP API v2 client
//!
//! Content endpoints (`files/upload`, `files/upload_session/*`) take their
//! arguments in the `Dropbox-API-Arg` header and the payload as the body.
//! RPC endpoints (`files/list_folder`, `files/delete_v2`) take a JSON body.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::DestinationStore;
use crate::error::TransportError;
use crate::types::RemoteEntry;

pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com/2";
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com/2";

const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Bound on establishing a connection; transfers are bounded per call by the caller
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct SessionStartResponse {
	session_id: String,
}

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
	entries: Vec<ListedEntry>,
	cursor: String,
	has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ListedEntry {
	path_display: Option<String>,
	path_lower: Option<String>,
	server_modified: Option<DateTime<Utc>>,
}

/// Authenticated Dropbox client
pub struct DropboxClient {
	http: reqwest::Client,
	access_token: String,
	api_url: String,
	content_url: String,
}

impl DropboxClient {
	pub fn new(access_token: &str) -> Result<Self, TransportError> {
		Ok(DropboxClient {
			http: reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?,
			access_token: access_token.to_string(),
			api_url: DEFAULT_API_URL.to_string(),
			content_url: DEFAULT_CONTENT_URL.to_string(),
		})
	}

	/// Point the client at other endpoints (mock servers)
	pub fn with_base_urls(mut self, api_url: &str, content_url: &str) -> Self {
		self.api_url = api_url.trim_end_matches('/').to_string();
		self.content_url = content_url.trim_end_matches('/').to_string();
		self
	}

	async fn content_call(
		&self,
		endpoint: &str,
		arg: &Value,
		data: &[u8],
	) -> Result<Vec<u8>, TransportError> {
		let url = format!("{}/{}", self.content_url, endpoint);
		let resp = self
			.http
			.post(&url)
			.bearer_auth(&self.access_token)
			.header(API_ARG_HEADER, api_arg_header(arg))
			.header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
			.body(data.to_vec())
			.send()
			.await?;
		read_success(resp).await
	}

	async fn rpc_call(&self, endpoint: &str, arg: &Value) -> Result<Vec<u8>, TransportError> {
		let url = format!("{}/{}", self.api_url, endpoint);
		let resp = self.http.post(&url).bearer_auth(&self.access_token).json(arg).send().await?;
		read_success(resp).await
	}
}

async fn read_success(resp: reqwest::Response) -> Result<Vec<u8>, TransportError> {
	let status = resp.status();
	if !status.is_success() {
		let body = resp.text().await.unwrap_or_default();
		return Err(TransportError::Api { status: status.as_u16(), body });
	}
	Ok(resp.bytes().await?.to_vec())
}

/// Serialize a header argument, escaping everything outside printable ASCII
/// as `\uXXXX` since HTTP headers cannot carry raw UTF-8.
pub fn api_arg_header(arg: &Value) -> String {
	let raw = arg.to_string();
	let mut out = String::with_capacity(raw.len());
	for c in raw.chars() {
		if c.is_ascii() && !c.is_ascii_control() {
			out.push(c);
		} else {
			let mut buf = [0u16; 2];
			for unit in c.encode_utf16(&mut buf) {
				out.push_str(&format!("\\u{:04x}", unit));
			}
		}
	}
	out
}

fn commit_arg(path: &str) -> Value {
	json!({ "path": path, "mode": "overwrite", "autorename": false, "mute": true })
}

#[async_trait]
impl DestinationStore for DropboxClient {
	async fn upload(&self, data: &[u8], path: &str) -> Result<(), TransportError> {
		self.content_call("files/upload", &commit_arg(path), data).await?;
		Ok(())
	}

	async fn session_start(&self, data: &[u8]) -> Result<String, TransportError> {
		let body = self
			.content_call("files/upload_session/start", &json!({ "close": false }), data)
			.await?;
		let resp: SessionStartResponse = serde_json::from_slice(&body)?;
		Ok(resp.session_id)
	}

	async fn session_append(
		&self,
		data: &[u8],
		session_id: &str,
		offset: u64,
	) -> Result<(), TransportError> {
		let arg = json!({
			"cursor": { "session_id": session_id, "offset": offset },
			"close": false,
		});
		self.content_call("files/upload_session/append_v2", &arg, data).await?;
		Ok(())
	}

	async fn session_finish(
		&self,
		data: &[u8],
		session_id: &str,
		offset: u64,
		path: &str,
	) -> Result<(), TransportError> {
		let arg = json!({
			"cursor": { "session_id": session_id, "offset": offset },
			"commit": commit_arg(path),
		});
		self.content_call("files/upload_session/finish", &arg, data).await?;
		Ok(())
	}

	async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
		let mut entries = Vec::new();
		let body = self.rpc_call("files/list_folder", &json!({ "path": path })).await?;
		let mut page: ListFolderResponse = serde_json::from_slice(&body)?;

		loop {
			entries.extend(page.entries.into_iter().filter_map(|e| {
				let path = e.path_display.or(e.path_lower)?;
				Some(RemoteEntry { path, modified_at: e.server_modified })
			}));
			if !page.has_more {
				break;
			}
			let body = self
				.rpc_call("files/list_folder/continue", &json!({ "cursor": page.cursor }))
				.await?;
			page = serde_json::from_slice(&body)?;
		}

		Ok(entries)
	}

	async fn delete(&self, path: &str) -> Result<(), TransportError> {
		self.rpc_call("files/delete_v2", &json!({ "path": path })).await?;
		Ok(())
	}
}


// vim: ts=4
