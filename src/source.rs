//! Source inventory: where backup archives come from
//!
//! The engine only depends on [`SourceInventory`]; [`SupervisorClient`] is the
//! production implementation talking to the Home Assistant Supervisor API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;

use crate::error::TransportError;
use crate::types::SourceItem;

pub const DEFAULT_SUPERVISOR_URL: &str = "http://supervisor";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Lists and downloads backup archives by opaque key
#[async_trait]
pub trait SourceInventory: Send + Sync {
	/// All archives currently available, in source order
	async fn list(&self) -> Result<Vec<SourceItem>, TransportError>;

	/// Full content of one archive
	async fn download(&self, key: &str) -> Result<Vec<u8>, TransportError>;
}

#[derive(Debug, Deserialize)]
struct BackupsEnvelope {
	data: BackupsData,
}

#[derive(Debug, Deserialize)]
struct BackupsData {
	backups: Vec<SupervisorBackup>,
}

#[derive(Debug, Deserialize)]
struct SupervisorBackup {
	slug: String,
	name: Option<String>,
	date: Option<String>,
}

impl From<SupervisorBackup> for SourceItem {
	fn from(b: SupervisorBackup) -> Self {
		SourceItem {
			name: b.name.filter(|n| !n.is_empty()).unwrap_or_else(|| b.slug.clone()),
			timestamp: b.date.unwrap_or_else(|| "unknown".to_string()),
			key: b.slug,
		}
	}
}

/// Supervisor backup API client with bearer token authentication
pub struct SupervisorClient {
	http: reqwest::Client,
	base_url: String,
}

impl SupervisorClient {
	pub fn new(base_url: &str, token: &str) -> Result<Self, TransportError> {
		let mut headers = HeaderMap::new();
		if !token.is_empty() {
			let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
				TransportError::Decode { message: "supervisor token is not a valid header".into() }
			})?;
			headers.insert(AUTHORIZATION, value);
		}

		let http = reqwest::Client::builder()
			.default_headers(headers)
			.connect_timeout(CONNECT_TIMEOUT)
			.build()?;

		Ok(SupervisorClient { http, base_url: base_url.trim_end_matches('/').to_string() })
	}

	async fn get(&self, endpoint: &str) -> Result<reqwest::Response, TransportError> {
		let url = format!("{}{}", self.base_url, endpoint);
		let resp = self.http.get(&url).send().await?;
		let status = resp.status();

		if !status.is_success() {
			let body = resp.text().await.unwrap_or_default();
			return Err(TransportError::Api { status: status.as_u16(), body });
		}

		Ok(resp)
	}
}

#[async_trait]
impl SourceInventory for SupervisorClient {
	async fn list(&self) -> Result<Vec<SourceItem>, TransportError> {
		let body = self.get("/backups").await?.bytes().await?;
		let envelope: BackupsEnvelope = serde_json::from_slice(&body)?;
		Ok(envelope.data.backups.into_iter().map(SourceItem::from).collect())
	}

	async fn download(&self, key: &str) -> Result<Vec<u8>, TransportError> {
		let resp = self.get(&format!("/backups/{}/download", key)).await?;
		Ok(resp.bytes().await?.to_vec())
	}
}


// vim: ts=4
