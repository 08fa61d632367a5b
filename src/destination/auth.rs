//! Dropbox credential handling
//!
//! Only the refresh-token grant lives here: a refresh token obtained out of
//! band is stored in `tokens.json` and exchanged for a short-lived access
//! token whenever a cycle needs a client.

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::dropbox::{DropboxClient, CONNECT_TIMEOUT, DEFAULT_API_URL, DEFAULT_CONTENT_URL};
use super::{DestinationProvider, DestinationStore};
use crate::error::{AuthError, TransportError};
use crate::logging::*;
use crate::state::TokenStore;
use crate::types::Tokens;

pub const DEFAULT_TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

/// Whole-request bound for the token exchange
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: Option<i64>,
}

/// [`DestinationProvider`] backed by stored Dropbox tokens
pub struct DropboxAuth {
	app_key: String,
	app_secret: String,
	tokens: TokenStore,
	http: reqwest::Client,
	token_url: String,
	api_url: String,
	content_url: String,
}

impl DropboxAuth {
	pub fn new(app_key: &str, app_secret: &str, tokens: TokenStore) -> Result<Self, TransportError> {
		let http = reqwest::Client::builder()
			.connect_timeout(CONNECT_TIMEOUT)
			.timeout(TOKEN_REQUEST_TIMEOUT)
			.build()?;
		Ok(DropboxAuth {
			app_key: app_key.to_string(),
			app_secret: app_secret.to_string(),
			tokens,
			http,
			token_url: DEFAULT_TOKEN_URL.to_string(),
			api_url: DEFAULT_API_URL.to_string(),
			content_url: DEFAULT_CONTENT_URL.to_string(),
		})
	}

	/// Point the token exchange and the built clients at other endpoints
	pub fn with_endpoints(mut self, token_url: &str, api_url: &str, content_url: &str) -> Self {
		self.token_url = token_url.to_string();
		self.api_url = api_url.to_string();
		self.content_url = content_url.to_string();
		self
	}

	/// Exchange the refresh token for a fresh access token and persist it
	async fn refresh(&self, mut tokens: Tokens, refresh_token: &str) -> Result<String, AuthError> {
		let form = [
			("grant_type", "refresh_token"),
			("refresh_token", refresh_token),
			("client_id", self.app_key.as_str()),
			("client_secret", self.app_secret.as_str()),
		];
		let resp = self
			.http
			.post(&self.token_url)
			.form(&form)
			.send()
			.await
			.map_err(TransportError::from)?;

		let status = resp.status();
		if status.as_u16() == 400 || status.as_u16() == 401 {
			let body = resp.text().await.unwrap_or_default();
			error!("Dropbox auth failed: {}", body);
			if let Err(e) = self.tokens.clear().await {
				warn!("Could not clear rejected tokens: {}", e);
			}
			return Err(AuthError::Rejected { message: body });
		}
		if !status.is_success() {
			let body = resp.text().await.unwrap_or_default();
			return Err(TransportError::Api { status: status.as_u16(), body }.into());
		}

		let body = resp.bytes().await.map_err(TransportError::from)?;
		let granted: TokenResponse = serde_json::from_slice(&body).map_err(TransportError::from)?;

		tokens.access_token = Some(granted.access_token.clone());
		tokens.expires_at =
			granted.expires_in.map(|secs| (Local::now() + chrono::Duration::seconds(secs)).to_rfc3339());
		if let Err(e) = self.tokens.save(&tokens).await {
			warn!("Could not persist refreshed access token: {}", e);
		}

		Ok(granted.access_token)
	}
}

#[async_trait]
impl DestinationProvider for DropboxAuth {
	async fn connect(&self) -> Result<Arc<dyn DestinationStore>, AuthError> {
		let tokens = self.tokens.load().await.ok_or(AuthError::NotAuthorized)?;
		let refresh_token = match tokens.refresh_token.clone() {
			Some(token) if !token.is_empty() => token,
			_ => return Err(AuthError::NotAuthorized),
		};

		let access_token = self.refresh(tokens, &refresh_token).await?;
		let client = DropboxClient::new(&access_token)?.with_base_urls(&self.api_url, &self.content_url);
		Ok(Arc::new(client))
	}

	async fn is_authorized(&self) -> bool {
		self.tokens.is_authorized().await
	}
}

// vim: ts=4
