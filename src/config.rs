//! Configuration for backupsync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (`Config::default()`)
//! 2. Options file: `--config PATH` (`.toml` or JSON), otherwise the add-on
//!    options at `{state_dir}/options.json`
//! 3. Environment variables (`BACKUPSYNC_*` prefix, plus `SUPERVISOR_TOKEN`)
//! 4. CLI flags (highest priority)
//!
//! Options files accept both the camelCase field names below and the
//! Home Assistant add-on option names (`dropbox_app_key`,
//! `backup_interval_hours`, `max_backups_in_dropbox`, ...).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::logging::*;
use crate::service::ServiceSettings;
use crate::source::DEFAULT_SUPERVISOR_URL;

pub const OPTIONS_FILE: &str = "options.json";

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// DROPBOX
	// ========================================================================
	/// Dropbox app key
	pub app_key: String,

	/// Dropbox app secret
	pub app_secret: String,

	/// Destination folder in Dropbox
	pub backup_path: String,

	/// Maximum archives kept in the destination folder (`<= 0` keeps all)
	pub max_backups: i64,

	/// Deadline for a single upload call in seconds
	pub chunk_timeout_secs: u64,

	// ========================================================================
	// SCHEDULING
	// ========================================================================
	/// Hours between scheduled runs (`0` disables the schedule)
	pub interval_hours: f64,

	// ========================================================================
	// SOURCE
	// ========================================================================
	/// Supervisor API base URL
	pub supervisor_url: String,

	/// Supervisor API token
	#[serde(skip_serializing)]
	pub supervisor_token: String,

	// ========================================================================
	// RUNTIME
	// ========================================================================
	/// Directory holding tokens, transfer state and last-run tracking
	pub state_dir: PathBuf,

	/// Control surface listen address
	pub listen: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			app_key: String::new(),
			app_secret: String::new(),
			backup_path: "/HomeAssistant/Backups".to_string(),
			max_backups: 10,
			chunk_timeout_secs: 300,
			interval_hours: 24.0,
			supervisor_url: DEFAULT_SUPERVISOR_URL.to_string(),
			supervisor_token: String::new(),
			state_dir: PathBuf::from("/data"),
			listen: "0.0.0.0:8099".to_string(),
		}
	}
}

/// Values present in an options file; absent keys keep the lower layer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConfigFile {
	#[serde(alias = "dropbox_app_key")]
	app_key: Option<String>,
	#[serde(alias = "dropbox_app_secret")]
	app_secret: Option<String>,
	#[serde(alias = "dropbox_backup_path")]
	backup_path: Option<String>,
	#[serde(alias = "max_backups_in_dropbox")]
	max_backups: Option<i64>,
	chunk_timeout_secs: Option<u64>,
	#[serde(alias = "backup_interval_hours")]
	interval_hours: Option<f64>,
	supervisor_url: Option<String>,
	supervisor_token: Option<String>,
	state_dir: Option<PathBuf>,
	listen: Option<String>,
}

/// Overrides coming from command-line flags
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub config_path: Option<PathBuf>,
	pub state_dir: Option<PathBuf>,
	pub listen: Option<String>,
}

impl Config {
	/// Resolve the full priority chain against the process environment
	pub fn load(cli: &CliOverrides) -> Result<Config, ConfigError> {
		Self::load_with_env(cli, |key| std::env::var(key).ok())
	}

	/// Resolve the priority chain with an explicit environment lookup
	pub fn load_with_env<E>(cli: &CliOverrides, env: E) -> Result<Config, ConfigError>
	where
		E: Fn(&str) -> Option<String>,
	{
		let mut config = Config::default();

		// The state dir locates the add-on options file, so resolve it first
		if let Some(dir) = env("BACKUPSYNC_STATE_DIR") {
			config.state_dir = PathBuf::from(dir);
		}
		if let Some(dir) = &cli.state_dir {
			config.state_dir = dir.clone();
		}

		match &cli.config_path {
			Some(path) => config.apply_file(read_config_file(path)?),
			None => {
				let path = config.state_dir.join(OPTIONS_FILE);
				if path.exists() {
					match read_config_file(&path) {
						Ok(file) => config.apply_file(file),
						Err(e) => warn!("Failed to load options: {}", e),
					}
				} else {
					warn!("Options file not found at {}", path.display());
				}
			}
		}

		config.apply_env(env)?;

		if let Some(dir) = &cli.state_dir {
			config.state_dir = dir.clone();
		}
		if let Some(listen) = &cli.listen {
			config.listen = listen.clone();
		}

		config.validate()?;
		Ok(config)
	}

	fn apply_file(&mut self, file: ConfigFile) {
		if let Some(v) = file.app_key {
			self.app_key = v;
		}
		if let Some(v) = file.app_secret {
			self.app_secret = v;
		}
		if let Some(v) = file.backup_path {
			self.backup_path = v;
		}
		if let Some(v) = file.max_backups {
			self.max_backups = v;
		}
		if let Some(v) = file.chunk_timeout_secs {
			self.chunk_timeout_secs = v;
		}
		if let Some(v) = file.interval_hours {
			self.interval_hours = v;
		}
		if let Some(v) = file.supervisor_url {
			self.supervisor_url = v;
		}
		if let Some(v) = file.supervisor_token {
			self.supervisor_token = v;
		}
		if let Some(v) = file.state_dir {
			self.state_dir = v;
		}
		if let Some(v) = file.listen {
			self.listen = v;
		}
	}

	fn apply_env<E>(&mut self, env: E) -> Result<(), ConfigError>
	where
		E: Fn(&str) -> Option<String>,
	{
		if let Some(v) = env("BACKUPSYNC_APP_KEY") {
			self.app_key = v;
		}
		if let Some(v) = env("BACKUPSYNC_APP_SECRET") {
			self.app_secret = v;
		}
		if let Some(v) = env("BACKUPSYNC_BACKUP_PATH") {
			self.backup_path = v;
		}
		if let Some(v) = env("BACKUPSYNC_MAX_BACKUPS") {
			self.max_backups = parse_env("BACKUPSYNC_MAX_BACKUPS", &v)?;
		}
		if let Some(v) = env("BACKUPSYNC_CHUNK_TIMEOUT_SECS") {
			self.chunk_timeout_secs = parse_env("BACKUPSYNC_CHUNK_TIMEOUT_SECS", &v)?;
		}
		if let Some(v) = env("BACKUPSYNC_INTERVAL_HOURS") {
			self.interval_hours = parse_env("BACKUPSYNC_INTERVAL_HOURS", &v)?;
		}
		if let Some(v) = env("BACKUPSYNC_SUPERVISOR_URL") {
			self.supervisor_url = v;
		}
		if let Some(v) = env("SUPERVISOR_TOKEN") {
			self.supervisor_token = v;
		}
		if let Some(v) = env("BACKUPSYNC_STATE_DIR") {
			self.state_dir = PathBuf::from(v);
		}
		if let Some(v) = env("BACKUPSYNC_LISTEN") {
			self.listen = v;
		}
		Ok(())
	}

	/// Reject values the service cannot run with
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.backup_path.starts_with('/') {
			return Err(ConfigError::Invalid {
				message: format!("backup path must be absolute, got '{}'", self.backup_path),
			});
		}
		if self.chunk_timeout_secs == 0 {
			return Err(ConfigError::Invalid {
				message: "chunk timeout must be greater than 0".to_string(),
			});
		}
		if !self.interval_hours.is_finite() {
			return Err(ConfigError::Invalid {
				message: format!("interval hours must be a finite number, got {}", self.interval_hours),
			});
		}
		if self.listen.parse::<SocketAddr>().is_err() {
			return Err(ConfigError::Invalid {
				message: format!("listen address '{}' is not host:port", self.listen),
			});
		}
		if self.app_key.is_empty() || self.app_secret.is_empty() {
			warn!("Dropbox app_key and app_secret must be configured in addon options");
		}
		Ok(())
	}

	pub fn service_settings(&self) -> ServiceSettings {
		ServiceSettings {
			backup_path: self.backup_path.clone(),
			max_backups: self.max_backups,
			call_timeout: Duration::from_secs(self.chunk_timeout_secs),
		}
	}
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
	let contents = std::fs::read_to_string(path)
		.map_err(|e| ConfigError::Read { path: path.display().to_string(), source: e })?;

	let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
		toml::from_str(&contents).map_err(|e| e.to_string())
	} else {
		serde_json::from_str(&contents).map_err(|e| e.to_string())
	};

	parsed.map_err(|message| ConfigError::Parse { path: path.display().to_string(), message })
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
	T::Err: std::fmt::Display,
{
	value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
		message: format!("{}='{}': {}", key, value, e),
	})
}


// vim: ts=4
