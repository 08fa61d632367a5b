//! Error types for backup synchronization

use std::error::Error;
use std::fmt;
use std::io;

/// Main error type for backup operations
#[derive(Debug)]
pub enum BackupError {
	/// Source or destination API fault (nested)
	Transport(TransportError),

	/// Missing, invalid or expired credentials (nested)
	Auth(AuthError),

	/// Local state file could not be written (nested)
	State(StateError),

	/// Chunked upload failed (nested)
	Upload(UploadError),

	/// Another cycle holds the single-flight guard
	Busy,
}

impl fmt::Display for BackupError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BackupError::Transport(e) => write!(f, "{}", e),
			BackupError::Auth(e) => write!(f, "{}", e),
			BackupError::State(e) => write!(f, "State error: {}", e),
			BackupError::Upload(e) => write!(f, "Upload failed: {}", e),
			BackupError::Busy => write!(f, "A backup cycle is already running"),
		}
	}
}

impl Error for BackupError {}

impl From<TransportError> for BackupError {
	fn from(e: TransportError) -> Self {
		BackupError::Transport(e)
	}
}

impl From<AuthError> for BackupError {
	fn from(e: AuthError) -> Self {
		BackupError::Auth(e)
	}
}

impl From<StateError> for BackupError {
	fn from(e: StateError) -> Self {
		BackupError::State(e)
	}
}

impl From<UploadError> for BackupError {
	fn from(e: UploadError) -> Self {
		BackupError::Upload(e)
	}
}

/// Network or API errors from the source inventory or the destination store
#[derive(Debug)]
pub enum TransportError {
	/// Request could not be sent or the response body could not be read
	Http { source: reqwest::Error },

	/// Remote API answered with a non-success status
	Api { status: u16, body: String },

	/// Response body did not have the expected shape
	Decode { message: String },

	/// The call did not complete within its deadline
	Timeout { operation: &'static str, secs: u64 },
}

impl fmt::Display for TransportError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransportError::Http { source } => write!(f, "HTTP error: {}", source),
			TransportError::Api { status, body } => write!(f, "API error {}: {}", status, body),
			TransportError::Decode { message } => {
				write!(f, "Unexpected response: {}", message)
			}
			TransportError::Timeout { operation, secs } => {
				write!(f, "{} timed out after {}s", operation, secs)
			}
		}
	}
}

impl Error for TransportError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			TransportError::Http { source } => Some(source),
			_ => None,
		}
	}
}

impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		TransportError::Http { source: e }
	}
}

impl From<serde_json::Error> for TransportError {
	fn from(e: serde_json::Error) -> Self {
		TransportError::Decode { message: e.to_string() }
	}
}

/// Credential errors
#[derive(Debug)]
pub enum AuthError {
	/// No refresh token stored
	NotAuthorized,

	/// Token endpoint refused the stored credentials
	Rejected { message: String },

	/// Token endpoint could not be reached
	Transport(TransportError),
}

impl fmt::Display for AuthError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AuthError::NotAuthorized => write!(f, "Not authorized"),
			AuthError::Rejected { message } => {
				write!(f, "Dropbox rejected stored credentials: {}", message)
			}
			AuthError::Transport(e) => write!(f, "Token refresh failed: {}", e),
		}
	}
}

impl Error for AuthError {}

impl From<TransportError> for AuthError {
	fn from(e: TransportError) -> Self {
		AuthError::Transport(e)
	}
}

/// State persistence errors
#[derive(Debug)]
pub enum StateError {
	/// Failed to read a state file
	LoadFailed { source: Box<dyn Error + Send + Sync> },

	/// Failed to write a state file
	SaveFailed { source: Box<dyn Error + Send + Sync> },

	/// State file is not valid JSON of the expected shape
	Corrupted { message: String },
}

impl fmt::Display for StateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StateError::LoadFailed { source } => write!(f, "Failed to load state: {}", source),
			StateError::SaveFailed { source } => write!(f, "Failed to save state: {}", source),
			StateError::Corrupted { message } => write!(f, "State corrupted: {}", message),
		}
	}
}

impl Error for StateError {}

/// Chunked upload errors
#[derive(Debug)]
pub enum UploadError {
	/// Destination API call failed
	Transport(TransportError),

	/// A single destination call exceeded its deadline
	Timeout { operation: &'static str, secs: u64 },

	/// Upload session handshake returned something unusable
	Session { message: String },
}

impl fmt::Display for UploadError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UploadError::Transport(e) => write!(f, "{}", e),
			UploadError::Timeout { operation, secs } => {
				write!(f, "{} timed out after {}s", operation, secs)
			}
			UploadError::Session { message } => write!(f, "Upload session error: {}", message),
		}
	}
}

impl Error for UploadError {}

impl From<TransportError> for UploadError {
	fn from(e: TransportError) -> Self {
		match e {
			TransportError::Timeout { operation, secs } => UploadError::Timeout { operation, secs },
			other => UploadError::Transport(other),
		}
	}
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	Read { path: String, source: io::Error },

	/// Config file could not be parsed
	Parse { path: String, message: String },

	/// A value is out of range
	Invalid { message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Read { path, source } => write!(f, "Cannot read {}: {}", path, source),
			ConfigError::Parse { path, message } => write!(f, "Cannot parse {}: {}", path, message),
			ConfigError::Invalid { message } => write!(f, "{}", message),
		}
	}
}

impl Error for ConfigError {}


// vim: ts=4
