use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty version string")]
    Empty,

    #[error("Not a version of the form X.Y.Z[suffix]: {0}")]
    Malformed(String),

    #[error("Numeric component out of range: {0}")]
    Overflow(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Server error: {0}")]
    Server(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Registry unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },

    #[error("Copy rejected: {0}")]
    Copy(String),
}

impl RegistryError {
    /// Whether the failure is worth retrying (network hiccup, throttling, 5xx).
    ///
    /// Network errors count only when the request reached the wire; builder
    /// errors such as a malformed base URL fail the same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            RegistryError::Network(e) => {
                !e.is_builder() && (e.is_timeout() || e.is_connect() || e.is_request())
            }
            RegistryError::RateLimited { .. } | RegistryError::Server(_) => true,
            _ => false,
        }
    }

    /// Whether a copy failed because the source still uses a schema1 manifest
    pub fn is_schema1_manifest(&self) -> bool {
        match self {
            RegistryError::Copy(message) => message.to_lowercase().contains("schema1"),
            _ => false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Copy(_) => ErrorKind::Copy,
            RegistryError::Unavailable { .. } => ErrorKind::RegistryUnavailable,
            // A transient error that escaped the retry loop is still transient
            e if e.is_transient() => ErrorKind::RegistryUnavailable,
            _ => ErrorKind::Registry,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unknown variant: {0}")]
    UnknownVariant(String),

    #[error("Invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Unexpected platform format: {0}. Expected format: os/architecture (e.g., linux/amd64)")]
    InvalidPlatform(String),

    #[error("Manifest JSON not found: {0:?}")]
    ManifestNotFound(PathBuf),

    #[error("Manifest JSON is invalid: {0:?}")]
    InvalidManifest(PathBuf),
}

/// Any failure a command can surface to its caller
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("No versions found for {0}")]
    NoVersions(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Parse(_) => ErrorKind::Parse,
            SyncError::Registry(e) => e.kind(),
            SyncError::Config(_) => ErrorKind::Config,
            SyncError::Platform(_) => ErrorKind::Platform,
            SyncError::NoVersions(_) => ErrorKind::NoVersions,
        }
    }
}

/// Machine-readable error classification reported to the calling workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    RegistryUnavailable,
    Copy,
    Registry,
    Config,
    Platform,
    NoVersions,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse-error",
            ErrorKind::RegistryUnavailable => "registry-unavailable",
            ErrorKind::Copy => "copy-error",
            ErrorKind::Registry => "registry-error",
            ErrorKind::Config => "config-error",
            ErrorKind::Platform => "platform-error",
            ErrorKind::NoVersions => "no-versions",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::NoVersions => 1,
            ErrorKind::Parse | ErrorKind::Config | ErrorKind::Platform => 2,
            ErrorKind::RegistryUnavailable => 3,
            ErrorKind::Copy => 4,
            ErrorKind::Registry => 5,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
