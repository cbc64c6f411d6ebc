//! # Session Error Types
//!
//! Error types for the session engine's own infrastructure.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Storage      │  │      Fixtures           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  StoreRead      │  │  FixtureLoadFailed      │ │
//! │  │  MissingEntry   │  │  StoreWrite     │  │                         │ │
//! │  │  InvalidUrl     │  │  StoreCorrupt   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Camera failures are NOT here: they are classified into                │
//! │  stampscan_core::ScanError and shown to the user.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use stampscan_core::{ScanError, ValidationError};

/// Result type alias for session infrastructure operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Infrastructure failures of the session engine.
#[derive(Debug, Error)]
pub enum SessionError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// A required configuration entry is absent.
    #[error("Missing required configuration entry: {0}")]
    MissingEntry(&'static str),

    /// Resolver base address is not a usable URL.
    #[error("Invalid resolver base address: {0}")]
    InvalidUrl(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Preference file could not be read.
    #[error("Failed to read preferences: {0}")]
    StoreRead(String),

    /// Preference file could not be written.
    #[error("Failed to write preferences: {0}")]
    StoreWrite(String),

    /// Preference file exists but is not valid TOML.
    #[error("Preference file is corrupt: {0}")]
    StoreCorrupt(String),

    /// No platform data directory to keep preferences in.
    #[error("No data directory available for preferences")]
    NoDataDir,

    // =========================================================================
    // Fixture Errors
    // =========================================================================
    /// Mock-mode fixture data could not be loaded.
    #[error("Failed to load fixture data: {0}")]
    FixtureLoadFailed(String),
}

// =============================================================================
// Start Errors
// =============================================================================

/// Why a `start` call did not leave the scanner active.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// Acquisition failed. The same error is in the published snapshot.
    #[error(transparent)]
    Acquisition(#[from] ScanError),

    /// `stop()` or a later `start()` took over while the camera was opening.
    #[error("Scan session {generation} was superseded before the camera opened")]
    Superseded { generation: u64 },

    /// The scanner was disposed.
    #[error("Scanner has been disposed")]
    Disposed,
}

impl StartError {
    /// The displayable error, if this was an acquisition failure.
    pub fn scan_error(&self) -> Option<&ScanError> {
        match self {
            StartError::Acquisition(err) => Some(err),
            _ => None,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::InvalidConfig(err.to_string())
    }
}

impl From<url::ParseError> for SessionError {
    fn from(err: url::ParseError) -> Self {
        SessionError::InvalidUrl(err.to_string())
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        SessionError::StoreWrite(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::FixtureLoadFailed(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SessionError {
    /// Returns true if this error indicates a configuration problem.
    ///
    /// Configuration errors are fatal at startup.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidConfig(_)
                | SessionError::MissingEntry(_)
                | SessionError::InvalidUrl(_)
                | SessionError::ConfigLoadFailed(_)
                | SessionError::FixtureLoadFailed(_)
        )
    }

    /// Returns true if this error came from the preference store.
    ///
    /// Storage errors never stop a scan; the controller logs and continues.
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            SessionError::StoreRead(_)
                | SessionError::StoreWrite(_)
                | SessionError::StoreCorrupt(_)
                | SessionError::NoDataDir
        )
    }
}
