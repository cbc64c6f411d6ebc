//! # Kiosk Error Type
//!
//! Everything that stops the kiosk. Acquisition failures are not here: they
//! are logged and the next input line retries.

use thiserror::Error;

use stampscan_session::{SessionError, StartError};

/// Result type alias for the kiosk.
pub type KioskResult<T> = Result<T, KioskError>;

#[derive(Debug, Error)]
pub enum KioskError {
    /// Configuration, fixture or preference setup failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration asks for a backend the kiosk cannot talk to.
    #[error("Remote resolution against {0} is provided by the host application; set resolver.mock_mode = true to run the kiosk")]
    RemoteResolverUnavailable(String),

    /// The scanner refused to start for a reason other than the camera.
    #[error(transparent)]
    Start(#[from] StartError),

    /// Reading stdin failed.
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

impl KioskError {
    /// Returns true if fixing the configuration would fix this.
    pub fn is_config_error(&self) -> bool {
        match self {
            KioskError::Session(e) => e.is_config_error(),
            KioskError::RemoteResolverUnavailable(_) => true,
            _ => false,
        }
    }
}
