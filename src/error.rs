use std::io;
use thiserror::Error;

/// Rejected size-limit input from the control panel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{input}' is not a whole number of GB")]
    NotANumber { input: String },

    #[error("Size must be between 1 GB and 10 GB.")]
    OutOfRange { value: i64 },
}

/// Failures reported by a recycle bin backend
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to query bin size: {0}")]
    QueryFailed(String),

    #[error("Failed to empty bin: {0}")]
    PurgeFailed(String),

    #[error("Platform not supported: {0}")]
    NotSupported(String),

    #[error("Windows API error: {0}")]
    WindowsError(String),
}

/// Why `MonitoringController::start` refused to arm
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Monitoring is already running")]
    AlreadyRunning,
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
