//! Error types for ringflight.
//!
//! Every variant is terminal for a run: nothing in the pipeline retries.

use std::path::PathBuf;

use thiserror::Error;

use crate::runtime::StatusCode;
use crate::slot::SlotState;

/// Result type alias for ringflight operations
pub type Result<T> = std::result::Result<T, RingflightError>;

/// Main error type for ringflight
#[derive(Error, Debug)]
pub enum RingflightError {
    /// I/O errors outside of model loading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Model descriptor could not be read, parsed or placed on a device
    #[error("Failed to load model {}: {reason}", path.display())]
    Load {
        /// Path that was being loaded
        path: PathBuf,
        /// Why loading failed
        reason: String,
    },

    /// Synthetic input buffer is not densely packed
    #[error("Unsupported layout: {reason}")]
    UnsupportedLayout {
        /// Which stride check failed
        reason: String,
    },

    /// Binding or issuing a request failed
    #[error("Submit failed on slot {slot}: {reason}")]
    Submit {
        /// Ring position of the slot
        slot: usize,
        /// Runtime failure description
        reason: String,
    },

    /// A request completed with a non-success status
    #[error("Wait failed on slot {slot}: status {status}")]
    WaitFailed {
        /// Ring position of the slot
        slot: usize,
        /// Status reported by the runtime
        status: StatusCode,
    },

    /// Slot operation called in the wrong state
    #[error("Slot {slot} is {actual}, expected {expected}")]
    SlotState {
        /// Ring position of the slot
        slot: usize,
        /// State the operation requires
        expected: SlotState,
        /// State the slot was in
        actual: SlotState,
    },

    /// Result requested before a submission completed
    #[error("Slot {slot} has no completed result")]
    NoResult {
        /// Ring position of the slot
        slot: usize,
    },

    /// Runtime-side failures (unknown blob names, pool shutdown, ...)
    #[error("Runtime error: {message}")]
    Runtime {
        /// Error message from the runtime
        message: String,
    },
}

impl RingflightError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load { path: path.into(), reason: reason.into() }
    }

    pub fn layout(reason: impl Into<String>) -> Self {
        Self::UnsupportedLayout { reason: reason.into() }
    }

    pub fn submit(slot: usize, reason: impl ToString) -> Self {
        Self::Submit { slot, reason: reason.to_string() }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime { message: message.into() }
    }

    /// Ring position of the slot this error is attributed to, if any.
    pub fn slot(&self) -> Option<usize> {
        match self {
            Self::Submit { slot, .. }
            | Self::WaitFailed { slot, .. }
            | Self::SlotState { slot, .. }
            | Self::NoResult { slot } => Some(*slot),
            _ => None,
        }
    }
}
