//! Error taxonomy for the desktop session core and the policy that decides which errors reach
//! the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::WindowId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors raised by session, drag, and storage operations.
pub enum SessionError {
    /// The referenced window is not registered.
    #[error("window `{0}` not found")]
    WindowNotFound(WindowId),
    /// A window with the same id is already registered.
    #[error("window `{0}` is already registered")]
    DuplicateWindowId(WindowId),
    /// A drag was started while another drag was in flight.
    #[error("a drag session is already active")]
    AlreadyDragging,
    /// A drop payload could not be reconstructed.
    #[error("drop payload could not be decoded: {0}")]
    PayloadDecode(String),
    /// The durable key-value store rejected a read or write.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// How the lifecycle controller reacts to an error once it has been classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Transient race between UI teardown and late events: log and do nothing.
    Recover,
    /// Caller-side logic defect: surfaced or absorbed depending on [`ErrorPolicy`].
    CallerDefect,
    /// Log and tell the user through a non-fatal toast.
    Notify,
}

impl SessionError {
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            Self::WindowNotFound(_) => ErrorDisposition::Recover,
            Self::DuplicateWindowId(_) | Self::AlreadyDragging => ErrorDisposition::CallerDefect,
            Self::PayloadDecode(_) | Self::Storage(_) => ErrorDisposition::Notify,
        }
    }
}

/// Whether caller defects are returned as errors or logged and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Surface caller defects as `Err` (development builds).
    Strict,
    /// Log caller defects and continue (production builds).
    Lenient,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}
