//! Error types for memhole-core

use memhole_types::Pid;

use crate::constants::codes;

/// Result type alias for core protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The liveness probe failed or the driver refused the pid
    #[error("Invalid target: pid {pid} is not attachable")]
    InvalidTarget { pid: Pid },

    /// The driver could not allocate its transfer buffer
    #[error("Driver buffer allocation failed for {requested} bytes")]
    AllocationFailed { requested: u64 },

    /// Operation invalid in the current session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Selector value with no matching control command
    #[error("Unknown command selector: {0}")]
    UnknownSelector(i32),
}

impl Error {
    /// The negative error code the original wrapper generations return
    /// for this failure
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidTarget { .. } => -codes::EINVPID,
            Self::AllocationFailed { .. } => -codes::EKMALOC,
            Self::InvalidSessionState(_) | Self::UnknownSelector(_) => -codes::EINVDEV,
        }
    }
}
