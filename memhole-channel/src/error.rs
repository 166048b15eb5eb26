//! Channel errors

use std::io;

use memhole_core::constants::codes;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Device node not found: {path}")]
    DeviceNotFound { path: String },

    #[error("Device busy, cannot open {path}: {source}")]
    DeviceBusy {
        path: String,
        source: io::Error,
    },

    #[error("Invalid device path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// The negative error code the original wrapper generations return
    /// for this failure
    pub fn code(&self) -> i32 {
        match self {
            Self::NotConnected | Self::AlreadyConnected | Self::InvalidPath(_) => -codes::EINVDEV,
            Self::DeviceNotFound { .. } => -codes::EMEMHNF,
            Self::DeviceBusy { .. } => -codes::EMEMBSY,
            Self::Io(e) => e.raw_os_error().map_or(-codes::EINVDEV, |errno| -errno),
        }
    }
}
