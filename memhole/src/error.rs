//! High-level error types

use memhole_core::constants::codes;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] memhole_core::Error),

    #[error("Channel error: {0}")]
    Channel(#[from] memhole_channel::Error),

    #[error("Type error: {0}")]
    Types(#[from] memhole_types::Error),

    #[error("Session not connected")]
    NotConnected,

    #[error("Session already connected")]
    AlreadyConnected,
}

impl Error {
    /// The negative error code the original wrapper generations return
    /// for this failure, for callers porting from the C/Python wrappers
    pub fn code(&self) -> i32 {
        match self {
            Self::Core(e) => e.code(),
            Self::Channel(e) => e.code(),
            Self::Types(_) => -codes::EINVDEV,
            Self::NotConnected | Self::AlreadyConnected => -codes::EINVDEV,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_codes_flatten() {
        assert_eq!(Error::NotConnected.code(), -4);
        assert_eq!(Error::AlreadyConnected.code(), -4);

        let not_found = memhole_channel::Error::DeviceNotFound {
            path: "/dev/memhole".into(),
        };
        assert_eq!(Error::Channel(not_found).code(), -8);

        let core = memhole_core::Error::AllocationFailed { requested: 4096 };
        assert_eq!(Error::Core(core).code(), -64);
    }
}
