//! Device access modes

use std::fmt;

/// How the device handle is opened, fixed for the session's lifetime
///
/// The session never re-checks this on write; a write through a read-only
/// handle is rejected by the kernel, not the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Open the device read-only
    #[default]
    ReadOnly,

    /// Open the device read-write (requires a driver built with write
    /// support)
    ReadWrite,
}

impl AccessMode {
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only"),
            Self::ReadWrite => write!(f, "read-write"),
        }
    }
}
