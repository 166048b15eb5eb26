//! Control command selectors
//!
//! The driver has no ioctl surface: out-of-band commands ride the seek
//! call, with the selector carried in the `whence` argument and the
//! command operand in the offset argument. Client-side the commands are
//! an explicit enum; the channel layer encodes them back onto the wire.

use std::fmt;

use crate::error::{Error, Result};

/// Control commands multiplexed through the seek primitive
///
/// Selector values match the `LSMxxxx` defines of driver series 1.2/1.3.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ControlCommand {
    /// Bind the session to a target process; operand is the pid.
    /// Result is the target's base mapping address, or 0 if no valid
    /// target was set.
    SetPid = 0,

    /// Set the memory cursor; operand is the target address.
    /// Result is the resulting address.
    SetPos = 1,

    /// Read the memory cursor; operand is ignored.
    /// Result is the current address.
    GetPos = 2,

    /// Resize the driver's transfer buffer; operand is the new size in
    /// bytes. Result is 0 on success, nonzero on allocation failure.
    SetBufLen = 3,

    /// Read the kernel address of the transfer buffer; operand is
    /// ignored. Result is the buffer address, or 0 before the first
    /// allocation.
    GetBufAddr = 4,
}

impl ControlCommand {
    /// Selector value carried in the seek call's `whence` argument
    pub const fn selector(self) -> i32 {
        self as i32
    }

    /// Whether the command only queries driver state
    pub const fn is_query(self) -> bool {
        matches!(self, Self::GetPos | Self::GetBufAddr)
    }

    /// Selector name as defined in the driver headers
    pub const fn name(self) -> &'static str {
        match self {
            Self::SetPid => "LSMSPID",
            Self::SetPos => "LSMSPOS",
            Self::GetPos => "LSMGPOS",
            Self::SetBufLen => "LSMSLEN",
            Self::GetBufAddr => "LSMGBUF",
        }
    }
}

impl From<ControlCommand> for i32 {
    fn from(cmd: ControlCommand) -> i32 {
        cmd.selector()
    }
}

impl TryFrom<i32> for ControlCommand {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::SetPid),
            1 => Ok(Self::SetPos),
            2 => Ok(Self::GetPos),
            3 => Ok(Self::SetBufLen),
            4 => Ok(Self::GetBufAddr),
            _ => Err(Error::UnknownSelector(value)),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.selector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_conversion() {
        assert_eq!(i32::from(ControlCommand::SetPid), 0);
        assert_eq!(ControlCommand::try_from(3).unwrap(), ControlCommand::SetBufLen);
    }

    #[test]
    fn test_selector_roundtrip() {
        for cmd in [
            ControlCommand::SetPid,
            ControlCommand::SetPos,
            ControlCommand::GetPos,
            ControlCommand::SetBufLen,
            ControlCommand::GetBufAddr,
        ] {
            assert_eq!(ControlCommand::try_from(cmd.selector()).unwrap(), cmd);
        }
    }

    #[test]
    fn test_is_query() {
        assert!(ControlCommand::GetPos.is_query());
        assert!(ControlCommand::GetBufAddr.is_query());
        assert!(!ControlCommand::SetPid.is_query());
    }

    #[test]
    fn test_unknown_selector() {
        let result = ControlCommand::try_from(7);
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ControlCommand::SetPos.to_string(), "LSMSPOS(1)");
    }
}
