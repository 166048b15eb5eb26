//! Target memory addresses

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An address in the attached process's virtual memory
///
/// Addresses are opaque to the client: the driver interprets them against
/// the attached target's address space. They print and parse as hex, the
/// form the demo tools pass on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address {
    /// The null address, used by the driver as a "nothing here" sentinel
    pub const NULL: Address = Address(0);

    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Offset the address by a signed byte count (wrapping, like pointer
    /// arithmetic on the C side)
    pub const fn offset(self, delta: i64) -> Self {
        Self(self.0.wrapping_add_signed(delta))
    }
}

impl From<u64> for Address {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> u64 {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parse a hex address, with or without a leading `0x`
    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| Error::Parse(format!("invalid address '{}': {}", s, e)))
    }
}
