//! Target process identification

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Process id of a prospective attach target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(i32);

impl Pid {
    pub fn new(pid: i32) -> Result<Self> {
        if pid <= 0 {
            return Err(Error::Validation(format!("pid must be positive, got {}", pid)));
        }
        Ok(Self(pid))
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<Pid> for i32 {
    fn from(pid: Pid) -> i32 {
        pid.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let pid: i32 = s
            .parse()
            .map_err(|e| Error::Parse(format!("invalid pid '{}': {}", s, e)))?;
        Self::new(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_parse() {
        assert_eq!("1234".parse::<Pid>().unwrap().get(), 1234);
        assert!("abc".parse::<Pid>().is_err());
    }

    #[test]
    fn test_pid_rejects_non_positive() {
        // pid 0 would turn the kill() probe into a process-group signal
        assert!(Pid::new(0).is_err());
        assert!(Pid::new(-1).is_err());
        assert!(Pid::new(1).is_ok());
    }
}
