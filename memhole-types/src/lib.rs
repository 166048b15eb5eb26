//! Type definitions for the memhole client

pub mod access;
pub mod address;
pub mod error;
pub mod target;

pub use access::AccessMode;
pub use address::Address;
pub use error::{Error, Result};
pub use target::Pid;
