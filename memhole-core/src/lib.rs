//! # memhole-core
//!
//! Core protocol implementation for the memhole kernel module.
//!
//! This crate provides the low-level protocol primitives:
//! - Control command selectors (the seek-multiplexed command channel)
//! - Driver error code values
//! - Session state bookkeeping
//! - Protocol constants

pub mod command;
pub mod constants;
pub mod error;
pub mod session;

pub use command::ControlCommand;
pub use constants::MEMHOLE_PATH;
pub use error::{Error, Result};
pub use session::{Session, SessionState};

/// Driver series these selectors target
pub const DRIVER_SERIES: &str = "1.3";
