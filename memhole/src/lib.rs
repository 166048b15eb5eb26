//! # memhole
//!
//! Rust client for the memhole kernel module, which exposes another
//! process's memory through the `/dev/memhole` device node.
//!
//! ## Features
//!
//! - Type-safe session protocol (connect / attach / position / transfer)
//! - Explicit control commands over the driver's seek-multiplexed channel
//! - Wrapper-compatible error codes for callers porting from C or Python
//! - An in-memory emulated driver for testing without the module loaded
//!
//! ## Quick Start
//!
//! ```no_run
//! use memhole::{AccessMode, Address, DeviceSession, Pid};
//!
//! fn main() -> memhole::Result<()> {
//!     // Connect to the device (the module must be loaded)
//!     let mut session = DeviceSession::new(AccessMode::ReadOnly);
//!     session.connect()?;
//!
//!     // Bind to a target process and read 16 bytes at an address
//!     session.attach_to_pid(Pid::new(4242)?)?;
//!     session.set_memory_position(Address::new(0x7fff_0000_1000))?;
//!     let bytes = session.read_memory(16)?;
//!     println!("{:02x?}", &bytes[..]);
//!
//!     // Disconnect
//!     session.disconnect()?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The session is intentionally synchronous and not thread-safe: the
//! driver keeps one cursor per handle, so the protocol only makes sense
//! as a single ordered stream of operations.

pub mod error;
pub mod probe;
pub mod session;

// Re-exports
pub use error::{Error, Result};
pub use session::DeviceSession;

// Re-export types
pub use memhole_channel::{Channel, DeviceNode, MemChannel, MemDevice};
pub use memhole_core::{ControlCommand, MEMHOLE_PATH};
pub use memhole_types::{AccessMode, Address, Pid};
