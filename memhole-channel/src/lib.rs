//! Channel layer for the memhole protocol
//!
//! Provides the raw command/data channel over one device descriptor.
//! [`DeviceNode`] talks to the real `/dev/memhole`; [`MemDevice`] emulates
//! the driver contract in memory for tests and development.

pub mod error;
pub mod mem;
pub mod node;

pub use error::{Error, Result};
pub use mem::{MemChannel, MemDevice};
pub use node::DeviceNode;

use memhole_core::ControlCommand;
use memhole_types::AccessMode;

/// Channel trait over one device descriptor
///
/// A channel owns at most one open descriptor and multiplexes two
/// sub-channels over it: `control` carries out-of-band commands (encoded
/// as seek calls on the real device), `read`/`write` transfer memory at
/// the driver's cursor.
///
/// Implementations are deliberately neither `Send` nor `Sync`: the device
/// protocol is a single ordered stream of blocking operations, and the
/// driver tracks one server-side cursor per handle. Concurrent use of one
/// channel is a caller error, not something this layer serializes.
pub trait Channel {
    /// Open the descriptor in the given access mode
    fn open(&mut self, access: AccessMode) -> Result<()>;

    /// Close the descriptor
    ///
    /// On failure the descriptor stays set so the caller can retry or
    /// diagnose; only a successful close clears it.
    fn close(&mut self) -> Result<()>;

    /// Check if the descriptor is open
    fn is_open(&self) -> bool;

    /// Issue a control command and return the driver's raw result
    ///
    /// Sentinel interpretation (0 meaning "no target", nonzero meaning
    /// "allocation failed", ...) is command-specific and left to the
    /// session layer.
    fn control(&mut self, command: ControlCommand, arg: i64) -> Result<i64>;

    /// Read bytes at the driver's cursor; returns the count delivered
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write bytes at the driver's cursor; returns the count accepted
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Diagnostic label for the underlying node
    fn path(&self) -> String;
}
