//! High-level device session

use std::path::PathBuf;

use bytes::Bytes;
use tracing::{debug, info};

use memhole_channel::{Channel, DeviceNode};
use memhole_core::{ControlCommand, Session};
use memhole_types::{AccessMode, Address, Pid};

use crate::error::{Error, Result};
use crate::probe;

/// Client session for the memhole device
///
/// Owns at most one open device handle and mediates the whole protocol
/// over it: connect, attach to a target process, position the memory
/// cursor, negotiate the transfer buffer, and move bytes. Operations are
/// strictly sequential: every call is a direct blocking syscall against
/// the single handle, and the session is **not** thread-safe. The driver
/// tracks one server-side cursor per handle, so interleaved position/read
/// pairs from several threads would corrupt each other even if the client
/// locked its own state.
///
/// # Examples
///
/// ```no_run
/// use memhole::{AccessMode, Address, DeviceSession, Pid};
///
/// fn main() -> memhole::Result<()> {
///     let mut session = DeviceSession::new(AccessMode::ReadOnly);
///
///     session.connect()?;
///     session.attach_to_pid(Pid::new(4242)?)?;
///
///     session.set_memory_position(Address::new(0x55e703fa72a0))?;
///     let bytes = session.read_memory(64)?;
///     println!("{:02x?}", &bytes[..]);
///
///     session.disconnect()?;
///     Ok(())
/// }
/// ```
pub struct DeviceSession {
    channel: Box<dyn Channel>,
    session: Session,
    access: AccessMode,
}

impl DeviceSession {
    /// Create a session against the well-known device node
    pub fn new(access: AccessMode) -> Self {
        Self::with_channel(Box::new(DeviceNode::new()), access)
    }

    /// Create a session against a non-default device node
    pub fn with_path(path: impl Into<PathBuf>, access: AccessMode) -> Self {
        Self::with_channel(Box::new(DeviceNode::with_path(path)), access)
    }

    /// Create a session over any channel implementation
    ///
    /// This is how tests run the full protocol against the emulated
    /// driver ([`memhole_channel::MemDevice`]).
    pub fn with_channel(channel: Box<dyn Channel>, access: AccessMode) -> Self {
        Self {
            channel,
            session: Session::new(),
            access,
        }
    }

    /// Check if a handle is open
    pub fn is_connected(&self) -> bool {
        self.session.is_connected() && self.channel.is_open()
    }

    /// Check if a target process is bound
    pub fn is_attached(&self) -> bool {
        self.session.is_attached()
    }

    /// Access mode the session was constructed with
    pub fn access(&self) -> AccessMode {
        self.access
    }

    /// Last negotiated driver buffer capacity in bytes (0 when unknown)
    pub fn buffer_capacity(&self) -> u64 {
        self.session.buffer_capacity()
    }

    /// Open the device handle
    ///
    /// Verifies the device node exists, then opens it in the access mode
    /// fixed at construction.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if a handle is already held; the
    ///   original handle is untouched
    /// - `DeviceNotFound` if the node does not exist (module not loaded)
    /// - `DeviceBusy` if the driver refuses the open (it allows one
    ///   concurrent handle); no handle is retained in this case
    pub fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        info!("Connecting to {} ({})...", self.channel.path(), self.access);

        self.channel.open(self.access)?;
        self.session.open()?;

        info!("Connected to {}", self.channel.path());

        Ok(())
    }

    /// Close the device handle
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] if no handle is open. A failing close is
    /// propagated with the handle left set, so the caller can retry or
    /// diagnose; only a successful close resets session state.
    pub fn disconnect(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        info!("Disconnecting from {}...", self.channel.path());

        self.channel.close()?;
        self.session.close();

        info!("Disconnected");

        Ok(())
    }

    /// Bind the session to a target process's memory
    ///
    /// Probes the pid with the null signal first; only a live target is
    /// offered to the driver. On success the driver rebinds its memory
    /// view, so any previously established cursor position is
    /// meaningless and must be set again before the next transfer.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`]; `InvalidTarget` if the liveness probe
    /// fails (the bind command is never issued) or the driver reports no
    /// valid target was set.
    pub fn attach_to_pid(&mut self, pid: Pid) -> Result<()> {
        self.ensure_connected()?;

        if !probe::process_alive(pid) {
            return Err(memhole_core::Error::InvalidTarget { pid }.into());
        }

        let base = self
            .channel
            .control(ControlCommand::SetPid, pid.get() as i64)?;
        if base == 0 {
            return Err(memhole_core::Error::InvalidTarget { pid }.into());
        }

        self.session.attach()?;

        debug!("Attached to pid {} (base {})", pid, Address::new(base as u64));

        Ok(())
    }

    /// Set the memory cursor; returns the resulting address
    ///
    /// Driver-level failures (an unmapped address, say) come back as the
    /// raw channel error, unreinterpreted.
    pub fn set_memory_position(&mut self, pos: Address) -> Result<Address> {
        self.ensure_connected()?;

        let ret = self
            .channel
            .control(ControlCommand::SetPos, pos.get() as i64)?;
        Ok(Address::new(ret as u64))
    }

    /// Read the current memory cursor
    pub fn get_memory_position(&mut self) -> Result<Address> {
        self.ensure_connected()?;

        let ret = self.channel.control(ControlCommand::GetPos, 0)?;
        Ok(Address::new(ret as u64))
    }

    /// Negotiate the driver's transfer buffer for a `len`-byte transfer
    ///
    /// A resize command goes out only when `len` is strictly smaller
    /// than the tracked capacity; the driver grows its buffer implicitly
    /// when a transfer demands it, so larger requests just update the
    /// client-side capacity.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`]; `AllocationFailed` if the driver cannot
    /// allocate the requested buffer (tracked capacity is left as it
    /// was).
    pub fn set_buffer_size(&mut self, len: u64) -> Result<()> {
        self.ensure_connected()?;

        if len < self.session.buffer_capacity() {
            let ret = self.channel.control(ControlCommand::SetBufLen, len as i64)?;
            if ret != 0 {
                return Err(memhole_core::Error::AllocationFailed { requested: len }.into());
            }
            debug!("Driver buffer shrunk to {} bytes", len);
        }

        self.session.record_buffer(len);
        Ok(())
    }

    /// Read `len` bytes at the current cursor
    ///
    /// The driver advances the cursor by the transferred count. A short
    /// read is partial success: the returned buffer holds however many
    /// bytes the driver delivered, and callers needing exact-length
    /// semantics compare `bytes.len()` against `len`.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`]; `AllocationFailed` if buffer negotiation
    /// fails; raw channel errors otherwise.
    pub fn read_memory(&mut self, len: usize) -> Result<Bytes> {
        self.ensure_connected()?;
        self.set_buffer_size(len as u64)?;

        let mut buf = vec![0u8; len];
        let n = self.channel.read(&mut buf)?;
        if n < len {
            debug!("Short read: {} of {} bytes", n, len);
        }
        buf.truncate(n);

        Ok(Bytes::from(buf))
    }

    /// Write `buf` at the current cursor; returns the count written
    ///
    /// Write capability is not re-checked here: a session opened
    /// read-only passes the client checks and the kernel rejects the
    /// write, which is the driver's contract to enforce.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`]; `AllocationFailed` if buffer negotiation
    /// fails; raw channel errors otherwise (including the rejected write
    /// on a read-only handle).
    pub fn write_memory(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_connected()?;
        self.set_buffer_size(buf.len() as u64)?;

        let n = self.channel.write(buf)?;
        if n < buf.len() {
            debug!("Short write: {} of {} bytes", n, buf.len());
        }

        Ok(n)
    }

    /// Read the kernel address of the driver's transfer buffer
    ///
    /// Returns the null address until the driver first allocates the
    /// buffer (driver series 1.3).
    pub fn get_buffer_addr(&mut self) -> Result<Address> {
        self.ensure_connected()?;

        let ret = self.channel.control(ControlCommand::GetBufAddr, 0)?;
        Ok(Address::new(ret as u64))
    }

    // Helper methods

    fn ensure_connected(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }
}
