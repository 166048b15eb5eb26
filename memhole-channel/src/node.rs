//! Device node channel
//!
//! Talks to the real memhole device. Control commands are encoded onto
//! the wire the way every wrapper generation encodes them: the selector
//! rides the `whence` argument of `lseek64`, the operand rides the
//! offset.

use std::ffi::CString;
use std::os::raw::c_void;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use memhole_core::{ControlCommand, MEMHOLE_PATH};
use memhole_types::AccessMode;

use crate::{error::*, Channel};

/// Channel over a memhole device node
pub struct DeviceNode {
    path: PathBuf,
    fd: Option<i32>,
    close_on_exec: bool,
}

impl DeviceNode {
    /// Create a channel for the well-known device path
    pub fn new() -> Self {
        Self::with_path(MEMHOLE_PATH)
    }

    /// Create a channel for a non-default device path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fd: None,
            close_on_exec: true,
        }
    }

    /// Keep the descriptor open across `exec()` (the default is to close
    /// it, per wrapper v1.7)
    pub fn keep_across_exec(mut self) -> Self {
        self.close_on_exec = false;
        self
    }

    /// Device node path
    pub fn node_path(&self) -> &Path {
        &self.path
    }

    fn c_path(&self) -> Result<CString> {
        CString::new(self.path.as_os_str().as_bytes())
            .map_err(|_| Error::InvalidPath(self.path.display().to_string()))
    }

    fn fd(&self) -> Result<i32> {
        self.fd.ok_or(Error::NotConnected)
    }
}

impl Default for DeviceNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for DeviceNode {
    fn open(&mut self, access: AccessMode) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }

        let c_path = self.c_path()?;

        // Existence is checked separately from open so a missing node and
        // a busy node stay distinguishable to the caller.
        if unsafe { libc::access(c_path.as_ptr(), libc::F_OK) } != 0 {
            return Err(Error::DeviceNotFound {
                path: self.path.display().to_string(),
            });
        }

        let mut flags = match access {
            AccessMode::ReadOnly => libc::O_RDONLY,
            AccessMode::ReadWrite => libc::O_RDWR,
        };
        if self.close_on_exec {
            flags |= libc::O_CLOEXEC;
        }

        debug!("Opening {} ({})...", self.path.display(), access);

        let fd = unsafe { libc::open(c_path.as_ptr(), flags) };
        if fd < 0 {
            // The driver holds its handle semaphore with a trylock, so a
            // refused open is the busy case.
            return Err(Error::DeviceBusy {
                path: self.path.display().to_string(),
                source: std::io::Error::last_os_error(),
            });
        }

        debug!("Opened {} (fd={})", self.path.display(), fd);

        self.fd = Some(fd);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let fd = self.fd()?;

        debug!("Closing {} (fd={})...", self.path.display(), fd);

        if unsafe { libc::close(fd) } != 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        self.fd = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    fn control(&mut self, command: ControlCommand, arg: i64) -> Result<i64> {
        let fd = self.fd()?;

        let ret = unsafe { libc::lseek64(fd, arg, command.selector()) };
        if ret == -1 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        trace!("{} arg={} -> {}", command, arg, ret);

        Ok(ret)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let fd = self.fd()?;

        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut c_void, buf.len()) };
        if n < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        let n = n as usize;

        trace!("Read {} bytes: {:02X?}", n, &buf[..n.min(16)]);

        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let fd = self.fd()?;

        trace!("Writing {} bytes: {:02X?}", buf.len(), &buf[..buf.len().min(16)]);

        let n = unsafe { libc::write(fd, buf.as_ptr() as *const c_void, buf.len()) };
        if n < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        Ok(n as usize)
    }

    fn path(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for DeviceNode {
    fn drop(&mut self) {
        if let Some(fd) = self.fd.take() {
            warn!("Device node dropped while still open (fd={})", fd);
            unsafe { libc::close(fd) };
        }
    }
}
