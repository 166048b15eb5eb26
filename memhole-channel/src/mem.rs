//! In-memory emulated device
//!
//! Emulates the driver contract for tests and development: one open
//! handle at a time, per-pid target images, cursor advance on transfer,
//! and the sentinel command results of the real module. A [`MemDevice`]
//! stands in for the loaded module; [`MemChannel`]s hand out handles to
//! it and record every control command so tests can assert exactly what
//! went over the wire.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use tracing::trace;

use memhole_core::ControlCommand;
use memhole_types::{AccessMode, Address, Pid};

use crate::{error::*, Channel};

/// Emulated kernel address of the driver's transfer buffer
const BUF_ADDR: u64 = 0xffff_c900_0040_0000;

/// A target process's memory, as one contiguous image at a base address
#[derive(Debug, Clone)]
struct TargetImage {
    base: u64,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct MemState {
    open: bool,
    attached: Option<i32>,
    cursor: u64,
    buf_size: u64,
    buf_addr: u64,
    fail_allocation: bool,
    targets: HashMap<i32, TargetImage>,
    commands: Vec<(ControlCommand, i64)>,
}

impl MemState {
    fn grow_buffer(&mut self, len: u64) {
        // The driver allocates on demand when a transfer exceeds the
        // current buffer; shrinking only happens through LSMSLEN.
        if len > self.buf_size {
            self.buf_size = len;
            self.buf_addr = BUF_ADDR;
        }
    }

    fn image_at_cursor(&self, len: usize) -> io::Result<(i32, usize, usize)> {
        let fault = || io::Error::from_raw_os_error(libc::EFAULT);
        let pid = self.attached.ok_or_else(fault)?;
        let img = self.targets.get(&pid).ok_or_else(fault)?;
        let offset = self.cursor.checked_sub(img.base).ok_or_else(fault)? as usize;
        if offset >= img.bytes.len() {
            return Err(fault());
        }
        let n = len.min(img.bytes.len() - offset);
        Ok((pid, offset, n))
    }
}

/// Emulated memhole device
///
/// Clones share the same emulated driver state, so a test can keep the
/// device while a session owns a channel to it.
#[derive(Clone, Default)]
pub struct MemDevice {
    state: Rc<RefCell<MemState>>,
}

impl MemDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target process image starting at `base`
    pub fn add_target(&self, pid: Pid, base: Address, bytes: impl Into<Vec<u8>>) {
        self.state.borrow_mut().targets.insert(
            pid.get(),
            TargetImage {
                base: base.get(),
                bytes: bytes.into(),
            },
        );
    }

    /// Make subsequent buffer resize commands fail, as the module does
    /// when kmalloc refuses
    pub fn fail_allocations(&self, fail: bool) {
        self.state.borrow_mut().fail_allocation = fail;
    }

    /// Hand out a channel to this device
    pub fn channel(&self) -> MemChannel {
        MemChannel {
            device: Rc::clone(&self.state),
            open: false,
            access: AccessMode::ReadOnly,
        }
    }

    /// Every control command issued so far, in order
    pub fn commands(&self) -> Vec<(ControlCommand, i64)> {
        self.state.borrow().commands.clone()
    }

    /// Driver-side cursor
    pub fn cursor(&self) -> Address {
        Address::new(self.state.borrow().cursor)
    }

    /// Currently bound target, if any
    pub fn attached(&self) -> Option<Pid> {
        self.state.borrow().attached.and_then(|p| Pid::new(p).ok())
    }

    /// Whether a handle is currently open
    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    /// Snapshot of a target's memory image
    pub fn memory_of(&self, pid: Pid) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .targets
            .get(&pid.get())
            .map(|img| img.bytes.clone())
    }
}

/// Channel handle onto a [`MemDevice`]
pub struct MemChannel {
    device: Rc<RefCell<MemState>>,
    open: bool,
    access: AccessMode,
}

impl Channel for MemChannel {
    fn open(&mut self, access: AccessMode) -> Result<()> {
        if self.open {
            return Err(Error::AlreadyConnected);
        }

        let mut st = self.device.borrow_mut();
        if st.open {
            // Mirrors the driver's handle semaphore trylock
            return Err(Error::DeviceBusy {
                path: self.path(),
                source: io::Error::from_raw_os_error(libc::EBUSY),
            });
        }

        st.open = true;
        self.open = true;
        self.access = access;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::NotConnected);
        }

        self.device.borrow_mut().open = false;
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn control(&mut self, command: ControlCommand, arg: i64) -> Result<i64> {
        if !self.open {
            return Err(Error::NotConnected);
        }

        let mut st = self.device.borrow_mut();
        st.commands.push((command, arg));

        let ret = match command {
            ControlCommand::SetPid => match st.targets.get(&(arg as i32)) {
                Some(img) => {
                    let base = img.base;
                    st.attached = Some(arg as i32);
                    st.cursor = base;
                    base as i64
                }
                None => 0,
            },
            ControlCommand::SetPos => {
                st.cursor = arg as u64;
                arg
            }
            ControlCommand::GetPos => st.cursor as i64,
            ControlCommand::SetBufLen => {
                if st.fail_allocation {
                    -(libc::ENOMEM as i64)
                } else {
                    st.buf_size = arg as u64;
                    st.buf_addr = BUF_ADDR;
                    0
                }
            }
            ControlCommand::GetBufAddr => st.buf_addr as i64,
        };

        trace!("{} arg={} -> {}", command, arg, ret);

        Ok(ret)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.open {
            return Err(Error::NotConnected);
        }

        let mut st = self.device.borrow_mut();
        let (pid, offset, n) = st.image_at_cursor(buf.len())?;
        if let Some(img) = st.targets.get(&pid) {
            buf[..n].copy_from_slice(&img.bytes[offset..offset + n]);
        }
        st.cursor += n as u64;
        st.grow_buffer(buf.len() as u64);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(Error::NotConnected);
        }

        if !self.access.is_writable() {
            // The kernel rejects writes through a descriptor opened
            // read-only before the driver ever sees them.
            return Err(Error::Io(io::Error::from_raw_os_error(libc::EBADF)));
        }

        let mut st = self.device.borrow_mut();
        let (pid, offset, n) = st.image_at_cursor(buf.len())?;
        if let Some(img) = st.targets.get_mut(&pid) {
            img.bytes[offset..offset + n].copy_from_slice(&buf[..n]);
        }
        st.cursor += n as u64;
        st.grow_buffer(buf.len() as u64);
        Ok(n)
    }

    fn path(&self) -> String {
        "mem:emulated".to_string()
    }
}

impl Drop for MemChannel {
    fn drop(&mut self) {
        if self.open {
            // release the emulated handle semaphore
            self.device.borrow_mut().open = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pid(n: i32) -> Pid {
        Pid::new(n).unwrap()
    }

    fn open_device() -> (MemDevice, MemChannel) {
        let device = MemDevice::new();
        device.add_target(pid(100), Address::new(0x1000), vec![0u8; 64]);
        let mut channel = device.channel();
        channel.open(AccessMode::ReadWrite).unwrap();
        (device, channel)
    }

    #[test]
    fn test_single_open_handle() {
        let (device, _channel) = open_device();

        let mut second = device.channel();
        let result = second.open(AccessMode::ReadOnly);
        assert!(matches!(result, Err(Error::DeviceBusy { .. })));
    }

    #[test]
    fn test_reopen_after_close() {
        let (device, mut channel) = open_device();
        channel.close().unwrap();

        let mut second = device.channel();
        second.open(AccessMode::ReadOnly).unwrap();
        assert!(second.is_open());
    }

    #[test]
    fn test_set_pid_sentinel() {
        let (_device, mut channel) = open_device();

        assert_eq!(channel.control(ControlCommand::SetPid, 999).unwrap(), 0);
        assert_eq!(
            channel.control(ControlCommand::SetPid, 100).unwrap(),
            0x1000
        );
    }

    #[test]
    fn test_cursor_advances_on_read() {
        let (device, mut channel) = open_device();
        channel.control(ControlCommand::SetPid, 100).unwrap();
        channel.control(ControlCommand::SetPos, 0x1010).unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(channel.read(&mut buf).unwrap(), 8);
        assert_eq!(device.cursor(), Address::new(0x1018));
        assert_eq!(channel.control(ControlCommand::GetPos, 0).unwrap(), 0x1018);
    }

    #[test]
    fn test_short_read_at_image_end() {
        let (_device, mut channel) = open_device();
        channel.control(ControlCommand::SetPid, 100).unwrap();
        channel.control(ControlCommand::SetPos, 0x1000 + 60).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(channel.read(&mut buf).unwrap(), 4);
    }

    #[test]
    fn test_read_outside_image_faults() {
        let (_device, mut channel) = open_device();
        channel.control(ControlCommand::SetPid, 100).unwrap();
        channel.control(ControlCommand::SetPos, 0x10).unwrap();

        let mut buf = [0u8; 8];
        let err = channel.read(&mut buf).unwrap_err();
        match err {
            Error::Io(e) => assert_eq!(e.raw_os_error(), Some(libc::EFAULT)),
            other => panic!("expected Io(EFAULT), got {:?}", other),
        }
    }

    #[test]
    fn test_write_requires_write_mode() {
        let device = MemDevice::new();
        device.add_target(pid(100), Address::new(0x1000), vec![0u8; 64]);
        let mut channel = device.channel();
        channel.open(AccessMode::ReadOnly).unwrap();
        channel.control(ControlCommand::SetPid, 100).unwrap();

        let err = channel.write(b"data").unwrap_err();
        match err {
            Error::Io(e) => assert_eq!(e.raw_os_error(), Some(libc::EBADF)),
            other => panic!("expected Io(EBADF), got {:?}", other),
        }
    }

    #[test]
    fn test_write_lands_in_image() {
        let (device, mut channel) = open_device();
        channel.control(ControlCommand::SetPid, 100).unwrap();
        channel.control(ControlCommand::SetPos, 0x1004).unwrap();
        channel.write(&[0xAA, 0xBB]).unwrap();

        let image = device.memory_of(pid(100)).unwrap();
        assert_eq!(&image[4..6], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_allocation_failure_sentinel() {
        let (device, mut channel) = open_device();
        device.fail_allocations(true);

        let ret = channel.control(ControlCommand::SetBufLen, 4096).unwrap();
        assert_ne!(ret, 0);
    }

    #[test]
    fn test_buffer_addr_null_until_allocated() {
        let (_device, mut channel) = open_device();
        assert_eq!(channel.control(ControlCommand::GetBufAddr, 0).unwrap(), 0);

        channel.control(ControlCommand::SetBufLen, 512).unwrap();
        assert_ne!(channel.control(ControlCommand::GetBufAddr, 0).unwrap(), 0);
    }

    #[test]
    fn test_command_log() {
        let (device, mut channel) = open_device();
        channel.control(ControlCommand::SetPid, 100).unwrap();
        channel.control(ControlCommand::SetPos, 0x1000).unwrap();

        assert_eq!(
            device.commands(),
            vec![
                (ControlCommand::SetPid, 100),
                (ControlCommand::SetPos, 0x1000)
            ]
        );
    }
}
