//! Session state bookkeeping
//!
//! A session tracks the client side of one device handle:
//! - Connection state (the driver allows one open handle at a time)
//! - The last negotiated transfer buffer capacity
//!
//! The driver additionally tracks the attached pid and the memory cursor;
//! those are queried through control commands, never mirrored here. The
//! struct is plain owned data with no interior mutability: the device
//! protocol is strictly sequential and the session is not thread-safe.

use tracing::trace;

use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No handle open
    Disconnected,

    /// Handle open, no target bound yet
    Connected,

    /// Handle open and bound to a target process
    Attached,
}

/// Client-side bookkeeping for one device handle
#[derive(Debug, Clone)]
pub struct Session {
    /// Current session state
    state: SessionState,

    /// Last negotiated driver buffer capacity in bytes (0 when unknown)
    buffer_capacity: u64,
}

impl Session {
    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            buffer_capacity: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if a handle is open
    pub fn is_connected(&self) -> bool {
        !matches!(self.state, SessionState::Disconnected)
    }

    /// Check if a target is bound
    pub fn is_attached(&self) -> bool {
        matches!(self.state, SessionState::Attached)
    }

    /// Last negotiated buffer capacity in bytes
    pub fn buffer_capacity(&self) -> u64 {
        self.buffer_capacity
    }

    /// Record a freshly opened handle
    pub fn open(&mut self) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "cannot open from state: {:?}",
                self.state
            )));
        }

        self.state = SessionState::Connected;
        self.buffer_capacity = 0;
        trace!("session opened");
        Ok(())
    }

    /// Record a successful target bind
    ///
    /// Re-attaching from `Attached` is allowed; the driver simply rebinds
    /// its memory view.
    pub fn attach(&mut self) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Err(Error::InvalidSessionState(
                "cannot attach while disconnected".into(),
            ));
        }

        self.state = SessionState::Attached;
        trace!("session attached");
        Ok(())
    }

    /// Record a closed handle and forget the negotiated capacity
    pub fn close(&mut self) {
        self.state = SessionState::Disconnected;
        self.buffer_capacity = 0;
        trace!("session closed");
    }

    /// Record the capacity resulting from a buffer negotiation
    ///
    /// Both negotiation outcomes land here: an explicit shrink command
    /// and the implicit on-demand growth the driver performs when a
    /// transfer exceeds the current buffer.
    pub fn record_buffer(&mut self, len: u64) {
        trace!(capacity = len, "buffer capacity recorded");
        self.buffer_capacity = len;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_session_new() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_connected());
        assert!(!session.is_attached());
        assert_eq!(session.buffer_capacity(), 0);
    }

    #[test]
    fn test_session_open() {
        let mut session = Session::new();
        session.open().unwrap();

        assert_eq!(session.state(), SessionState::Connected);
        assert!(session.is_connected());
        assert!(!session.is_attached());
    }

    #[test]
    fn test_session_attach() {
        let mut session = Session::new();
        session.open().unwrap();
        session.attach().unwrap();

        assert_eq!(session.state(), SessionState::Attached);
        assert!(session.is_attached());

        // rebinding is a valid transition
        session.attach().unwrap();
        assert_eq!(session.state(), SessionState::Attached);
    }

    #[test]
    fn test_session_close_resets_capacity() {
        let mut session = Session::new();
        session.open().unwrap();
        session.record_buffer(4096);
        assert_eq!(session.buffer_capacity(), 4096);

        session.close();

        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.buffer_capacity(), 0);
    }

    #[test]
    fn test_open_resets_stale_capacity() {
        let mut session = Session::new();
        session.open().unwrap();
        session.record_buffer(512);
        session.close();
        session.open().unwrap();
        assert_eq!(session.buffer_capacity(), 0);
    }

    #[test]
    fn test_invalid_state_transitions() {
        let mut session = Session::new();

        // Cannot attach without opening
        assert!(session.attach().is_err());

        // Cannot open twice
        session.open().unwrap();
        assert!(session.open().is_err());
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Open,
        Attach,
        Close,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Open), Just(Op::Attach), Just(Op::Close)]
    }

    proptest! {
        /// Transitions never wedge the state machine: open succeeds
        /// exactly from Disconnected, attach exactly from an open
        /// session, and close always returns to the initial state.
        #[test]
        fn prop_transitions_consistent(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let mut session = Session::new();
            for op in ops {
                let before = session.state();
                match op {
                    Op::Open => {
                        let res = session.open();
                        prop_assert_eq!(res.is_ok(), before == SessionState::Disconnected);
                    }
                    Op::Attach => {
                        let res = session.attach();
                        prop_assert_eq!(res.is_ok(), before != SessionState::Disconnected);
                    }
                    Op::Close => {
                        session.close();
                        prop_assert_eq!(session.state(), SessionState::Disconnected);
                        prop_assert_eq!(session.buffer_capacity(), 0);
                    }
                }
                prop_assert_eq!(session.is_connected(), session.state() != SessionState::Disconnected);
            }
        }
    }
}
