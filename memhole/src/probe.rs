//! Target process liveness probe

use memhole_types::Pid;

/// Probe a pid with the null signal (no signal is delivered)
///
/// Any failure counts as unreachable, `EPERM` included; the driver would
/// refuse the bind for such a target anyway.
pub fn process_alive(pid: Pid) -> bool {
    unsafe { libc::kill(pid.get(), 0) == 0 }
}
