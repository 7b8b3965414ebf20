//! Process liveness checks for stale lock detection.

#[cfg(unix)]
use std::io;

/// Check whether a process with the given id exists.
///
/// Uses `kill(pid, 0)`, which probes for existence without delivering a
/// signal. `EPERM` means the process exists but belongs to another user, so
/// it counts as alive: a lock is never reclaimed from a process we merely
/// cannot signal.
#[must_use]
pub fn is_pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };

    #[cfg(unix)]
    {
        // SAFETY: signal 0 performs only the existence and permission checks.
        #[allow(unsafe_code)]
        let result = unsafe { libc::kill(pid, 0) };
        if result == 0 {
            return true;
        }
        io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }

    #[cfg(not(unix))]
    {
        // No cheap probe here; never treat a holder as dead
        let _ = pid;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_is_alive() {
        assert!(is_pid_alive(std::process::id()));
    }

    #[test]
    fn test_pid_zero_is_never_alive() {
        assert!(!is_pid_alive(0));
    }

    #[cfg(unix)]
    #[test]
    fn test_out_of_range_pid_is_dead() {
        // Above the kernel's pid_max ceiling of 2^22
        assert!(!is_pid_alive(4_000_000_000));
        assert!(!is_pid_alive(4_194_305));
    }

    #[cfg(unix)]
    #[test]
    fn test_exited_child_is_dead() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(!is_pid_alive(pid));
    }
}
