//! Process, identity and clock emulation
//!
//! The sandbox is one process with no users, no process tree and no way to
//! spawn. Identity queries answer with configured placeholders, signals
//! can only terminate the caller, and everything that would need a real
//! kernel fails with `ENOSYS`.

use crate::config::ShimConfig;
use crate::errno::Errno;
use crate::host::Host;
use crate::signal::Signal;
use crate::types::{ClockId, Timespec, Timeval};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The only key `sysctl` knows
pub const SYSCTL_HOSTNAME: &str = "kern.hostname";

/// Explicit handle for process-wide state
#[derive(Debug)]
pub struct ProcessState<H> {
    config: ShimConfig,
    umask: Mutex<u32>,
    host: H,
}

impl<H: Host> ProcessState<H> {
    #[must_use]
    pub fn new(config: ShimConfig, host: H) -> Self {
        let umask = Mutex::new(config.umask);
        Self {
            config,
            umask,
            host,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ShimConfig {
        &self.config
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    #[must_use]
    pub const fn getuid(&self) -> u32 {
        self.config.uid
    }

    #[must_use]
    pub const fn getgid(&self) -> u32 {
        self.config.gid
    }

    #[must_use]
    pub const fn geteuid(&self) -> u32 {
        self.config.euid
    }

    #[must_use]
    pub const fn getegid(&self) -> u32 {
        self.config.egid
    }

    #[must_use]
    pub const fn getpid(&self) -> u32 {
        self.config.pid
    }

    #[must_use]
    pub const fn getppid(&self) -> u32 {
        self.config.ppid
    }

    #[must_use]
    pub fn getgroups(&self) -> &[u32] {
        &self.config.groups
    }

    /// Look up a kernel parameter. Only `kern.hostname` exists.
    pub fn sysctl(&self, key: &str) -> Result<&str, Errno> {
        if key == SYSCTL_HOSTNAME {
            Ok(&self.config.hostname)
        } else {
            Err(Errno::ENOSYS)
        }
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.config.hostname
    }

    /// Wall-clock time, microsecond resolution
    pub fn gettimeofday(&self) -> Result<Timeval, Errno> {
        let now = self
            .host
            .clock_time_get(ClockId::Realtime, self.config.clock_precision_ns)?;
        tracing::trace!(now, "realtime clock");
        Ok(Timeval::from_timestamp(now))
    }

    pub fn clock_gettime(&self, clock: ClockId) -> Result<Timespec, Errno> {
        let now = self
            .host
            .clock_time_get(clock, self.config.clock_precision_ns)?;
        Ok(Timespec::from_timestamp(now))
    }

    /// Deliver `sig`.
    ///
    /// There is no other process to signal, so the caller exits with
    /// status `128 + sig` whatever `pid` names.
    pub fn kill(&self, pid: i32, sig: Signal) -> ! {
        let code = sig.exit_code();
        tracing::warn!(pid, signal = %sig, code, "signal terminates the process");
        self.host.proc_exit(code)
    }

    /// Replace the file mode creation mask, returning the previous one.
    ///
    /// The mask is only stored. Nothing enforces it.
    pub fn umask(&self, mask: u32) -> u32 {
        let old = std::mem::replace(&mut *self.umask.lock(), mask);
        tracing::debug!(old, new = mask, "umask changed");
        old
    }
}

/// Trap-style syscall dispatch. Nothing is dispatched.
pub const fn syscall(
    _trap: usize,
    _a1: usize,
    _a2: usize,
    _a3: usize,
) -> Result<(usize, usize), Errno> {
    Err(Errno::ENOSYS)
}

pub const fn syscall6(
    _trap: usize,
    _a1: usize,
    _a2: usize,
    _a3: usize,
    _a4: usize,
    _a5: usize,
    _a6: usize,
) -> Result<(usize, usize), Errno> {
    Err(Errno::ENOSYS)
}

pub const fn raw_syscall(
    _trap: usize,
    _a1: usize,
    _a2: usize,
    _a3: usize,
) -> Result<(usize, usize), Errno> {
    Err(Errno::ENOSYS)
}

pub const fn raw_syscall6(
    _trap: usize,
    _a1: usize,
    _a2: usize,
    _a3: usize,
    _a4: usize,
    _a5: usize,
    _a6: usize,
) -> Result<(usize, usize), Errno> {
    Err(Errno::ENOSYS)
}

pub const fn sendfile(
    _out_fd: i32,
    _in_fd: i32,
    _offset: Option<&mut i64>,
    _count: usize,
) -> Result<usize, Errno> {
    Err(Errno::ENOSYS)
}

/// Spawn a process. Always `ENOSYS`.
pub const fn start_process(
    _argv0: &str,
    _argv: &[&str],
    _attr: &ProcAttr,
) -> Result<(i32, usize), Errno> {
    Err(Errno::ENOSYS)
}

/// Wait for a child. Always `ENOSYS`; there are no children.
pub const fn wait4(
    _pid: i32,
    _status: Option<&mut WaitStatus>,
    _options: i32,
    _rusage: Option<&mut Rusage>,
) -> Result<i32, Errno> {
    Err(Errno::ENOSYS)
}

/// Status of a child that can never exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitStatus(u32);

impl WaitStatus {
    #[must_use]
    pub const fn exited(self) -> bool {
        false
    }

    #[must_use]
    pub const fn signaled(self) -> bool {
        false
    }

    #[must_use]
    pub const fn stopped(self) -> bool {
        false
    }

    #[must_use]
    pub const fn continued(self) -> bool {
        false
    }

    #[must_use]
    pub const fn core_dump(self) -> bool {
        false
    }

    #[must_use]
    pub const fn exit_status(self) -> i32 {
        0
    }

    #[must_use]
    pub const fn signal(self) -> Signal {
        Signal::from_raw(0)
    }

    #[must_use]
    pub const fn stop_signal(self) -> Signal {
        Signal::from_raw(0)
    }

    #[must_use]
    pub const fn trap_cause(self) -> i32 {
        0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rusage {
    pub utime: Timeval,
    pub stime: Timeval,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcAttr {
    pub dir: Option<String>,
    pub env: Vec<String>,
    pub files: Vec<u32>,
    pub sys: Option<SysProcAttr>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysProcAttr;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{Exited, MockHost};
    use pretty_assertions::assert_eq;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn state() -> ProcessState<MockHost> {
        ProcessState::new(ShimConfig::default(), MockHost::default())
    }

    #[test]
    fn identity_placeholders() {
        let state = state();
        assert_eq!(
            (
                state.getuid(),
                state.getgid(),
                state.geteuid(),
                state.getegid(),
                state.getpid(),
                state.getppid()
            ),
            (1, 1, 1, 1, 3, 2)
        );
        assert_eq!(state.getgroups(), &[1]);
    }

    #[test]
    fn identity_follows_config() {
        let config = ShimConfig::builder().uid(1000).pid(42).groups([7, 8]).build();
        let state = ProcessState::new(config, MockHost::default());
        assert_eq!(state.getuid(), 1000);
        assert_eq!(state.geteuid(), 1000);
        assert_eq!(state.getpid(), 42);
        assert_eq!(state.getgroups(), &[7, 8]);
    }

    #[test]
    fn sysctl_knows_only_hostname() {
        let state = state();
        assert_eq!(state.sysctl("kern.hostname"), Ok("js"));
        assert_eq!(state.sysctl("kern.ostype"), Err(Errno::ENOSYS));
        assert_eq!(state.sysctl(""), Err(Errno::ENOSYS));
    }

    #[test]
    fn gettimeofday_converts_realtime() {
        let state = state();
        *state.host().clock.lock() = Some(Ok(1_700_000_000_123_456_789));

        assert_eq!(
            state.gettimeofday(),
            Ok(Timeval::new(1_700_000_000, 123_456))
        );
        assert_eq!(*state.host().precisions.lock(), vec![1_000]);
    }

    #[test]
    fn clock_errors_propagate() {
        let state = state();
        *state.host().clock.lock() = Some(Err(Errno::EINVAL));
        assert_eq!(state.gettimeofday(), Err(Errno::EINVAL));
        assert_eq!(state.clock_gettime(ClockId::Monotonic), Err(Errno::EINVAL));
    }

    #[test]
    fn kill_exits_with_signal_status() {
        let state = state();
        let payload = catch_unwind(AssertUnwindSafe(|| state.kill(99, Signal::SIGKILL)))
            .expect_err("kill returned");
        assert_eq!(payload.downcast_ref::<Exited>(), Some(&Exited(131)));

        let payload = catch_unwind(AssertUnwindSafe(|| state.kill(0, Signal::SIGTERM)))
            .expect_err("kill returned");
        assert_eq!(payload.downcast_ref::<Exited>(), Some(&Exited(134)));
    }

    #[test]
    fn umask_swaps() {
        let state = state();
        assert_eq!(state.umask(0o022), 0);
        assert_eq!(state.umask(0o077), 0o022);
        assert_eq!(state.umask(0o077), 0o077);
    }

    #[test]
    fn umask_starts_from_config() {
        let config = ShimConfig::builder().umask(0o027).build();
        let state = ProcessState::new(config, MockHost::default());
        assert_eq!(state.umask(0), 0o027);
    }

    #[test]
    fn unsupported_calls_are_enosys() {
        assert_eq!(syscall(1, 2, 3, 4), Err(Errno::ENOSYS));
        assert_eq!(syscall6(1, 2, 3, 4, 5, 6, 7), Err(Errno::ENOSYS));
        assert_eq!(raw_syscall(1, 2, 3, 4), Err(Errno::ENOSYS));
        assert_eq!(raw_syscall6(1, 2, 3, 4, 5, 6, 7), Err(Errno::ENOSYS));
        assert_eq!(sendfile(1, 0, None, 4096), Err(Errno::ENOSYS));
        assert_eq!(
            start_process("/bin/true", &["true"], &ProcAttr::default()),
            Err(Errno::ENOSYS)
        );

        let mut status = WaitStatus::default();
        assert_eq!(wait4(-1, Some(&mut status), 0, None), Err(Errno::ENOSYS));
        assert!(!status.exited());
        assert_eq!(status.exit_status(), 0);
    }
}
