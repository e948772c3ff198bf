//! Process signals
//!
//! The sandbox has no signal delivery. These values only exist so callers
//! can name a signal, and so `kill` can turn one into an exit status.

use std::fmt;

/// A number describing a process signal
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct Signal(i32);

impl Signal {
    pub const SIGCHLD: Self = Self(1);
    pub const SIGINT: Self = Self(2);
    pub const SIGKILL: Self = Self(3);
    pub const SIGTRAP: Self = Self(4);
    pub const SIGQUIT: Self = Self(5);
    pub const SIGTERM: Self = Self(6);

    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Exit status of a process terminated by this signal
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        128_i32.saturating_add(self.0)
    }

    #[must_use]
    pub const fn description(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("child exited"),
            2 => Some("interrupt"),
            3 => Some("killed"),
            4 => Some("trace/breakpoint trap"),
            5 => Some("quit"),
            6 => Some("terminated"),
            _ => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(desc) => f.write_str(desc),
            None => write!(f, "signal {}", self.0),
        }
    }
}

impl From<i32> for Signal {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_signals() {
        assert_eq!(Signal::SIGKILL.to_string(), "killed");
        assert_eq!(Signal::SIGCHLD.to_string(), "child exited");
        assert_eq!(Signal::SIGTERM.to_string(), "terminated");
    }

    #[test]
    fn unnamed_signals_render_generically() {
        assert_eq!(Signal::from_raw(0).to_string(), "signal 0");
        assert_eq!(Signal::from_raw(7).to_string(), "signal 7");
        assert_eq!(Signal::from_raw(-1).to_string(), "signal -1");
    }

    #[test]
    fn exit_code_offsets_by_128() {
        assert_eq!(Signal::SIGKILL.exit_code(), 131);
        assert_eq!(Signal::SIGINT.exit_code(), 130);
        assert_eq!(Signal::from_raw(i32::MAX).exit_code(), i32::MAX);
    }
}
