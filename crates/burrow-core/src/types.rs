//! Sandbox ABI types

use crate::errno::Errno;
use serde::{Deserialize, Serialize};

/// Host file descriptor number
pub type Fd = u32;

/// Opaque cursor used to resume directory iteration
pub type Dircookie = u64;

/// Cookie that starts a directory listing from its first entry
pub const DIRCOOKIE_START: Dircookie = 0;

/// Nanoseconds since the epoch of some clock
pub type Timestamp = u64;

/// Type of a file as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FileType {
    Unknown = 0,
    BlockDevice = 1,
    CharacterDevice = 2,
    Directory = 3,
    RegularFile = 4,
    SocketDgram = 5,
    SocketStream = 6,
    SymbolicLink = 7,
}

impl FileType {
    /// Decode a host file-type code. Codes outside the table read as `Unknown`.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::BlockDevice,
            2 => Self::CharacterDevice,
            3 => Self::Directory,
            4 => Self::RegularFile,
            5 => Self::SocketDgram,
            6 => Self::SocketStream,
            7 => Self::SymbolicLink,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }
}

/// Origin of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Whence {
    /// Relative to the start of the file
    Set = 0,
    /// Relative to the current position
    Cur = 1,
    /// Relative to the end of the file
    End = 2,
}

impl TryFrom<i32> for Whence {
    type Error = Errno;

    fn try_from(raw: i32) -> Result<Self, Errno> {
        match raw {
            0 => Ok(Self::Set),
            1 => Ok(Self::Cur),
            2 => Ok(Self::End),
            _ => Err(Errno::EINVAL),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ClockId {
    Realtime = 0,
    Monotonic = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: i64,
}

impl Timespec {
    #[must_use]
    pub const fn new(sec: i64, nsec: i64) -> Self {
        Self { sec, nsec }
    }

    #[must_use]
    pub const fn from_timestamp(t: Timestamp) -> Self {
        Self {
            sec: (t / 1_000_000_000) as i64,
            nsec: (t % 1_000_000_000) as i64,
        }
    }

    /// Nanoseconds represented by this value. Negative fields wrap.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        (self.sec.wrapping_mul(1_000_000_000) as u64).wrapping_add(self.nsec as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timeval {
    pub sec: i64,
    pub usec: i64,
}

impl Timeval {
    #[must_use]
    pub const fn new(sec: i64, usec: i64) -> Self {
        Self { sec, usec }
    }

    /// Sub-microsecond digits of `t` are dropped.
    #[must_use]
    pub const fn from_timestamp(t: Timestamp) -> Self {
        Self {
            sec: (t / 1_000_000_000) as i64,
            usec: ((t % 1_000_000_000) / 1_000) as i64,
        }
    }

    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        (self.sec.wrapping_mul(1_000_000_000) as u64)
            .wrapping_add(self.usec.wrapping_mul(1_000) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filetype_codes() {
        assert_eq!(FileType::from_raw(3), FileType::Directory);
        assert_eq!(FileType::from_raw(4), FileType::RegularFile);
        assert_eq!(FileType::from_raw(8), FileType::Unknown);
        assert_eq!(FileType::from_raw(255), FileType::Unknown);
        assert_eq!(FileType::SymbolicLink.raw(), 7);
    }

    #[test]
    fn whence_rejects_unknown_origin() {
        assert_eq!(Whence::try_from(0), Ok(Whence::Set));
        assert_eq!(Whence::try_from(2), Ok(Whence::End));
        assert_eq!(Whence::try_from(3), Err(Errno::EINVAL));
        assert_eq!(Whence::try_from(-1), Err(Errno::EINVAL));
    }

    #[test]
    fn timeval_truncates_to_microseconds() {
        let tv = Timeval::from_timestamp(1_700_000_000_123_456_789);
        assert_eq!(tv, Timeval::new(1_700_000_000, 123_456));
        assert_eq!(tv.timestamp(), 1_700_000_000_123_456_000);
    }

    #[test]
    fn timespec_keeps_nanoseconds() {
        let ts = Timespec::from_timestamp(5_000_000_007);
        assert_eq!(ts, Timespec::new(5, 7));
        assert_eq!(ts.timestamp(), 5_000_000_007);
    }
}
