//! Sandbox error numbers
//!
//! The numbering follows `wasi_snapshot_preview1`. Rendering and
//! classification are pure functions of the numeric value: known codes map
//! to a fixed message table, anything else renders as `errno N`.

use std::fmt;
use std::io;

/// An unsigned number describing an error condition.
///
/// Zero is by convention not an error. Code converting a raw return value
/// should go through [`Errno::result`] rather than wrapping zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Errno(u32);

macro_rules! errno_codes {
    ($($name:ident = $code:literal => $msg:literal,)*) => {
        impl Errno {
            $(pub const $name: Self = Self($code);)*

            /// Constant name of a known code, e.g. `"ENOENT"`
            #[must_use]
            pub const fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($code => Some(stringify!($name)),)*
                    _ => None,
                }
            }
        }

        const ERRORSTR: &[&str] = &[$($msg,)*];
    };
}

errno_codes! {
    ESUCCESS = 0 => "",
    E2BIG = 1 => "Argument list too long",
    EACCES = 2 => "Permission denied",
    EADDRINUSE = 3 => "Address already in use",
    EADDRNOTAVAIL = 4 => "Address not available",
    EAFNOSUPPORT = 5 => "Address family not supported by protocol family",
    EAGAIN = 6 => "Try again",
    EALREADY = 7 => "Socket already connected",
    EBADF = 8 => "Bad file number",
    EBADMSG = 9 => "Trying to read unreadable message",
    EBUSY = 10 => "Device or resource busy",
    ECANCELED = 11 => "Operation canceled.",
    ECHILD = 12 => "No child processes",
    ECONNABORTED = 13 => "Connection aborted",
    ECONNREFUSED = 14 => "Connection refused",
    ECONNRESET = 15 => "Connection reset by peer",
    EDEADLK = 16 => "Deadlock condition",
    EDESTADDRREQ = 17 => "Destination address required",
    EDOM = 18 => "Math arg out of domain of func",
    EDQUOT = 19 => "Quota exceeded",
    EEXIST = 20 => "File exists",
    EFAULT = 21 => "Bad address",
    EFBIG = 22 => "File too large",
    EHOSTUNREACH = 23 => "Host is unreachable",
    EIDRM = 24 => "Identifier removed",
    EILSEQ = 25 => "EILSEQ",
    EINPROGRESS = 26 => "Connection already in progress",
    EINTR = 27 => "Interrupted system call",
    EINVAL = 28 => "Invalid argument",
    EIO = 29 => "I/O error",
    EISCONN = 30 => "Socket is already connected",
    EISDIR = 31 => "Is a directory",
    ELOOP = 32 => "Too many symbolic links",
    EMFILE = 33 => "Too many open files",
    EMLINK = 34 => "Too many links",
    EMSGSIZE = 35 => "Message too long",
    EMULTIHOP = 36 => "Multihop attempted",
    ENAMETOOLONG = 37 => "File name too long",
    ENETDOWN = 38 => "Network interface is not configured",
    ENETRESET = 39 => "Network dropped connection on reset",
    ENETUNREACH = 40 => "Network is unreachable",
    ENFILE = 41 => "File table overflow",
    ENOBUFS = 42 => "No buffer space available",
    ENODEV = 43 => "No such device",
    ENOENT = 44 => "No such file or directory",
    ENOEXEC = 45 => "Exec format error",
    ENOLCK = 46 => "No record locks available",
    ENOLINK = 47 => "The link has been severed",
    ENOMEM = 48 => "Out of memory",
    ENOMSG = 49 => "No message of desired type",
    ENOPROTOOPT = 50 => "Protocol not available",
    ENOSPC = 51 => "No space left on device",
    ENOSYS = 52 => "Not implemented on wasip1",
    ENOTCONN = 53 => "Socket is not connected",
    ENOTDIR = 54 => "Not a directory",
    ENOTEMPTY = 55 => "Directory not empty",
    ENOTRECOVERABLE = 56 => "State not recoverable",
    ENOTSOCK = 57 => "Socket operation on non-socket",
    ENOTSUP = 58 => "Not supported",
    ENOTTY = 59 => "Not a typewriter",
    ENXIO = 60 => "No such device or address",
    EOVERFLOW = 61 => "Value too large for defined data type",
    EOWNERDEAD = 62 => "Owner died",
    EPERM = 63 => "Operation not permitted",
    EPIPE = 64 => "Broken pipe",
    EPROTO = 65 => "Protocol error",
    EPROTONOSUPPORT = 66 => "Unknown protocol",
    EPROTOTYPE = 67 => "Protocol wrong type for socket",
    ERANGE = 68 => "Math result not representable",
    EROFS = 69 => "Read-only file system",
    ESPIPE = 70 => "Illegal seek",
    ESRCH = 71 => "No such process",
    ESTALE = 72 => "Stale file handle",
    ETIMEDOUT = 73 => "Connection timed out",
    ETXTBSY = 74 => "Text file busy",
    EXDEV = 75 => "Cross-device link",
    ENOTCAPABLE = 76 => "Capabilities insufficient",
}

impl Errno {
    /// Alias kept for code written against POSIX names.
    pub const EWOULDBLOCK: Self = Self::EAGAIN;

    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Convert a raw host return value, treating zero as success.
    pub const fn result(raw: u32) -> Result<(), Self> {
        if raw == 0 { Ok(()) } else { Err(Self(raw)) }
    }

    /// Table message for this code, or `None` when the code has no entry
    #[must_use]
    pub fn message(self) -> Option<&'static str> {
        let idx = usize::try_from(self.0).ok()?;
        ERRORSTR.get(idx).copied().filter(|s| !s.is_empty())
    }

    /// Whether this errno belongs to the portable error category `kind`.
    ///
    /// Only `PermissionDenied`, `AlreadyExists` and `NotFound` are mapped;
    /// every other kind answers `false`.
    #[must_use]
    pub fn is(self, kind: io::ErrorKind) -> bool {
        match kind {
            io::ErrorKind::PermissionDenied => self == Self::EACCES || self == Self::EPERM,
            io::ErrorKind::AlreadyExists => self == Self::EEXIST || self == Self::ENOTEMPTY,
            io::ErrorKind::NotFound => self == Self::ENOENT,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_temporary(self) -> bool {
        self == Self::EINTR || self == Self::EMFILE || self.is_timeout()
    }

    #[must_use]
    pub fn is_timeout(self) -> bool {
        self == Self::EAGAIN || self == Self::ETIMEDOUT
    }

    /// Closest `std::io::ErrorKind` for this code
    #[must_use]
    pub fn kind(self) -> io::ErrorKind {
        if self.is(io::ErrorKind::PermissionDenied) {
            return io::ErrorKind::PermissionDenied;
        }
        if self.is(io::ErrorKind::AlreadyExists) {
            return io::ErrorKind::AlreadyExists;
        }
        if self.is(io::ErrorKind::NotFound) {
            return io::ErrorKind::NotFound;
        }
        match self {
            Self::EINTR => io::ErrorKind::Interrupted,
            Self::EAGAIN => io::ErrorKind::WouldBlock,
            Self::ETIMEDOUT => io::ErrorKind::TimedOut,
            Self::EINVAL => io::ErrorKind::InvalidInput,
            Self::ENOSYS | Self::ENOTSUP => io::ErrorKind::Unsupported,
            _ => io::ErrorKind::Other,
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => f.write_str(msg),
            None => write!(f, "errno {}", self.0),
        }
    }
}

impl fmt::Debug for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Errno({name})"),
            None => write!(f, "Errno({})", self.0),
        }
    }
}

impl std::error::Error for Errno {}

impl From<Errno> for io::Error {
    fn from(errno: Errno) -> Self {
        Self::new(errno.kind(), errno)
    }
}

impl From<u32> for Errno {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
