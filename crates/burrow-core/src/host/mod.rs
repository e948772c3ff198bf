//! Host boundary
//!
//! The handful of calls the shim needs from the sandbox:
//! - `fd_filetype` - metadata query for a descriptor
//! - `fd_seek` - native seek
//! - `fd_readdir` - packed directory records from a cookie
//! - `clock_time_get` - clock query
//! - `proc_exit` - terminate the process
//!
//! `WasiHost` talks to a real `wasi_snapshot_preview1` host. `NativeHost`
//! provides the same contract on unix so the shim can be exercised outside
//! a sandbox.

#[cfg(unix)]
pub mod native;
#[cfg(target_os = "wasi")]
pub mod wasi;

#[cfg(unix)]
pub use self::native::NativeHost;
#[cfg(target_os = "wasi")]
pub use self::wasi::WasiHost;

use crate::errno::Errno;
use crate::types::{ClockId, Dircookie, Fd, FileType, Timestamp, Whence};

/// Host used by default on the current target
#[cfg(target_os = "wasi")]
pub type DefaultHost = WasiHost;

/// Host used by default on the current target
#[cfg(unix)]
pub type DefaultHost = NativeHost;

/// Calls consumed from the sandbox host
pub trait Host: Send + Sync {
    /// Type of the file open on `fd`
    fn fd_filetype(&self, fd: Fd) -> Result<FileType, Errno>;

    /// Move the offset of `fd`, returning the new absolute position
    fn fd_seek(&self, fd: Fd, offset: i64, whence: Whence) -> Result<u64, Errno>;

    /// Fill `buf` with directory records starting at `cookie`.
    ///
    /// Returns the number of bytes written. The last record may be cut
    /// short; a count below `buf.len()` means the listing is exhausted.
    fn fd_readdir(&self, fd: Fd, buf: &mut [u8], cookie: Dircookie) -> Result<usize, Errno>;

    /// Current time of `clock`; `precision` is a hint in nanoseconds
    fn clock_time_get(&self, clock: ClockId, precision: Timestamp) -> Result<Timestamp, Errno>;

    /// Terminate the process with `code`
    fn proc_exit(&self, code: i32) -> !;
}

impl<H: Host + ?Sized> Host for &H {
    fn fd_filetype(&self, fd: Fd) -> Result<FileType, Errno> {
        (**self).fd_filetype(fd)
    }

    fn fd_seek(&self, fd: Fd, offset: i64, whence: Whence) -> Result<u64, Errno> {
        (**self).fd_seek(fd, offset, whence)
    }

    fn fd_readdir(&self, fd: Fd, buf: &mut [u8], cookie: Dircookie) -> Result<usize, Errno> {
        (**self).fd_readdir(fd, buf, cookie)
    }

    fn clock_time_get(&self, clock: ClockId, precision: Timestamp) -> Result<Timestamp, Errno> {
        (**self).clock_time_get(clock, precision)
    }

    fn proc_exit(&self, code: i32) -> ! {
        (**self).proc_exit(code)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted host counting the calls it receives

    use super::Host;
    use crate::dirent::encode_dirent;
    use crate::errno::Errno;
    use crate::types::{ClockId, Dircookie, Fd, FileType, Timestamp, Whence};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Payload of the panic raised by `proc_exit`
    #[derive(Debug, PartialEq, Eq)]
    pub struct Exited(pub i32);

    #[derive(Default)]
    pub struct MockHost {
        pub file_type: Mutex<Option<Result<FileType, Errno>>>,
        pub seek_result: Mutex<Option<Result<u64, Errno>>>,
        pub seeks: Mutex<Vec<(Fd, i64, Whence)>>,
        pub entries: Mutex<Vec<(u64, FileType, String)>>,
        pub cookies: Mutex<Vec<Dircookie>>,
        pub readdir_error: Mutex<Option<Errno>>,
        pub clock: Mutex<Option<Result<Timestamp, Errno>>>,
        pub precisions: Mutex<Vec<Timestamp>>,
        pub stat_calls: AtomicUsize,
    }

    impl MockHost {
        pub fn with_type(file_type: FileType) -> Self {
            let host = Self::default();
            *host.file_type.lock() = Some(Ok(file_type));
            host
        }

        pub fn stat_calls(&self) -> usize {
            self.stat_calls.load(Ordering::SeqCst)
        }
    }

    impl Host for MockHost {
        fn fd_filetype(&self, _fd: Fd) -> Result<FileType, Errno> {
            self.stat_calls.fetch_add(1, Ordering::SeqCst);
            self.file_type.lock().unwrap_or(Err(Errno::EBADF))
        }

        fn fd_seek(&self, fd: Fd, offset: i64, whence: Whence) -> Result<u64, Errno> {
            self.seeks.lock().push((fd, offset, whence));
            self.seek_result.lock().unwrap_or(Err(Errno::ESPIPE))
        }

        fn fd_readdir(&self, _fd: Fd, buf: &mut [u8], cookie: Dircookie) -> Result<usize, Errno> {
            self.cookies.lock().push(cookie);
            if let Some(errno) = *self.readdir_error.lock() {
                return Err(errno);
            }
            let mut packed = Vec::new();
            let entries = self.entries.lock();
            let start = usize::try_from(cookie).map_err(|_| Errno::EINVAL)?;
            for (idx, (ino, file_type, name)) in entries.iter().enumerate().skip(start) {
                encode_dirent(idx as u64 + 1, *ino, *file_type, name.as_bytes(), &mut packed)?;
            }
            let n = packed.len().min(buf.len());
            buf[..n].copy_from_slice(&packed[..n]);
            Ok(n)
        }

        fn clock_time_get(&self, _clock: ClockId, precision: Timestamp) -> Result<Timestamp, Errno> {
            self.precisions.lock().push(precision);
            self.clock.lock().unwrap_or(Err(Errno::ENOSYS))
        }

        fn proc_exit(&self, code: i32) -> ! {
            std::panic::panic_any(Exited(code))
        }
    }
}
