//! `wasi_snapshot_preview1` imports

use super::Host;
use crate::errno::Errno;
use crate::types::{ClockId, Dircookie, Fd, FileType, Timestamp, Whence};
use std::mem::MaybeUninit;

#[repr(C)]
#[derive(Clone, Copy)]
struct Filestat {
    dev: u64,
    ino: u64,
    filetype: u8,
    nlink: u64,
    size: u64,
    atim: Timestamp,
    mtim: Timestamp,
    ctim: Timestamp,
}

mod sys {
    use super::Filestat;

    #[link(wasm_import_module = "wasi_snapshot_preview1")]
    unsafe extern "C" {
        pub fn fd_filestat_get(fd: i32, buf: *mut Filestat) -> i32;
        pub fn fd_seek(fd: i32, offset: i64, whence: i32, newoffset: *mut u64) -> i32;
        pub fn fd_readdir(fd: i32, buf: *mut u8, buf_len: i32, cookie: i64, bufused: *mut i32)
        -> i32;
        pub fn clock_time_get(id: i32, precision: i64, time: *mut u64) -> i32;
        pub fn proc_exit(code: i32) -> !;
    }
}

/// Host reached through the sandbox's own imports
#[derive(Debug, Default, Clone, Copy)]
pub struct WasiHost;

impl WasiHost {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn check(ret: i32) -> Result<(), Errno> {
    Errno::result(ret as u32)
}

#[allow(clippy::cast_possible_wrap)]
impl Host for WasiHost {
    fn fd_filetype(&self, fd: Fd) -> Result<FileType, Errno> {
        let mut stat = MaybeUninit::<Filestat>::uninit();
        // SAFETY: the host writes a complete filestat on success
        check(unsafe { sys::fd_filestat_get(fd as i32, stat.as_mut_ptr()) })?;
        // SAFETY: the call succeeded
        let stat = unsafe { stat.assume_init() };
        Ok(FileType::from_raw(stat.filetype))
    }

    fn fd_seek(&self, fd: Fd, offset: i64, whence: Whence) -> Result<u64, Errno> {
        let mut pos = 0u64;
        // SAFETY: `pos` outlives the call
        check(unsafe { sys::fd_seek(fd as i32, offset, i32::from(whence as u8), &mut pos) })?;
        Ok(pos)
    }

    fn fd_readdir(&self, fd: Fd, buf: &mut [u8], cookie: Dircookie) -> Result<usize, Errno> {
        let len = i32::try_from(buf.len()).unwrap_or(i32::MAX);
        let mut used = 0i32;
        // SAFETY: the host writes at most `len` bytes into `buf`
        check(unsafe {
            sys::fd_readdir(
                fd as i32,
                buf.as_mut_ptr(),
                len,
                cookie as i64,
                &mut used,
            )
        })?;
        usize::try_from(used).map_err(|_| Errno::EIO)
    }

    fn clock_time_get(&self, clock: ClockId, precision: Timestamp) -> Result<Timestamp, Errno> {
        let mut time = 0u64;
        // SAFETY: `time` outlives the call
        check(unsafe {
            sys::clock_time_get(
                clock as i32,
                precision as i64,
                &mut time,
            )
        })?;
        Ok(time)
    }

    fn proc_exit(&self, code: i32) -> ! {
        // SAFETY: proc_exit never returns
        unsafe { sys::proc_exit(code) }
    }
}
