//! C FFI bindings for burrow
//!
//! Exposes the shim to C code linked into the same sandboxed module. Calls
//! that can fail return an errno value, `0` on success, and record a
//! message for `burrow_last_error()`.
//!
//! # Example (C)
//! ```c
//! #include <burrow.h>
//!
//! uint64_t pos;
//! if (burrow_seek(dirfd, 0, BURROW_WHENCE_SET, &pos) != 0) {
//!     fprintf(stderr, "%s\n", burrow_last_error());
//! }
//! ```

#![allow(clippy::missing_safety_doc)]

use burrow_core::dirent::dirent_reclen;
use burrow_core::fd::FdTable;
use burrow_core::host::DefaultHost;
use burrow_core::{Errno, ProcessState, ShimConfig, Signal, Whence};
use libc::{c_char, c_int, size_t};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::ffi::CString;
use std::io::ErrorKind;
use std::ptr;

static STATE: Lazy<ProcessState<DefaultHost>> =
    Lazy::new(|| ProcessState::new(ShimConfig::default(), DefaultHost::new()));

static FDS: Lazy<FdTable> = Lazy::new(FdTable::new);

pub const BURROW_WHENCE_SET: c_int = 0;
pub const BURROW_WHENCE_CUR: c_int = 1;
pub const BURROW_WHENCE_END: c_int = 2;

/// Error categories accepted by `burrow_errno_is`
#[repr(C)]
pub enum BurrowErrorKind {
    /// EACCES or EPERM
    Permission = 1,
    /// EEXIST or ENOTEMPTY
    Exist = 2,
    /// ENOENT
    NotExist = 3,
}

/// Seconds and microseconds since the epoch
#[repr(C)]
pub struct BurrowTimeval {
    pub sec: i64,
    pub usec: i64,
}

// Thread-local error message
thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
    static ERROR_BUF: RefCell<Option<CString>> = const { RefCell::new(None) };
    static TEXT_BUF: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: String) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(msg);
    });
}

fn status(context: &str, result: Result<(), Errno>) -> u32 {
    match result {
        Ok(()) => 0,
        Err(errno) => {
            tracing::debug!(context, errno = errno.raw(), "call failed");
            set_last_error(format!("{context}: {errno}"));
            errno.raw()
        }
    }
}

/// Park `text` in this thread's buffer and hand out a pointer to it
fn stash(text: String) -> *const c_char {
    let cstr = CString::new(text).unwrap_or_default();
    TEXT_BUF.with(|buf| {
        let ptr = cstr.as_ptr();
        *buf.borrow_mut() = Some(cstr);
        ptr
    })
}

/// Get the last error message
///
/// Returns NULL if no error. The returned string is valid until the next
/// burrow call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn burrow_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(msg) => ERROR_BUF.with(|buf| {
            let cstr = CString::new(msg.as_str()).unwrap_or_default();
            let ptr = cstr.as_ptr();
            *buf.borrow_mut() = Some(cstr);
            ptr
        }),
        None => ptr::null(),
    })
}

/// Render an errno value
///
/// The string is valid until the next `burrow_strerror` or
/// `burrow_signal_name` call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn burrow_strerror(code: u32) -> *const c_char {
    stash(Errno::from_raw(code).to_string())
}

/// Describe a signal; same lifetime rules as `burrow_strerror`
#[unsafe(no_mangle)]
pub extern "C" fn burrow_signal_name(sig: c_int) -> *const c_char {
    stash(Signal::from_raw(sig).to_string())
}

/// 1 if `code` belongs to `kind` (a `BurrowErrorKind` value), else 0
#[unsafe(no_mangle)]
pub extern "C" fn burrow_errno_is(code: u32, kind: c_int) -> c_int {
    let kind = match kind {
        1 => ErrorKind::PermissionDenied,
        2 => ErrorKind::AlreadyExists,
        3 => ErrorKind::NotFound,
        _ => return 0,
    };
    c_int::from(Errno::from_raw(code).is(kind))
}

#[unsafe(no_mangle)]
pub extern "C" fn burrow_errno_temporary(code: u32) -> c_int {
    c_int::from(Errno::from_raw(code).is_temporary())
}

#[unsafe(no_mangle)]
pub extern "C" fn burrow_errno_timeout(code: u32) -> c_int {
    c_int::from(Errno::from_raw(code).is_timeout())
}

#[unsafe(no_mangle)]
pub extern "C" fn burrow_getuid() -> u32 {
    STATE.getuid()
}

#[unsafe(no_mangle)]
pub extern "C" fn burrow_getgid() -> u32 {
    STATE.getgid()
}

#[unsafe(no_mangle)]
pub extern "C" fn burrow_geteuid() -> u32 {
    STATE.geteuid()
}

#[unsafe(no_mangle)]
pub extern "C" fn burrow_getegid() -> u32 {
    STATE.getegid()
}

#[unsafe(no_mangle)]
pub extern "C" fn burrow_getpid() -> u32 {
    STATE.getpid()
}

#[unsafe(no_mangle)]
pub extern "C" fn burrow_getppid() -> u32 {
    STATE.getppid()
}

/// Copy the supplementary groups into `out`
///
/// With `len == 0` only the count is returned. Returns -1 if `out` is
/// NULL or too small.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn burrow_getgroups(out: *mut u32, len: size_t) -> c_int {
    let groups = STATE.getgroups();
    let count = c_int::try_from(groups.len()).unwrap_or(c_int::MAX);
    if len == 0 {
        return count;
    }
    if out.is_null() || len < groups.len() {
        set_last_error(format!("getgroups: need room for {} groups", groups.len()));
        return -1;
    }

    // SAFETY: caller guarantees `out` points to `len` writable u32s
    unsafe { ptr::copy_nonoverlapping(groups.as_ptr(), out, groups.len()) };
    count
}

/// Swap the file mode creation mask, returning the previous one
#[unsafe(no_mangle)]
pub extern "C" fn burrow_umask(mask: u32) -> u32 {
    STATE.umask(mask)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn burrow_gettimeofday(tv: *mut BurrowTimeval) -> u32 {
    if tv.is_null() {
        set_last_error("tv is null".into());
        return Errno::EFAULT.raw();
    }

    status(
        "gettimeofday",
        STATE.gettimeofday().map(|now| {
            // SAFETY: caller guarantees `tv` is valid for writes
            unsafe {
                tv.write(BurrowTimeval {
                    sec: now.sec,
                    usec: now.usec,
                });
            }
        }),
    )
}

/// Terminate the process with status `128 + sig`. Never returns.
#[unsafe(no_mangle)]
pub extern "C" fn burrow_kill(pid: c_int, sig: c_int) -> ! {
    STATE.kill(pid, Signal::from_raw(sig))
}

/// Raw syscall dispatch; always ENOSYS
#[unsafe(no_mangle)]
pub extern "C" fn burrow_syscall(trap: usize, a1: usize, a2: usize, a3: usize) -> u32 {
    status(
        "syscall",
        burrow_core::process::syscall(trap, a1, a2, a3).map(drop),
    )
}

/// Register a freshly opened host descriptor
///
/// Discards any state cached for an earlier descriptor that had the same
/// number. Call it after every open, or pair each host close with
/// `burrow_close`.
#[unsafe(no_mangle)]
pub extern "C" fn burrow_open(fd: u32) {
    FDS.open(fd);
}

/// Seek `fd`, storing the new offset in `out` when it is not NULL
///
/// Directories only accept `(0, BURROW_WHENCE_SET)`, which restarts their
/// listing. The file type is cached per descriptor number until
/// `burrow_close` or `burrow_open`; a number reused without either keeps
/// the old type.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn burrow_seek(fd: u32, offset: i64, whence: c_int, out: *mut u64) -> u32 {
    let result = Whence::try_from(whence)
        .and_then(|whence| FDS.get_or_insert(fd).seek(STATE.host(), offset, whence))
        .map(|pos| {
            if !out.is_null() {
                // SAFETY: caller guarantees a non-null `out` is valid for writes
                unsafe { out.write(pos) };
            }
        });
    status("seek", result)
}

/// Drop the shim's state for `fd`. The host descriptor itself stays open.
#[unsafe(no_mangle)]
pub extern "C" fn burrow_close(fd: u32) -> u32 {
    status("close", FDS.remove(fd))
}

/// Length of the directory record at the start of `buf`
///
/// Returns 1 and stores the length in `out`, or 0 if `buf` is too short
/// to tell. Returns -1 on NULL arguments.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn burrow_dirent_reclen(
    buf: *const u8,
    len: size_t,
    out: *mut u64,
) -> c_int {
    if buf.is_null() || out.is_null() {
        set_last_error("buf or out is null".into());
        return -1;
    }

    // SAFETY: caller guarantees `buf` points to `len` readable bytes
    let bytes = unsafe { std::slice::from_raw_parts(buf, len) };
    match dirent_reclen(bytes) {
        Some(reclen) => {
            // SAFETY: checked non-null above
            unsafe { out.write(reclen) };
            1
        }
        None => 0,
    }
}

/// Get library version
#[unsafe(no_mangle)]
pub extern "C" fn burrow_version() -> *const c_char {
    static VERSION: Lazy<CString> =
        Lazy::new(|| CString::new(env!("CARGO_PKG_VERSION")).unwrap_or_default());
    VERSION.as_ptr()
}
