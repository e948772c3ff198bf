//! Host contract over the native unix syscalls
//!
//! Errors are translated into the sandbox numbering and directory listings
//! are re-encoded in the sandbox record layout, so code above this layer
//! cannot tell it apart from a real WASI host.

use super::Host;
use crate::dirent::encode_dirent;
use crate::errno::Errno;
use crate::types::{ClockId, Dircookie, Fd, FileType, Timestamp, Whence};
use std::ffi::CStr;
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;

/// Host backed by the running unix kernel
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeHost;

impl NativeHost {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Translate a native errno value into the sandbox numbering
#[must_use]
pub fn translate_errno(raw: i32) -> Errno {
    match raw {
        0 => Errno::ESUCCESS,
        libc::E2BIG => Errno::E2BIG,
        libc::EACCES => Errno::EACCES,
        libc::EADDRINUSE => Errno::EADDRINUSE,
        libc::EADDRNOTAVAIL => Errno::EADDRNOTAVAIL,
        libc::EAFNOSUPPORT => Errno::EAFNOSUPPORT,
        libc::EAGAIN => Errno::EAGAIN,
        libc::EALREADY => Errno::EALREADY,
        libc::EBADF => Errno::EBADF,
        libc::EBADMSG => Errno::EBADMSG,
        libc::EBUSY => Errno::EBUSY,
        libc::ECANCELED => Errno::ECANCELED,
        libc::ECHILD => Errno::ECHILD,
        libc::ECONNABORTED => Errno::ECONNABORTED,
        libc::ECONNREFUSED => Errno::ECONNREFUSED,
        libc::ECONNRESET => Errno::ECONNRESET,
        libc::EDEADLK => Errno::EDEADLK,
        libc::EDESTADDRREQ => Errno::EDESTADDRREQ,
        libc::EDOM => Errno::EDOM,
        libc::EDQUOT => Errno::EDQUOT,
        libc::EEXIST => Errno::EEXIST,
        libc::EFAULT => Errno::EFAULT,
        libc::EFBIG => Errno::EFBIG,
        libc::EHOSTUNREACH => Errno::EHOSTUNREACH,
        libc::EIDRM => Errno::EIDRM,
        libc::EILSEQ => Errno::EILSEQ,
        libc::EINPROGRESS => Errno::EINPROGRESS,
        libc::EINTR => Errno::EINTR,
        libc::EINVAL => Errno::EINVAL,
        libc::EIO => Errno::EIO,
        libc::EISCONN => Errno::EISCONN,
        libc::EISDIR => Errno::EISDIR,
        libc::ELOOP => Errno::ELOOP,
        libc::EMFILE => Errno::EMFILE,
        libc::EMLINK => Errno::EMLINK,
        libc::EMSGSIZE => Errno::EMSGSIZE,
        libc::EMULTIHOP => Errno::EMULTIHOP,
        libc::ENAMETOOLONG => Errno::ENAMETOOLONG,
        libc::ENETDOWN => Errno::ENETDOWN,
        libc::ENETRESET => Errno::ENETRESET,
        libc::ENETUNREACH => Errno::ENETUNREACH,
        libc::ENFILE => Errno::ENFILE,
        libc::ENOBUFS => Errno::ENOBUFS,
        libc::ENODEV => Errno::ENODEV,
        libc::ENOENT => Errno::ENOENT,
        libc::ENOEXEC => Errno::ENOEXEC,
        libc::ENOLCK => Errno::ENOLCK,
        libc::ENOLINK => Errno::ENOLINK,
        libc::ENOMEM => Errno::ENOMEM,
        libc::ENOMSG => Errno::ENOMSG,
        libc::ENOPROTOOPT => Errno::ENOPROTOOPT,
        libc::ENOSPC => Errno::ENOSPC,
        libc::ENOSYS => Errno::ENOSYS,
        libc::ENOTCONN => Errno::ENOTCONN,
        libc::ENOTDIR => Errno::ENOTDIR,
        libc::ENOTEMPTY => Errno::ENOTEMPTY,
        libc::ENOTRECOVERABLE => Errno::ENOTRECOVERABLE,
        libc::ENOTSOCK => Errno::ENOTSOCK,
        libc::ENOTSUP => Errno::ENOTSUP,
        libc::ENOTTY => Errno::ENOTTY,
        libc::ENXIO => Errno::ENXIO,
        libc::EOVERFLOW => Errno::EOVERFLOW,
        libc::EOWNERDEAD => Errno::EOWNERDEAD,
        libc::EPERM => Errno::EPERM,
        libc::EPIPE => Errno::EPIPE,
        libc::EPROTO => Errno::EPROTO,
        libc::EPROTONOSUPPORT => Errno::EPROTONOSUPPORT,
        libc::EPROTOTYPE => Errno::EPROTOTYPE,
        libc::ERANGE => Errno::ERANGE,
        libc::EROFS => Errno::EROFS,
        libc::ESPIPE => Errno::ESPIPE,
        libc::ESRCH => Errno::ESRCH,
        libc::ESTALE => Errno::ESTALE,
        libc::ETIMEDOUT => Errno::ETIMEDOUT,
        libc::ETXTBSY => Errno::ETXTBSY,
        libc::EXDEV => Errno::EXDEV,
        _ => Errno::EIO,
    }
}

fn last_errno() -> Errno {
    translate_errno(nix::errno::Errno::last() as i32)
}

fn raw_fd(fd: Fd) -> Result<RawFd, Errno> {
    RawFd::try_from(fd).map_err(|_| Errno::EBADF)
}

const fn mode_to_filetype(mode: libc::mode_t) -> FileType {
    match mode & libc::S_IFMT {
        libc::S_IFDIR => FileType::Directory,
        libc::S_IFREG => FileType::RegularFile,
        libc::S_IFLNK => FileType::SymbolicLink,
        libc::S_IFBLK => FileType::BlockDevice,
        libc::S_IFCHR => FileType::CharacterDevice,
        libc::S_IFSOCK => FileType::SocketStream,
        _ => FileType::Unknown,
    }
}

const fn dtype_to_filetype(d_type: u8) -> FileType {
    match d_type {
        libc::DT_DIR => FileType::Directory,
        libc::DT_REG => FileType::RegularFile,
        libc::DT_LNK => FileType::SymbolicLink,
        libc::DT_BLK => FileType::BlockDevice,
        libc::DT_CHR => FileType::CharacterDevice,
        libc::DT_SOCK => FileType::SocketStream,
        _ => FileType::Unknown,
    }
}

/// Directory stream over a duplicate of a descriptor, closed on drop
struct DirStream(*mut libc::DIR);

impl DirStream {
    fn open(fd: RawFd) -> Result<Self, Errno> {
        // SAFETY: dup on a caller-provided descriptor
        let dup = unsafe { libc::dup(fd) };
        if dup < 0 {
            return Err(last_errno());
        }

        // SAFETY: on success the stream owns `dup`
        let dir = unsafe { libc::fdopendir(dup) };
        if dir.is_null() {
            let errno = last_errno();
            // SAFETY: fdopendir failed, so `dup` is still ours
            unsafe { libc::close(dup) };
            return Err(errno);
        }

        Ok(Self(dir))
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        // SAFETY: the stream was opened by fdopendir and is closed once
        unsafe {
            libc::closedir(self.0);
        }
    }
}

impl Host for NativeHost {
    fn fd_filetype(&self, fd: Fd) -> Result<FileType, Errno> {
        let fd = raw_fd(fd)?;
        let mut stat = MaybeUninit::<libc::stat>::uninit();

        // SAFETY: fstat writes a full stat struct on success
        let ret = unsafe { libc::fstat(fd, stat.as_mut_ptr()) };
        if ret != 0 {
            return Err(last_errno());
        }

        // SAFETY: fstat succeeded
        let stat = unsafe { stat.assume_init() };
        Ok(mode_to_filetype(stat.st_mode))
    }

    fn fd_seek(&self, fd: Fd, offset: i64, whence: Whence) -> Result<u64, Errno> {
        let fd = raw_fd(fd)?;
        let offset = libc::off_t::try_from(offset).map_err(|_| Errno::EOVERFLOW)?;
        let whence = match whence {
            Whence::Set => libc::SEEK_SET,
            Whence::Cur => libc::SEEK_CUR,
            Whence::End => libc::SEEK_END,
        };

        // SAFETY: lseek on a caller-provided descriptor
        let pos = unsafe { libc::lseek(fd, offset, whence) };
        if pos < 0 {
            return Err(last_errno());
        }
        u64::try_from(pos).map_err(|_| Errno::EOVERFLOW)
    }

    fn fd_readdir(&self, fd: Fd, buf: &mut [u8], cookie: Dircookie) -> Result<usize, Errno> {
        let stream = DirStream::open(raw_fd(fd)?)?;

        // the duplicate shares the file offset with `fd`, start from the top
        // SAFETY: stream is open
        unsafe { libc::rewinddir(stream.0) };
        if cookie != 0 {
            let loc = libc::c_long::try_from(cookie).map_err(|_| Errno::EINVAL)?;
            // SAFETY: cookies handed out below come from telldir on this directory
            unsafe { libc::seekdir(stream.0, loc) };
        }

        let mut packed = Vec::with_capacity(buf.len());
        while packed.len() < buf.len() {
            nix::errno::Errno::clear();
            // SAFETY: stream is open; the entry is valid until the next readdir
            let ent = unsafe { libc::readdir(stream.0) };
            if ent.is_null() {
                let errno = nix::errno::Errno::last() as i32;
                if errno != 0 {
                    return Err(translate_errno(errno));
                }
                break;
            }

            // SAFETY: stream is open
            let next = unsafe { libc::telldir(stream.0) };
            // SAFETY: readdir returned a valid entry
            let (ino, d_type, name) = unsafe {
                let ent = &*ent;
                (
                    ent.d_ino,
                    ent.d_type,
                    CStr::from_ptr(ent.d_name.as_ptr()).to_bytes().to_vec(),
                )
            };

            let next = Dircookie::try_from(next).map_err(|_| Errno::EOVERFLOW)?;
            #[allow(clippy::useless_conversion)]
            let ino = u64::from(ino);
            encode_dirent(next, ino, dtype_to_filetype(d_type), &name, &mut packed)?;
        }

        let n = packed.len().min(buf.len());
        buf[..n].copy_from_slice(&packed[..n]);

        tracing::trace!(
            fd,
            cookie,
            bytes = n,
            truncated = packed.len() > buf.len(),
            "native readdir"
        );
        Ok(n)
    }

    fn clock_time_get(&self, clock: ClockId, _precision: Timestamp) -> Result<Timestamp, Errno> {
        use nix::time::{ClockId as NixClockId, clock_gettime};

        let id = match clock {
            ClockId::Realtime => NixClockId::CLOCK_REALTIME,
            ClockId::Monotonic => NixClockId::CLOCK_MONOTONIC,
        };
        let now = clock_gettime(id).map_err(|e| translate_errno(e as i32))?;

        let sec = u64::try_from(now.tv_sec()).map_err(|_| Errno::EOVERFLOW)?;
        let nsec = u64::try_from(now.tv_nsec()).map_err(|_| Errno::EOVERFLOW)?;
        Ok(sec * 1_000_000_000 + nsec)
    }

    fn proc_exit(&self, code: i32) -> ! {
        std::process::exit(code)
    }
}
