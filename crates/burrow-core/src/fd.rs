//! Per-descriptor state
//!
//! A [`Descriptor`] caches the host file type and, for directories, the
//! cookie where the next listing resumes. Every operation holds an
//! [`FdRef`] for its whole duration so the descriptor cannot be closed
//! underneath it.

use crate::dirent::{DirEntries, DirEntry, Parsed};
use crate::errno::Errno;
use crate::host::Host;
use crate::types::{DIRCOOKIE_START, Dircookie, Fd, FileType, Whence};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// Buffer size of the first `fd_readdir` call in [`Descriptor::read_dir`]
pub const READDIR_BUF_SIZE: usize = 8 * 1024;

/// Largest buffer [`Descriptor::read_dir`] grows to for a single record
pub const READDIR_BUF_MAX: usize = 64 * 1024;

const CLOSED: u64 = 1 << 63;

/// An open host descriptor
#[derive(Debug)]
pub struct Descriptor {
    fd: Fd,
    file_type: AtomicU8,
    cookie: Mutex<Dircookie>,
    // in-use count, with CLOSED set once the descriptor is closed
    refs: AtomicU64,
}

/// Keeps a descriptor open; releases the reference on drop
#[derive(Debug)]
#[must_use = "the descriptor is only held while the guard is alive"]
pub struct FdRef<'a> {
    desc: &'a Descriptor,
}

impl Drop for FdRef<'_> {
    fn drop(&mut self) {
        self.desc.refs.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A directory entry copied out of the host buffer
///
/// `name` is for display and may have replaced invalid UTF-8. `raw_name`
/// holds the bytes the host reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntryBuf {
    pub name: String,
    #[serde(skip)]
    pub raw_name: Vec<u8>,
    pub ino: u64,
    pub file_type: FileType,
    pub next: Dircookie,
}

impl From<DirEntry<'_>> for DirEntryBuf {
    fn from(entry: DirEntry<'_>) -> Self {
        Self {
            name: entry.name_lossy().into_owned(),
            raw_name: entry.name.to_vec(),
            ino: entry.ino,
            file_type: entry.file_type,
            next: entry.next,
        }
    }
}

impl Descriptor {
    /// Wrap a freshly opened host descriptor; its type is not known yet
    #[must_use]
    pub const fn new(fd: Fd) -> Self {
        Self {
            fd,
            file_type: AtomicU8::new(FileType::Unknown as u8),
            cookie: Mutex::new(DIRCOOKIE_START),
            refs: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn fd(&self) -> Fd {
        self.fd
    }

    /// Take a reference that keeps the descriptor open.
    ///
    /// Fails with `EBADF` once the descriptor has been closed.
    pub fn acquire(&self) -> Result<FdRef<'_>, Errno> {
        let mut current = self.refs.load(Ordering::Acquire);
        loop {
            if current & CLOSED != 0 {
                return Err(Errno::EBADF);
            }
            match self.refs.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(FdRef { desc: self }),
                Err(actual) => current = actual,
            }
        }
    }

    /// Number of operations currently holding the descriptor
    #[must_use]
    pub fn in_use(&self) -> u64 {
        self.refs.load(Ordering::Acquire) & !CLOSED
    }

    /// Mark the descriptor closed. Later `acquire` calls fail.
    pub fn close(&self) -> Result<(), Errno> {
        let prev = self.refs.fetch_or(CLOSED, Ordering::AcqRel);
        if prev & CLOSED != 0 {
            return Err(Errno::EBADF);
        }
        tracing::trace!(fd = self.fd, in_use = prev, "descriptor closed");
        Ok(())
    }

    /// Cached file type, without asking the host
    #[must_use]
    pub fn cached_type(&self) -> FileType {
        FileType::from_raw(self.file_type.load(Ordering::Acquire))
    }

    /// File type of the descriptor, querying the host on a cold cache.
    ///
    /// Concurrent callers may both query; they store the same value. A
    /// failed query leaves the cache untouched.
    pub fn classify<H: Host + ?Sized>(&self, host: &H) -> Result<FileType, Errno> {
        let cached = self.cached_type();
        if cached != FileType::Unknown {
            tracing::trace!(fd = self.fd, file_type = ?cached, "file type cached");
            return Ok(cached);
        }

        let file_type = host.fd_filetype(self.fd)?;
        self.file_type.store(file_type.raw(), Ordering::Release);
        tracing::debug!(fd = self.fd, file_type = ?file_type, "classified descriptor");
        Ok(file_type)
    }

    /// Cookie the next directory read starts from
    #[must_use]
    pub fn cursor(&self) -> Dircookie {
        *self.cookie.lock()
    }

    /// Rewind the directory listing to its first entry
    pub fn reset_cursor(&self) {
        *self.cookie.lock() = DIRCOOKIE_START;
    }

    /// Move the file offset.
    ///
    /// Directories only support rewinding, `(0, Set)`, which resets the
    /// listing cursor so the same descriptor can be scanned again. Any other
    /// request on a directory fails with `EINVAL` without reaching the host.
    /// Everything else is forwarded to the host unchanged.
    pub fn seek<H: Host + ?Sized>(
        &self,
        host: &H,
        offset: i64,
        whence: Whence,
    ) -> Result<u64, Errno> {
        let _guard = self.acquire()?;

        if self.classify(host)? == FileType::Directory {
            if offset == 0 && whence == Whence::Set {
                self.reset_cursor();
                tracing::debug!(fd = self.fd, "directory rewound");
                return Ok(0);
            }
            return Err(Errno::EINVAL);
        }

        host.fd_seek(self.fd, offset, whence)
    }

    /// Read the next batch of entries into `buf`.
    ///
    /// Returns the complete records found and moves the cursor past them.
    /// An empty result means the listing is exhausted. `EINVAL` if `buf` is
    /// too small to hold even one record.
    pub fn read_dir_batch<H: Host + ?Sized>(
        &self,
        host: &H,
        buf: &mut [u8],
    ) -> Result<Vec<DirEntryBuf>, Errno> {
        match self.fill_batch(host, buf)? {
            Batch::Entries(entries) => Ok(entries),
            Batch::TooSmall { .. } => Err(Errno::EINVAL),
        }
    }

    fn fill_batch<H: Host + ?Sized>(&self, host: &H, buf: &mut [u8]) -> Result<Batch, Errno> {
        let _guard = self.acquire()?;

        if self.classify(host)? != FileType::Directory {
            return Err(Errno::ENOTDIR);
        }

        let mut cookie = self.cookie.lock();
        let n = host.fd_readdir(self.fd, buf, *cookie)?;
        let filled = &buf[..n.min(buf.len())];

        let mut records = DirEntries::new(filled);
        let entries: Vec<DirEntryBuf> = records.by_ref().map(DirEntryBuf::from).collect();
        if let Some(errno) = records.error() {
            return Err(errno);
        }
        if entries.is_empty() && !filled.is_empty() {
            let needed = match DirEntry::parse(records.remainder())? {
                Parsed::Incomplete { needed } => needed,
                Parsed::Entry(entry) => entry.reclen(),
            };
            return Ok(Batch::TooSmall { needed });
        }

        if let Some(next) = records.cookie() {
            *cookie = next;
        }
        tracing::trace!(
            fd = self.fd,
            entries = entries.len(),
            cookie = *cookie,
            "read directory batch"
        );
        Ok(Batch::Entries(entries))
    }

    /// Read all remaining entries from the cursor onwards.
    ///
    /// Starts with a [`READDIR_BUF_SIZE`] buffer and grows it whenever a
    /// single record does not fit, up to [`READDIR_BUF_MAX`]. A record that
    /// would need more fails with `ENAMETOOLONG`. Host errors are returned
    /// as they are.
    pub fn read_dir<H: Host + ?Sized>(&self, host: &H) -> Result<Vec<DirEntryBuf>, Errno> {
        let mut buf = vec![0u8; READDIR_BUF_SIZE];
        let mut all = Vec::new();

        loop {
            match self.fill_batch(host, &mut buf)? {
                Batch::Entries(batch) if batch.is_empty() => return Ok(all),
                Batch::Entries(batch) => all.extend(batch),
                Batch::TooSmall { needed }
                    if needed > READDIR_BUF_MAX || buf.len() >= READDIR_BUF_MAX =>
                {
                    return Err(Errno::ENAMETOOLONG);
                }
                Batch::TooSmall { needed } => {
                    let len = needed.max(buf.len() * 2).min(READDIR_BUF_MAX);
                    tracing::debug!(fd = self.fd, needed, len, "growing readdir buffer");
                    buf.resize(len, 0);
                }
            }
        }
    }
}

/// Result of one `fd_readdir` round
enum Batch {
    Entries(Vec<DirEntryBuf>),
    /// Not even one record fit; it needs at least `needed` bytes
    TooSmall { needed: usize },
}

/// Process-wide map from host descriptor to shared state
#[derive(Debug, Default)]
pub struct FdTable {
    entries: RwLock<HashMap<Fd, Arc<Descriptor>>>,
}

impl FdTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `fd`, created on first use
    pub fn get_or_insert(&self, fd: Fd) -> Arc<Descriptor> {
        if let Some(desc) = self.entries.read().get(&fd) {
            return Arc::clone(desc);
        }
        Arc::clone(
            self.entries
                .write()
                .entry(fd)
                .or_insert_with(|| Arc::new(Descriptor::new(fd))),
        )
    }

    /// Register `fd` as freshly opened.
    ///
    /// State left over from an earlier descriptor with the same number is
    /// closed and replaced, so no cached type or cursor carries over.
    pub fn open(&self, fd: Fd) -> Arc<Descriptor> {
        let desc = Arc::new(Descriptor::new(fd));
        if let Some(stale) = self.entries.write().insert(fd, Arc::clone(&desc)) {
            // already closed through another handle
            let _ = stale.close();
            tracing::debug!(fd, "replaced stale descriptor state");
        }
        desc
    }

    #[must_use]
    pub fn get(&self, fd: Fd) -> Option<Arc<Descriptor>> {
        self.entries.read().get(&fd).cloned()
    }

    /// Forget `fd` and mark its state closed. `EBADF` if it was not known.
    pub fn remove(&self, fd: Fd) -> Result<(), Errno> {
        let desc = self.entries.write().remove(&fd).ok_or(Errno::EBADF)?;
        desc.close()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
