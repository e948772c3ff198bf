//! Descriptor behaviour against a scripted host

use burrow_core::dirent::encode_dirent;
use burrow_core::fd::FdTable;
use burrow_core::types::{ClockId, Dircookie, Fd, Timestamp};
use burrow_core::{Errno, FileType, Host, Whence};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Scripted host with one directory (fd 3) and one file (fd 4)
#[derive(Default)]
struct ScriptedHost {
    types: HashMap<Fd, FileType>,
    listing: Vec<&'static str>,
    stats: AtomicUsize,
    seeks: Mutex<Vec<(Fd, i64, Whence)>>,
    file_len: u64,
}

impl ScriptedHost {
    fn new() -> Self {
        Self {
            types: HashMap::from([(3, FileType::Directory), (4, FileType::RegularFile)]),
            listing: vec![".", "..", "Cargo.toml", "src"],
            file_len: 500,
            ..Self::default()
        }
    }
}

impl Host for ScriptedHost {
    fn fd_filetype(&self, fd: Fd) -> Result<FileType, Errno> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        self.types.get(&fd).copied().ok_or(Errno::EBADF)
    }

    fn fd_seek(&self, fd: Fd, offset: i64, whence: Whence) -> Result<u64, Errno> {
        self.seeks.lock().unwrap().push((fd, offset, whence));
        let base = match whence {
            Whence::Set | Whence::Cur => 0,
            Whence::End => self.file_len,
        };
        base.checked_add_signed(offset).ok_or(Errno::EINVAL)
    }

    fn fd_readdir(&self, _fd: Fd, buf: &mut [u8], cookie: Dircookie) -> Result<usize, Errno> {
        let mut packed = Vec::new();
        for (idx, name) in self.listing.iter().enumerate().skip(cookie as usize) {
            let next = idx as u64 + 1;
            encode_dirent(next, next * 10, FileType::RegularFile, name.as_bytes(), &mut packed)?;
        }
        let n = packed.len().min(buf.len());
        buf[..n].copy_from_slice(&packed[..n]);
        Ok(n)
    }

    fn clock_time_get(&self, _clock: ClockId, _precision: Timestamp) -> Result<Timestamp, Errno> {
        Err(Errno::ENOSYS)
    }

    fn proc_exit(&self, code: i32) -> ! {
        panic!("exit {code}")
    }
}

fn names(entries: &[burrow_core::DirEntryBuf]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn rewind_then_relist() {
    let host = ScriptedHost::new();
    let table = FdTable::new();
    let dir = table.get_or_insert(3);

    let first = dir.read_dir(&host).unwrap();
    assert_eq!(names(&first), vec![".", "..", "Cargo.toml", "src"]);

    assert_eq!(dir.seek(&host, 0, Whence::Set), Ok(0));
    let second = dir.read_dir(&host).unwrap();
    assert_eq!(first, second);

    assert!(host.seeks.lock().unwrap().is_empty());
    assert_eq!(host.stats.load(Ordering::SeqCst), 1);
}

#[test]
fn partial_listing_then_rewind() {
    let host = ScriptedHost::new();
    let dir = FdTable::new().get_or_insert(3);

    // a single record fits
    let mut buf = vec![0u8; 24 + 2 + 8];
    let batch = dir.read_dir_batch(&host, &mut buf).unwrap();
    assert_eq!(names(&batch), vec!["."]);
    assert_eq!(dir.cursor(), 1);

    assert_eq!(dir.seek(&host, 0, Whence::Cur), Err(Errno::EINVAL));
    assert_eq!(dir.cursor(), 1);

    dir.seek(&host, 0, Whence::Set).unwrap();
    assert_eq!(dir.cursor(), 0);
}

#[test]
fn file_seeks_reach_the_host() {
    let host = ScriptedHost::new();
    let file = FdTable::new().get_or_insert(4);

    assert_eq!(file.seek(&host, 0, Whence::End), Ok(500));
    assert_eq!(file.seek(&host, 7, Whence::Set), Ok(7));
    assert_eq!(file.seek(&host, -1, Whence::Set), Err(Errno::EINVAL));
    assert_eq!(
        *host.seeks.lock().unwrap(),
        vec![
            (4, 0, Whence::End),
            (4, 7, Whence::Set),
            (4, -1, Whence::Set)
        ]
    );
    assert_eq!(
        file.read_dir(&host),
        Err(Errno::ENOTDIR),
        "files cannot be listed"
    );
}

#[test]
fn unknown_descriptor_is_ebadf() {
    let host = ScriptedHost::new();
    let ghost = FdTable::new().get_or_insert(99);
    assert_eq!(ghost.seek(&host, 0, Whence::Set), Err(Errno::EBADF));
    assert_eq!(ghost.cached_type(), FileType::Unknown);
}

#[test]
fn concurrent_classification_agrees() {
    let host = Arc::new(ScriptedHost::new());
    let table = Arc::new(FdTable::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let host = Arc::clone(&host);
            let table = Arc::clone(&table);
            thread::spawn(move || table.get_or_insert(3).classify(host.as_ref()))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(FileType::Directory));
    }
    assert_eq!(table.len(), 1);
    assert!(host.stats.load(Ordering::SeqCst) >= 1);
}

#[test]
fn closing_through_the_table() {
    let host = ScriptedHost::new();
    let table = FdTable::new();
    let file = table.get_or_insert(4);

    table.remove(4).unwrap();
    assert_eq!(file.seek(&host, 0, Whence::Set), Err(Errno::EBADF));

    // a fresh open of the same number starts clean
    let reopened = table.get_or_insert(4);
    assert_eq!(reopened.seek(&host, 3, Whence::Set), Ok(3));
}
