//! Raw directory-entry records
//!
//! `fd_readdir` fills a caller buffer with packed records:
//!
//! ```text
//! offset  size  field
//!      0     8  d_next   cookie resuming after this entry
//!      8     8  d_ino    inode
//!     16     4  d_namlen length of the name that follows
//!     20     4  d_type   file type code (first byte), padding
//!     24     N  name     no terminator, no alignment
//! ```
//!
//! Integers are little-endian, the byte order of the sandbox. The host may
//! cut the last record short when the buffer runs out, so every accessor
//! answers `None` ("need more data") instead of reading past the slice.

use crate::errno::Errno;
use crate::types::{Dircookie, FileType};

/// Size of the fixed record header
pub const DIRENT_HEADER_SIZE: usize = 24;

const NEXT_OFFSET: usize = 0;
const NEXT_SIZE: usize = 8;
const INO_OFFSET: usize = 8;
const INO_SIZE: usize = 8;
const NAMLEN_OFFSET: usize = 16;
const NAMLEN_SIZE: usize = 4;
const TYPE_OFFSET: usize = 20;
const TYPE_SIZE: usize = 4;

/// Read a little-endian unsigned integer of `size` bytes at `offset`.
fn read_uint(buf: &[u8], offset: usize, size: usize) -> Option<u64> {
    let bytes = buf.get(offset..offset.checked_add(size)?)?;
    Some(
        bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
    )
}

#[must_use]
pub fn dirent_next(buf: &[u8]) -> Option<Dircookie> {
    read_uint(buf, NEXT_OFFSET, NEXT_SIZE)
}

#[must_use]
pub fn dirent_ino(buf: &[u8]) -> Option<u64> {
    read_uint(buf, INO_OFFSET, INO_SIZE)
}

#[must_use]
pub fn dirent_namlen(buf: &[u8]) -> Option<u64> {
    read_uint(buf, NAMLEN_OFFSET, NAMLEN_SIZE)
}

/// Total record length, header plus name. Needs a readable `d_namlen`.
#[must_use]
pub fn dirent_reclen(buf: &[u8]) -> Option<u64> {
    dirent_namlen(buf).map(|namlen| DIRENT_HEADER_SIZE as u64 + namlen)
}

/// File type code. The field is 4 bytes wide; only its low byte carries
/// the code, the rest is padding.
#[must_use]
pub fn dirent_type(buf: &[u8]) -> Option<FileType> {
    read_uint(buf, TYPE_OFFSET, TYPE_SIZE).map(|raw| FileType::from_raw((raw & 0xff) as u8))
}

/// A record parsed in place; `name` borrows from the host buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry<'a> {
    pub next: Dircookie,
    pub ino: u64,
    pub file_type: FileType,
    pub name: &'a [u8],
}

/// Outcome of parsing the record at the start of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed<'a> {
    /// A complete record occupying `entry.reclen()` bytes
    Entry(DirEntry<'a>),
    /// The buffer holds only a prefix; at least `needed` bytes are required
    Incomplete { needed: usize },
}

impl<'a> DirEntry<'a> {
    /// Parse the record at the start of `buf`.
    ///
    /// Fails only with `EOVERFLOW` when the declared record length cannot be
    /// addressed on this platform.
    pub fn parse(buf: &'a [u8]) -> Result<Parsed<'a>, Errno> {
        let Some(reclen) = dirent_reclen(buf) else {
            return Ok(Parsed::Incomplete {
                needed: DIRENT_HEADER_SIZE,
            });
        };
        let reclen = usize::try_from(reclen).map_err(|_| Errno::EOVERFLOW)?;
        if buf.len() < reclen {
            return Ok(Parsed::Incomplete { needed: reclen });
        }

        // a readable name length implies the whole header fits
        let (Some(next), Some(ino), Some(file_type)) =
            (dirent_next(buf), dirent_ino(buf), dirent_type(buf))
        else {
            return Ok(Parsed::Incomplete {
                needed: DIRENT_HEADER_SIZE,
            });
        };

        Ok(Parsed::Entry(DirEntry {
            next,
            ino,
            file_type,
            name: &buf[DIRENT_HEADER_SIZE..reclen],
        }))
    }

    #[must_use]
    pub const fn reclen(&self) -> usize {
        DIRENT_HEADER_SIZE + self.name.len()
    }

    /// Name as UTF-8, lossily
    #[must_use]
    pub fn name_lossy(&self) -> std::borrow::Cow<'a, str> {
        String::from_utf8_lossy(self.name)
    }
}

/// Iterator over the complete records at the front of a buffer.
///
/// Stops at the first truncated record. `consumed` and `cookie` then tell
/// the caller where to resume.
#[derive(Debug, Clone)]
pub struct DirEntries<'a> {
    buf: &'a [u8],
    consumed: usize,
    cookie: Option<Dircookie>,
    error: Option<Errno>,
}

impl<'a> DirEntries<'a> {
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            consumed: 0,
            cookie: None,
            error: None,
        }
    }

    /// Bytes taken by the records yielded so far
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// `d_next` of the last record yielded
    #[must_use]
    pub const fn cookie(&self) -> Option<Dircookie> {
        self.cookie
    }

    /// Bytes left over after the yielded records
    #[must_use]
    pub fn remainder(&self) -> &'a [u8] {
        &self.buf[self.consumed..]
    }

    /// Error that stopped iteration early, if any
    #[must_use]
    pub const fn error(&self) -> Option<Errno> {
        self.error
    }
}

impl<'a> Iterator for DirEntries<'a> {
    type Item = DirEntry<'a>;

    fn next(&mut self) -> Option<DirEntry<'a>> {
        if self.error.is_some() {
            return None;
        }
        match DirEntry::parse(self.remainder()) {
            Ok(Parsed::Entry(entry)) => {
                self.consumed += entry.reclen();
                self.cookie = Some(entry.next);
                Some(entry)
            }
            Ok(Parsed::Incomplete { .. }) => None,
            Err(errno) => {
                self.error = Some(errno);
                None
            }
        }
    }
}

/// Append one record in the host layout to `out`.
///
/// Fails with `ENAMETOOLONG` if the name length does not fit `d_namlen`.
pub fn encode_dirent(
    next: Dircookie,
    ino: u64,
    file_type: FileType,
    name: &[u8],
    out: &mut Vec<u8>,
) -> Result<(), Errno> {
    let namlen = u32::try_from(name.len()).map_err(|_| Errno::ENAMETOOLONG)?;
    out.reserve(DIRENT_HEADER_SIZE + name.len());
    out.extend_from_slice(&next.to_le_bytes());
    out.extend_from_slice(&ino.to_le_bytes());
    out.extend_from_slice(&namlen.to_le_bytes());
    out.extend_from_slice(&[file_type.raw(), 0, 0, 0]);
    out.extend_from_slice(name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(next: u64, ino: u64, file_type: FileType, name: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_dirent(next, ino, file_type, name.as_bytes(), &mut buf).unwrap();
        buf
    }

    #[test]
    fn parses_complete_record() {
        let buf = record(7, 0xdead_beef_cafe, FileType::RegularFile, "hello.txt");
        assert_eq!(buf.len(), DIRENT_HEADER_SIZE + 9);

        let Parsed::Entry(entry) = DirEntry::parse(&buf).unwrap() else {
            panic!("expected a complete entry");
        };
        assert_eq!(
            entry,
            DirEntry {
                next: 7,
                ino: 0xdead_beef_cafe,
                file_type: FileType::RegularFile,
                name: b"hello.txt",
            }
        );
        assert_eq!(entry.reclen(), buf.len());
    }

    #[test]
    fn accessors_report_missing_bytes() {
        let buf = record(1, 2, FileType::Directory, "dir");

        assert_eq!(dirent_ino(&buf[..15]), None);
        assert_eq!(dirent_ino(&buf[..16]), Some(2));
        assert_eq!(dirent_namlen(&buf[..19]), None);
        assert_eq!(dirent_namlen(&buf[..20]), Some(3));
        assert_eq!(dirent_reclen(&buf[..19]), None);
        assert_eq!(dirent_reclen(&buf[..20]), Some(27));
        assert_eq!(dirent_next(&buf[..7]), None);
        assert_eq!(dirent_type(&buf[..24]), Some(FileType::Directory));
    }

    #[test]
    fn type_needs_its_whole_field() {
        let buf = record(1, 2, FileType::Directory, "dir");

        for len in 20..DIRENT_HEADER_SIZE {
            assert_eq!(dirent_type(&buf[..len]), None, "prefix of {len} bytes");
            assert_eq!(
                DirEntry::parse(&buf[..len]).unwrap(),
                Parsed::Incomplete {
                    needed: DIRENT_HEADER_SIZE + 3
                }
            );
        }
    }

    #[test]
    fn truncated_record_is_incomplete() {
        let buf = record(1, 2, FileType::Directory, "subdir");

        assert_eq!(
            DirEntry::parse(&buf[..10]).unwrap(),
            Parsed::Incomplete {
                needed: DIRENT_HEADER_SIZE
            }
        );
        assert_eq!(
            DirEntry::parse(&buf[..DIRENT_HEADER_SIZE + 2]).unwrap(),
            Parsed::Incomplete { needed: 30 }
        );
        assert_eq!(DirEntry::parse(&[]).unwrap(), Parsed::Incomplete { needed: 24 });
    }

    #[test]
    fn name_needs_no_alignment() {
        // an odd-length name pushes the next record off any alignment
        let mut buf = record(1, 10, FileType::RegularFile, "a");
        buf.extend(record(2, 11, FileType::SymbolicLink, "link"));

        let entries: Vec<_> = DirEntries::new(&buf).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, b"link");
        assert_eq!(entries[1].file_type, FileType::SymbolicLink);
        assert_eq!(entries[1].ino, 11);
    }

    #[test]
    fn iteration_stops_at_truncated_tail() {
        let mut buf = record(1, 10, FileType::Directory, ".");
        buf.extend(record(2, 11, FileType::Directory, ".."));
        let full = buf.len();
        buf.extend(record(3, 12, FileType::RegularFile, "cut-short"));
        buf.truncate(full + 28);

        let mut iter = DirEntries::new(&buf);
        let names: Vec<_> = iter.by_ref().map(|e| e.name_lossy().into_owned()).collect();
        assert_eq!(names, vec![".".to_string(), "..".to_string()]);
        assert_eq!(iter.consumed(), full);
        assert_eq!(iter.cookie(), Some(2));
        assert_eq!(iter.remainder().len(), 28);
        assert_eq!(iter.error(), None);
    }

    #[test]
    fn type_padding_is_ignored() {
        let mut buf = record(1, 2, FileType::RegularFile, "x");
        buf[21] = 0xff;
        buf[23] = 0x7f;
        assert_eq!(dirent_type(&buf), Some(FileType::RegularFile));
    }
}
