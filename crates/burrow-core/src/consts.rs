//! POSIX constants exposed to code ported from unix
//!
//! Values match what programs compiled for the shim expect; the host never
//! sees most of them directly.

use crate::types::FileType;

pub const STDIN: i32 = 0;
pub const STDOUT: i32 = 1;
pub const STDERR: i32 = 2;

pub const PATH_MAX: usize = 256;

pub const O_RDONLY: i32 = 0;
pub const O_WRONLY: i32 = 1;
pub const O_RDWR: i32 = 2;

pub const O_CREAT: i32 = 0o100;
pub const O_CREATE: i32 = O_CREAT;
pub const O_TRUNC: i32 = 0o1000;
pub const O_APPEND: i32 = 0o2000;
pub const O_EXCL: i32 = 0o200;
pub const O_SYNC: i32 = 0o10000;

pub const O_CLOEXEC: i32 = 0;

pub const F_DUPFD: i32 = 0;
pub const F_GETFD: i32 = 1;
pub const F_SETFD: i32 = 2;
pub const F_GETFL: i32 = 3;
pub const F_SETFL: i32 = 4;
pub const F_GETOWN: i32 = 5;
pub const F_SETOWN: i32 = 6;
pub const F_GETLK: i32 = 7;
pub const F_SETLK: i32 = 8;
pub const F_SETLKW: i32 = 9;
pub const F_RGETLK: i32 = 10;
pub const F_RSETLK: i32 = 11;
pub const F_CNVT: i32 = 12;
pub const F_RSETLKW: i32 = 13;

pub const F_RDLCK: i32 = 1;
pub const F_WRLCK: i32 = 2;
pub const F_UNLCK: i32 = 3;
pub const F_UNLKSYS: i32 = 4;

pub const S_IFMT: u32 = 0o370_000;
pub const S_IFSHM_SYSV: u32 = 0o300_000;
pub const S_IFSEMA: u32 = 0o270_000;
pub const S_IFCOND: u32 = 0o260_000;
pub const S_IFMUTEX: u32 = 0o250_000;
pub const S_IFSHM: u32 = 0o240_000;
pub const S_IFBOUNDSOCK: u32 = 0o230_000;
pub const S_IFSOCKADDR: u32 = 0o220_000;
pub const S_IFDSOCK: u32 = 0o210_000;

pub const S_IFSOCK: u32 = 0o140_000;
pub const S_IFLNK: u32 = 0o120_000;
pub const S_IFREG: u32 = 0o100_000;
pub const S_IFBLK: u32 = 0o060_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFCHR: u32 = 0o020_000;
pub const S_IFIFO: u32 = 0o010_000;

pub const S_UNSUP: u32 = 0o370_000;

pub const S_ISUID: u32 = 0o4000;
pub const S_ISGID: u32 = 0o2000;
pub const S_ISVTX: u32 = 0o1000;

pub const S_IREAD: u32 = 0o400;
pub const S_IWRITE: u32 = 0o200;
pub const S_IEXEC: u32 = 0o100;

pub const S_IRWXU: u32 = 0o700;
pub const S_IRUSR: u32 = 0o400;
pub const S_IWUSR: u32 = 0o200;
pub const S_IXUSR: u32 = 0o100;

pub const S_IRWXG: u32 = 0o070;
pub const S_IRGRP: u32 = 0o040;
pub const S_IWGRP: u32 = 0o020;
pub const S_IXGRP: u32 = 0o010;

pub const S_IRWXO: u32 = 0o007;
pub const S_IROTH: u32 = 0o004;
pub const S_IWOTH: u32 = 0o002;
pub const S_IXOTH: u32 = 0o001;

/// File-type bits of a mode for a host file type
#[must_use]
pub const fn mode_type_bits(file_type: FileType) -> u32 {
    match file_type {
        FileType::BlockDevice => S_IFBLK,
        FileType::CharacterDevice => S_IFCHR,
        FileType::Directory => S_IFDIR,
        FileType::RegularFile => S_IFREG,
        FileType::SocketDgram => S_IFDSOCK,
        FileType::SocketStream => S_IFSOCK,
        FileType::SymbolicLink => S_IFLNK,
        FileType::Unknown => S_UNSUP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_bits_fit_the_type_mask() {
        for raw in 0..=7 {
            let bits = mode_type_bits(FileType::from_raw(raw));
            assert_eq!(bits & S_IFMT, bits);
        }
        assert_eq!(mode_type_bits(FileType::Directory), S_IFDIR);
    }
}
