//! # burrow-core
//!
//! POSIX compatibility shim for programs running on `wasi_snapshot_preview1`.
//!
//! This crate provides:
//! - The preview1 errno table with text rendering and portable error kinds
//! - Directory-entry record parsing over raw host buffers
//! - Per-descriptor state: cached file type, directory cursor, seek rules
//! - Identity, clock and signal emulation for a single-process sandbox
//! - A `Host` trait over the few boundary calls all of the above need

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod consts;
pub mod dirent;
pub mod errno;
pub mod error;
pub mod fd;
pub mod host;
pub mod process;
pub mod signal;
pub mod types;

pub use config::ShimConfig;
pub use dirent::{DirEntries, DirEntry, Parsed};
pub use errno::Errno;
pub use error::BurrowError;
pub use fd::{Descriptor, DirEntryBuf, FdTable};
pub use host::Host;
pub use process::ProcessState;
pub use signal::Signal;
pub use types::{ClockId, FileType, Timespec, Timeval, Whence};

/// Crate-level result type
pub type Result<T> = std::result::Result<T, BurrowError>;
