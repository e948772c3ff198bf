//! Error types for burrow-core

use crate::errno::Errno;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BurrowError {
    #[error("host error: {0}")]
    Errno(#[from] Errno),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BurrowError {
    /// The sandbox errno carried by this error, if any
    #[must_use]
    pub const fn errno(&self) -> Option<Errno> {
        match self {
            Self::Errno(errno) => Some(*errno),
            _ => None,
        }
    }
}
