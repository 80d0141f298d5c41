//! Phar container errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("invalid entry path: {0:?}")]
    InvalidPath(String),

    #[error("entry {path} is too large for the phar manifest ({size} bytes)")]
    EntryTooLarge { path: String, size: usize },

    #[error("stub does not contain __HALT_COMPILER();")]
    InvalidStub,

    #[error("no stub set before committing the archive")]
    MissingStub,

    #[error("cannot {operation} while the archive is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("malformed phar: {0}")]
    Malformed(String),

    #[error("unsupported signature flag {0:#06x}")]
    UnsupportedSignature(u32),

    #[error("signature mismatch")]
    SignatureMismatch,
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
