//! Phar container: entries, on-disk format, buffered writer and reader.

mod error;
pub mod format;
mod reader;
mod writer;

pub use error::{ArchiveError, ArchiveResult};
pub use format::SignatureAlgorithm;
pub use reader::PharReader;
pub use writer::PharArchive;

/// One file inside the archive, keyed by its `/`-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub content: Vec<u8>,
    /// Seconds since the Unix epoch.
    pub mtime: u32,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<String>, content: Vec<u8>, mtime: u32) -> Self {
        Self {
            path: path.into(),
            content,
            mtime,
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}
