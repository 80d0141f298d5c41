//! Reading built phars back for listing and verification.

use std::fs;
use std::path::Path;

use super::error::{ArchiveError, ArchiveResult};
use super::format::{self, Decoded, SignatureAlgorithm};
use super::ArchiveEntry;

/// A parsed phar whose signature has been verified.
pub struct PharReader {
    decoded: Decoded,
    size: u64,
}

impl PharReader {
    /// Read and verify the phar at `path`.
    pub fn open(path: &Path) -> ArchiveResult<Self> {
        let data = fs::read(path).map_err(|e| ArchiveError::io(path, e))?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> ArchiveResult<Self> {
        Ok(Self {
            decoded: format::decode(data)?,
            size: data.len() as u64,
        })
    }

    pub fn alias(&self) -> &str {
        &self.decoded.alias
    }

    pub fn stub(&self) -> &str {
        &self.decoded.stub
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.decoded.entries
    }

    pub fn entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.decoded.entries.iter().find(|e| e.path == path)
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.decoded.algorithm
    }

    pub fn signature_hex(&self) -> String {
        self.decoded
            .signature
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}
