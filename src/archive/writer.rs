//! Buffered phar writer.
//!
//! Writing happens in two phases with different guarantees:
//!
//! 1. Between [`PharArchive::start_buffering`] and
//!    [`PharArchive::stop_buffering`] entries only accumulate in memory. The
//!    stop commits stub, entries and signature through a temp file in the
//!    output directory that is renamed over the target, so the target path
//!    never holds a half-written archive from this phase.
//! 2. [`PharArchive::append_entry`] adds an entry to an already committed
//!    archive and commits the whole image again the same way. Each append is
//!    its own commit: an interruption between phases leaves the phase 1
//!    archive on disk, complete except for the appended entry.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::error::{ArchiveError, ArchiveResult};
use super::format::{self, SignatureAlgorithm};
use super::ArchiveEntry;

/// Mode of the committed artifact.
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Buffering,
    Committed,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Created => "not buffering",
            State::Buffering => "buffering",
            State::Committed => "committed",
        }
    }
}

/// A phar under construction at `path`, identified at run time by `alias`.
pub struct PharArchive {
    path: PathBuf,
    alias: String,
    algorithm: SignatureAlgorithm,
    stub: Option<String>,
    entries: Vec<ArchiveEntry>,
    index: HashMap<String, usize>,
    state: State,
}

impl PharArchive {
    /// Open a new, empty archive. Nothing touches the disk until commit.
    pub fn create(path: impl AsRef<Path>, alias: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            alias: alias.to_string(),
            algorithm: SignatureAlgorithm::default(),
            stub: None,
            entries: Vec::new(),
            index: HashMap::new(),
            state: State::Created,
        }
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn set_signature_algorithm(&mut self, algorithm: SignatureAlgorithm) {
        self.algorithm = algorithm;
    }

    fn require(&self, state: State, operation: &'static str) -> ArchiveResult<()> {
        if self.state != state {
            return Err(ArchiveError::InvalidState {
                operation,
                state: self.state.name(),
            });
        }
        Ok(())
    }

    pub fn start_buffering(&mut self) -> ArchiveResult<()> {
        self.require(State::Created, "start buffering")?;
        self.state = State::Buffering;
        Ok(())
    }

    fn insert(&mut self, entry: ArchiveEntry) -> ArchiveResult<()> {
        validate_path(&entry.path)?;
        if self.index.contains_key(&entry.path) {
            return Err(ArchiveError::DuplicateEntry(entry.path));
        }
        self.index.insert(entry.path.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Add an entry during the buffered phase.
    pub fn add_entry(&mut self, entry: ArchiveEntry) -> ArchiveResult<()> {
        self.require(State::Buffering, "add an entry")?;
        self.insert(entry)
    }

    pub fn set_stub(&mut self, stub: &str) -> ArchiveResult<()> {
        self.require(State::Buffering, "set the stub")?;
        if format::find_halt_compiler(stub.as_bytes()).is_none() {
            return Err(ArchiveError::InvalidStub);
        }
        self.stub = Some(stub.to_string());
        Ok(())
    }

    /// Commit everything buffered so far. Returns the artifact size in bytes.
    pub fn stop_buffering(&mut self) -> ArchiveResult<u64> {
        self.require(State::Buffering, "stop buffering")?;
        let size = self.commit()?;
        self.state = State::Committed;
        Ok(size)
    }

    /// Add one entry to the committed artifact and commit it again.
    pub fn append_entry(&mut self, entry: ArchiveEntry) -> ArchiveResult<u64> {
        self.require(State::Committed, "append an entry")?;
        self.insert(entry)?;
        match self.commit() {
            Ok(size) => Ok(size),
            Err(e) => {
                if let Some(last) = self.entries.pop() {
                    self.index.remove(&last.path);
                }
                Err(e)
            }
        }
    }

    /// Write the current image to a temp file next to the target and rename
    /// it over the target.
    fn commit(&self) -> ArchiveResult<u64> {
        let bytes = self.encode()?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp =
            NamedTempFile::new_in(&dir).map_err(|e| ArchiveError::io(&dir, e))?;
        tmp.write_all(&bytes)
            .map_err(|e| ArchiveError::io(tmp.path(), e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(ARTIFACT_MODE))
                .map_err(|e| ArchiveError::io(tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| ArchiveError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| ArchiveError::io(&self.path, e.error))?;

        Ok(bytes.len() as u64)
    }

    fn encode(&self) -> ArchiveResult<Vec<u8>> {
        let stub = self.stub.as_deref().ok_or(ArchiveError::MissingStub)?;
        format::encode(stub, &self.alias, &self.entries, self.algorithm)
    }

    /// Release the archive. Buffered but uncommitted entries are discarded.
    pub fn close(self) -> Vec<ArchiveEntry> {
        if self.state == State::Buffering {
            tracing::warn!(
                "discarding {} uncommitted entries for {}",
                self.entries.len(),
                self.path.display()
            );
        }
        self.entries
    }
}

fn validate_path(path: &str) -> ArchiveResult<()> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|c| c.is_empty() || c == "." || c == "..");
    if bad {
        return Err(ArchiveError::InvalidPath(path.to_string()));
    }
    Ok(())
}
