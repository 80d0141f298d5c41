//! Phar on-disk layout.
//!
//! ```text
//! stub ... __HALT_COMPILER(); ?>\r\n
//! u32  manifest length (bytes after this field up to the first payload)
//! u32  entry count
//! u16  API version (0x11, 0x10)
//! u32  global flags (signature present)
//! u32  alias length, alias
//! u32  metadata length (0)
//! per entry:
//!   u32 name length, name, u32 size, u32 mtime, u32 stored size,
//!   u32 crc32, u32 flags (permissions), u32 metadata length (0)
//! entry payloads, in manifest order
//! digest, u32 signature flag, "GBMB"
//! ```
//!
//! All integers are little-endian.

use sha2::{Digest, Sha256, Sha512};

use super::error::{ArchiveError, ArchiveResult};
use super::ArchiveEntry;

pub const HALT_COMPILER: &str = "__HALT_COMPILER();";
/// Appended after `__HALT_COMPILER();` when the stub is written.
pub const STUB_TERMINATOR: &str = " ?>\r\n";
pub const API_VERSION: [u8; 2] = [0x11, 0x10];
pub const FLAG_HAS_SIGNATURE: u32 = 0x0001_0000;
pub const ENTRY_PERMISSIONS: u32 = 0o644;
pub const SIGNATURE_MAGIC: &[u8; 4] = b"GBMB";
/// Seven u32 fields around an empty name.
const ENTRY_HEADER_MIN: usize = 7 * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl SignatureAlgorithm {
    pub fn flag(self) -> u32 {
        match self {
            SignatureAlgorithm::Sha256 => 0x0003,
            SignatureAlgorithm::Sha512 => 0x0004,
        }
    }

    pub fn from_flag(flag: u32) -> ArchiveResult<Self> {
        match flag {
            0x0003 => Ok(SignatureAlgorithm::Sha256),
            0x0004 => Ok(SignatureAlgorithm::Sha512),
            other => Err(ArchiveError::UnsupportedSignature(other)),
        }
    }

    pub fn digest_len(self) -> usize {
        match self {
            SignatureAlgorithm::Sha256 => 32,
            SignatureAlgorithm::Sha512 => 64,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            SignatureAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            SignatureAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha256 => "SHA-256",
            SignatureAlgorithm::Sha512 => "SHA-512",
        }
    }
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            "sha512" => Ok(SignatureAlgorithm::Sha512),
            other => Err(format!("unknown signature algorithm: {other}")),
        }
    }
}

/// Offset just past `__HALT_COMPILER();`, matched case-insensitively.
pub fn find_halt_compiler(data: &[u8]) -> Option<usize> {
    let needle = HALT_COMPILER.as_bytes();
    data.windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|p| p + needle.len())
}

/// Cut the stub after `__HALT_COMPILER();` and append the terminator.
pub fn stub_bytes(stub: &str) -> ArchiveResult<Vec<u8>> {
    let end = find_halt_compiler(stub.as_bytes()).ok_or(ArchiveError::InvalidStub)?;
    let mut out = stub.as_bytes()[..end].to_vec();
    out.extend_from_slice(STUB_TERMINATOR.as_bytes());
    Ok(out)
}

fn u32_len(path: &str, len: usize) -> ArchiveResult<u32> {
    u32::try_from(len).map_err(|_| ArchiveError::EntryTooLarge {
        path: path.to_string(),
        size: len,
    })
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Serialize a complete, signed phar.
pub fn encode(
    stub: &str,
    alias: &str,
    entries: &[ArchiveEntry],
    algorithm: SignatureAlgorithm,
) -> ArchiveResult<Vec<u8>> {
    let mut manifest = Vec::new();
    put_u32(&mut manifest, u32_len(alias, entries.len())?);
    manifest.extend_from_slice(&API_VERSION);
    put_u32(&mut manifest, FLAG_HAS_SIGNATURE);
    put_u32(&mut manifest, u32_len(alias, alias.len())?);
    manifest.extend_from_slice(alias.as_bytes());
    put_u32(&mut manifest, 0);

    for entry in entries {
        let size = u32_len(&entry.path, entry.content.len())?;
        put_u32(&mut manifest, u32_len(&entry.path, entry.path.len())?);
        manifest.extend_from_slice(entry.path.as_bytes());
        put_u32(&mut manifest, size);
        put_u32(&mut manifest, entry.mtime);
        put_u32(&mut manifest, size);
        put_u32(&mut manifest, crc32fast::hash(&entry.content));
        put_u32(&mut manifest, ENTRY_PERMISSIONS);
        put_u32(&mut manifest, 0);
    }

    let mut out = stub_bytes(stub)?;
    put_u32(&mut out, u32_len(alias, manifest.len())?);
    out.extend_from_slice(&manifest);
    for entry in entries {
        out.extend_from_slice(&entry.content);
    }

    let digest = algorithm.digest(&out);
    out.extend_from_slice(&digest);
    put_u32(&mut out, algorithm.flag());
    out.extend_from_slice(SIGNATURE_MAGIC);
    Ok(out)
}

/// A parsed phar.
#[derive(Debug, Clone)]
pub struct Decoded {
    /// Stub text up to and including `__HALT_COMPILER();`.
    pub stub: String,
    pub alias: String,
    pub entries: Vec<ArchiveEntry>,
    pub algorithm: SignatureAlgorithm,
    pub signature: Vec<u8>,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, what: &str) -> ArchiveResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| ArchiveError::malformed(format!("truncated {what}")))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self, what: &str) -> ArchiveResult<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self, what: &str) -> ArchiveResult<String> {
        let len = self.u32(what)? as usize;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ArchiveError::malformed(format!("{what} is not UTF-8")))
    }
}

/// Parse and verify a phar.
pub fn decode(data: &[u8]) -> ArchiveResult<Decoded> {
    // Trailer: digest, flag, magic.
    if data.len() < 8 || &data[data.len() - 4..] != SIGNATURE_MAGIC {
        return Err(ArchiveError::malformed("missing GBMB signature trailer"));
    }
    let flag_at = data.len() - 8;
    let flag = u32::from_le_bytes([
        data[flag_at],
        data[flag_at + 1],
        data[flag_at + 2],
        data[flag_at + 3],
    ]);
    let algorithm = SignatureAlgorithm::from_flag(flag)?;
    let signed_len = flag_at
        .checked_sub(algorithm.digest_len())
        .ok_or_else(|| ArchiveError::malformed("truncated signature"))?;
    let signature = data[signed_len..flag_at].to_vec();
    if algorithm.digest(&data[..signed_len]) != signature {
        return Err(ArchiveError::SignatureMismatch);
    }
    let body = &data[..signed_len];

    let halt = find_halt_compiler(body)
        .ok_or_else(|| ArchiveError::malformed("no __HALT_COMPILER(); in stub"))?;
    let stub = String::from_utf8_lossy(&body[..halt]).into_owned();
    let mut pos = halt;
    for skip in [" ?>", "?>"] {
        if body[pos..].starts_with(skip.as_bytes()) {
            pos += skip.len();
            break;
        }
    }
    if body[pos..].starts_with(b"\r\n") {
        pos += 2;
    } else if body[pos..].starts_with(b"\n") {
        pos += 1;
    }

    let mut cur = Cursor { data: body, pos };
    let manifest_len = cur.u32("manifest length")? as usize;
    let manifest_end = cur
        .pos
        .checked_add(manifest_len)
        .filter(|&end| end <= body.len())
        .ok_or_else(|| ArchiveError::malformed("manifest length exceeds file"))?;
    let count = cur.u32("entry count")?;
    cur.take(2, "API version")?;
    let flags = cur.u32("global flags")?;
    if flags & FLAG_HAS_SIGNATURE == 0 {
        return Err(ArchiveError::malformed("signature flag not set"));
    }
    let alias = cur.string("alias")?;
    let meta_len = cur.u32("metadata length")? as usize;
    cur.take(meta_len, "metadata")?;

    let room = manifest_end.saturating_sub(cur.pos);
    if (count as usize).saturating_mul(ENTRY_HEADER_MIN) > room {
        return Err(ArchiveError::malformed(format!(
            "entry count {count} does not fit the manifest"
        )));
    }
    let mut headers = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let path = cur.string("entry name")?;
        let size = cur.u32("entry size")?;
        let mtime = cur.u32("entry timestamp")?;
        let stored = cur.u32("entry stored size")?;
        let crc = cur.u32("entry crc32")?;
        cur.u32("entry flags")?;
        let meta_len = cur.u32("entry metadata length")? as usize;
        cur.take(meta_len, "entry metadata")?;
        if stored != size {
            return Err(ArchiveError::malformed(format!(
                "compressed entry {path} is not supported"
            )));
        }
        headers.push((path, size as usize, mtime, crc));
    }
    if cur.pos != manifest_end {
        return Err(ArchiveError::malformed("manifest length mismatch"));
    }

    let mut entries = Vec::with_capacity(headers.len());
    for (path, size, mtime, crc) in headers {
        let content = cur.take(size, "entry payload")?.to_vec();
        if crc32fast::hash(&content) != crc {
            return Err(ArchiveError::malformed(format!("crc32 mismatch for {path}")));
        }
        entries.push(ArchiveEntry {
            path,
            content,
            mtime,
        });
    }
    if cur.pos != body.len() {
        return Err(ArchiveError::malformed("trailing bytes after payload"));
    }

    Ok(Decoded {
        stub,
        alias,
        entries,
        algorithm,
        signature,
    })
}
