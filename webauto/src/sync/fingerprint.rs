//! Content fingerprints compatible with S3 ETags.
//!
//! S3 reports the ETag of a single-part upload as the quoted hex MD5 of the
//! body. For multipart uploads the ETag is the MD5 of the concatenated raw
//! part digests followed by `-<part count>`. Hashing a local file with the
//! same chunk size as the upload part size therefore reproduces the ETag the
//! store will report, so unchanged files can be detected without downloading.

use crate::utils::errors::{Result, WebautoError};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default chunk size for fingerprints and multipart uploads (8MB)
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// An ETag-compatible content fingerprint, quotes included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of parts encoded in a multipart fingerprint (1 for single-part)
    pub fn part_count(&self) -> usize {
        self.0
            .trim_matches('"')
            .rsplit_once('-')
            .and_then(|(_, n)| n.parse().ok())
            .unwrap_or(1)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// Fingerprint the file at `path`.
///
/// Returns `Ok(None)` for an empty file: no chunk is produced, so there is
/// nothing to compare against.
pub fn fingerprint(path: &Path, chunk_size: usize) -> Result<Option<Fingerprint>> {
    let file = File::open(path).map_err(|e| WebautoError::local_read(path, e))?;
    fingerprint_reader(file, chunk_size).map_err(|e| WebautoError::local_read(path, e))
}

/// Fingerprint everything readable from `reader`, in chunks of `chunk_size`.
pub fn fingerprint_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<Option<Fingerprint>> {
    if chunk_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "chunk size must be positive",
        ));
    }

    let mut buffer = vec![0u8; chunk_size];
    // Raw part digests, concatenated in read order
    let mut digests: Vec<u8> = Vec::new();
    let mut parts = 0usize;

    loop {
        let filled = read_chunk(&mut reader, &mut buffer)?;
        if filled == 0 {
            break;
        }
        digests.extend_from_slice(&Md5::digest(&buffer[..filled]));
        parts += 1;
        if filled < chunk_size {
            break;
        }
    }

    let fingerprint = match parts {
        0 => return Ok(None),
        1 => format!("\"{}\"", hex::encode(&digests)),
        n => format!("\"{}-{}\"", hex::encode(Md5::digest(&digests)), n),
    };

    Ok(Some(Fingerprint(fingerprint)))
}

/// Fill `buffer` as far as the reader allows; short only at end of input.
fn read_chunk<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
