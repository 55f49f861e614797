//! Content hashing for imported libraries.
//!
//! SHA256 and BLAKE3 are computed in a single pass: BLAKE3 names the managed
//! copy, SHA256 is recorded for consumers that verify what they load.

use crate::error::{InjectorError, Result};
use blake3::Hasher as Blake3Hasher;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files (1MB; shared libraries are small).
const CHUNK_SIZE: usize = 1024 * 1024;

/// Hashes of one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash {
    /// SHA256 as lowercase hex
    pub sha256: String,
    /// BLAKE3 as lowercase hex
    pub blake3: String,
    pub size_bytes: u64,
}

impl ContentHash {
    /// Prefix of the BLAKE3 digest used in stored file names.
    pub fn short_id(&self, len: usize) -> &str {
        &self.blake3[..len.min(self.blake3.len())]
    }
}

/// Compute both hashes in a single read of `path`.
pub fn compute_content_hash(path: impl AsRef<Path>) -> Result<ContentHash> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| InjectorError::io_with_path(e, path))?;

    let mut sha256_hasher = Sha256::new();
    let mut blake3_hasher = Blake3Hasher::new();
    let mut size_bytes: u64 = 0;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| InjectorError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }

        sha256_hasher.update(&buffer[..bytes_read]);
        blake3_hasher.update(&buffer[..bytes_read]);
        size_bytes += bytes_read as u64;
    }

    Ok(ContentHash {
        sha256: hex::encode(sha256_hasher.finalize()),
        blake3: blake3_hasher.finalize().to_hex().to_string(),
        size_bytes,
    })
}
