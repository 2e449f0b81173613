//! Hashed bundle resources.

use crate::{Error, Result};
use sha1::{Digest, Sha1};
use std::fs;
use std::path::PathBuf;

/// Where the bytes of a bundle resource come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    /// Read the file at this path when the bundle is assembled.
    File(PathBuf),
    /// Use these bytes as-is.
    Bytes(Vec<u8>),
}

impl From<PathBuf> for ResourceSource {
    fn from(path: PathBuf) -> Self {
        ResourceSource::File(path)
    }
}

impl From<Vec<u8>> for ResourceSource {
    fn from(data: Vec<u8>) -> Self {
        ResourceSource::Bytes(data)
    }
}

impl From<&[u8]> for ResourceSource {
    fn from(data: &[u8]) -> Self {
        ResourceSource::Bytes(data.to_vec())
    }
}

/// A bundle resource together with its archive path and SHA-1 hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedEntry {
    path: String,
    data: Vec<u8>,
    sha1: [u8; 20],
}

impl HashedEntry {
    /// Hash an in-memory buffer.
    pub fn from_bytes(path: impl Into<String>, data: Vec<u8>) -> Self {
        let sha1 = sha1_digest(&data);
        Self {
            path: path.into(),
            data,
            sha1,
        }
    }

    /// Read a resource from its source and hash it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a file source does not exist or cannot be read.
    /// The message names the file.
    pub fn produce(path: impl Into<String>, source: ResourceSource) -> Result<Self> {
        let path = path.into();
        let data = match source {
            ResourceSource::Bytes(data) => data,
            ResourceSource::File(file) => fs::read(&file).map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to read {} for {}: {}", file.display(), path, e),
                ))
            })?,
        };

        tracing::debug!(path = %path, size = data.len(), "hashed bundle entry");
        Ok(Self::from_bytes(path, data))
    }

    /// Archive-relative path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Exact bytes that go into the archive.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw SHA-1 digest of [`data`](Self::data).
    pub fn sha1(&self) -> &[u8; 20] {
        &self.sha1
    }

    /// Lowercase hex SHA-1, as written to `manifest.json`.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.sha1)
    }

    /// Consume the entry, returning path and bytes.
    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.path, self.data)
    }
}

/// Lowercase hex SHA-1 of `data`.
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(sha1_digest(data))
}

fn sha1_digest(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let result = hasher.finalize();

    let mut sha1 = [0u8; 20];
    sha1.copy_from_slice(&result);
    sha1
}
