//! Pass archive writing.
//!
//! A `.pkpass` file is a flat ZIP: resource entries in manifest order,
//! then `manifest.json` and `signature`, both stored uncompressed.
//!
//! Every entry gets the same fixed timestamp and permissions, so identical
//! inputs produce identical archives apart from the signature.
//!
//! # Examples
//!
//! ```
//! use pkpass::archive::{read_bundle, write_bundle, CompressionLevel};
//! use pkpass::manifest::HashedEntry;
//!
//! let entries = vec![HashedEntry::from_bytes("pass.json", b"{}".to_vec())];
//! let bytes = write_bundle(&entries, b"{}", b"sig", CompressionLevel::DEFAULT)?;
//!
//! let names: Vec<String> = read_bundle(&bytes)?.into_iter().map(|(n, _)| n).collect();
//! assert_eq!(names, ["pass.json", "manifest.json", "signature"]);
//! # Ok::<(), pkpass::Error>(())
//! ```

use crate::manifest::{HashedEntry, MANIFEST_NAME, SIGNATURE_NAME};
use crate::Result;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// MIME type of a finished bundle.
pub const PKPASS_MIME_TYPE: &str = "application/vnd.apple.pkpass";

/// ZIP compression level for resource entries.
///
/// `manifest.json` and `signature` are always stored.
///
/// # Examples
///
/// ```
/// use pkpass::CompressionLevel;
///
/// assert_eq!(CompressionLevel::default().level(), 6);
/// assert_eq!(CompressionLevel::new(12).level(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// Store entries without compression.
    pub const NONE: CompressionLevel = CompressionLevel(0);

    /// Deflate level 6.
    pub const DEFAULT: CompressionLevel = CompressionLevel(6);

    /// Deflate level 9.
    pub const MAX: CompressionLevel = CompressionLevel(9);

    /// Creates a compression level from 0-9.
    ///
    /// Values greater than 9 are clamped to 9.
    #[must_use]
    pub fn new(level: u32) -> Self {
        CompressionLevel(level.min(9))
    }

    /// Returns the compression level value (0-9).
    #[must_use]
    pub fn level(&self) -> u32 {
        self.0
    }

    fn file_options(&self) -> SimpleFileOptions {
        if self.0 == 0 {
            stored_options()
        } else {
            base_options()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(self.0 as i64))
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for CompressionLevel {
    fn from(level: u32) -> Self {
        CompressionLevel::new(level)
    }
}

fn base_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

fn stored_options() -> SimpleFileOptions {
    base_options().compression_method(CompressionMethod::Stored)
}

/// Write a complete bundle into memory.
///
/// # Arguments
///
/// * `entries` - Hashed resources, written in the given order
/// * `manifest` - Serialized `manifest.json`
/// * `signature` - DER signature over `manifest`
/// * `compression_level` - Applied to `entries` only
///
/// # Errors
///
/// Returns [`Error::Zip`](crate::Error::Zip) if the archive cannot be
/// written, including when two entries share a path.
pub fn write_bundle(
    entries: &[HashedEntry],
    manifest: &[u8],
    signature: &[u8],
    compression_level: CompressionLevel,
) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = compression_level.file_options();

    for entry in entries {
        zip.start_file(entry.path(), options)?;
        zip.write_all(entry.data())?;
    }

    zip.start_file(MANIFEST_NAME, stored_options())?;
    zip.write_all(manifest)?;

    zip.start_file(SIGNATURE_NAME, stored_options())?;
    zip.write_all(signature)?;

    let bytes = zip.finish()?.into_inner();
    tracing::debug!(
        entries = entries.len() + 2,
        size = bytes.len(),
        level = compression_level.level(),
        "wrote pass archive"
    );
    Ok(bytes)
}

/// Read every file entry of a bundle, in archive order.
pub fn read_bundle(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut files = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        files.push((file.name().to_string(), data));
    }

    Ok(files)
}
