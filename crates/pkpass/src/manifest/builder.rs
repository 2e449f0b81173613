//! `manifest.json` generation
//!
//! Aggregates the hashes of every bundle resource into a flat JSON object
//! mapping archive path to lowercase hex SHA-1.

use super::{HashedEntry, MANIFEST_NAME, SIGNATURE_NAME};
use crate::{Error, Result};
use serde_json::{Map, Value};

/// Builder for the `manifest.json` of a pass bundle.
///
/// Keys keep insertion order, so the same entries added in the same order
/// always serialize to the same bytes.
#[derive(Debug, Default, Clone)]
pub struct ManifestBuilder {
    files: Map<String, Value>,
}

impl ManifestBuilder {
    /// Create an empty manifest builder
    pub fn new() -> Self {
        Self { files: Map::new() }
    }

    /// Add a hashed entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Manifest`] if the path was already added, or if it
    /// names the manifest or signature file.
    pub fn add(&mut self, entry: &HashedEntry) -> Result<&mut Self> {
        self.add_hash(entry.path(), entry.hash_hex())
    }

    /// Add a precomputed hex hash for `path`.
    pub fn add_hash(&mut self, path: impl Into<String>, sha1_hex: impl Into<String>) -> Result<&mut Self> {
        let path = path.into();

        if path == MANIFEST_NAME || path == SIGNATURE_NAME {
            return Err(Error::Manifest(format!(
                "{} is reserved and cannot be listed in the manifest",
                path
            )));
        }

        if self.files.contains_key(&path) {
            return Err(Error::Manifest(format!("Duplicate bundle entry: {}", path)));
        }

        self.files.insert(path, Value::String(sha1_hex.into()));
        Ok(self)
    }

    /// Add every entry, in order.
    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = &'a HashedEntry>) -> Result<&mut Self> {
        for entry in entries {
            self.add(entry)?;
        }
        Ok(self)
    }

    /// Serialize the manifest to compact JSON bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let bytes = serde_json::to_vec(&self.files)?;
        Ok(bytes)
    }

    /// Iterate over `(path, hex hash)` pairs in insertion order
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .filter_map(|(path, hash)| hash.as_str().map(|h| (path.as_str(), h)))
    }

    /// Number of entries in the manifest
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::sha1_hex;

    #[test]
    fn test_empty_manifest() {
        let builder = ManifestBuilder::new();
        assert_eq!(builder.build().unwrap(), b"{}");
        assert_eq!(builder.file_count(), 0);
    }

    #[test]
    fn test_manifest_preserves_insertion_order() {
        let mut builder = ManifestBuilder::new();
        builder
            .add(&HashedEntry::from_bytes("pass.json", b"{}".to_vec()))
            .unwrap()
            .add(&HashedEntry::from_bytes("icon.png", b"icon".to_vec()))
            .unwrap()
            .add(&HashedEntry::from_bytes("fr.lproj/pass.strings", b"s".to_vec()))
            .unwrap();

        let json = String::from_utf8(builder.build().unwrap()).unwrap();
        let expected = format!(
            r#"{{"pass.json":"{}","icon.png":"{}","fr.lproj/pass.strings":"{}"}}"#,
            sha1_hex(b"{}"),
            sha1_hex(b"icon"),
            sha1_hex(b"s")
        );
        assert_eq!(json, expected);

        let paths: Vec<_> = builder.files().map(|(p, _)| p).collect();
        assert_eq!(paths, ["pass.json", "icon.png", "fr.lproj/pass.strings"]);
    }

    #[test]
    fn test_manifest_is_deterministic() {
        let entries = vec![
            HashedEntry::from_bytes("logo.png", b"logo".to_vec()),
            HashedEntry::from_bytes("icon@2x.png", b"icon2x".to_vec()),
        ];

        let mut a = ManifestBuilder::new();
        a.extend(&entries).unwrap();
        let mut b = ManifestBuilder::new();
        b.extend(&entries).unwrap();

        assert_eq!(a.build().unwrap(), b.build().unwrap());
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut builder = ManifestBuilder::new();
        builder
            .add(&HashedEntry::from_bytes("icon.png", b"one".to_vec()))
            .unwrap();

        let err = builder
            .add(&HashedEntry::from_bytes("icon.png", b"two".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::Manifest(ref msg) if msg.contains("icon.png")));

        // First write is kept
        let (_, hash) = builder.files().next().unwrap();
        assert_eq!(hash, sha1_hex(b"one"));
    }

    #[test]
    fn test_reserved_paths_rejected() {
        let mut builder = ManifestBuilder::new();
        assert!(builder.add_hash("manifest.json", "00").is_err());
        assert!(builder.add_hash("signature", "00").is_err());
        assert_eq!(builder.file_count(), 0);
    }
}
