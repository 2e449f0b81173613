//! Manifest generation for pass bundles.
//!
//! This module provides functionality to:
//! - Read and hash bundle resources ([`HashedEntry`])
//! - Aggregate the hashes into `manifest.json` ([`ManifestBuilder`])
//!
//! # Overview
//!
//! Every file in a `.pkpass` bundle except `manifest.json` and `signature`
//! is listed in the manifest with the lowercase hex SHA-1 of its exact bytes.
//! The manifest is the object that gets signed.
//!
//! # Examples
//!
//! ```
//! use pkpass::manifest::{HashedEntry, ManifestBuilder};
//!
//! let entry = HashedEntry::from_bytes("pass.json", br#"{"formatVersion":1}"#.to_vec());
//! let mut builder = ManifestBuilder::new();
//! builder.add(&entry)?;
//! let manifest = builder.build()?;
//! assert!(manifest.starts_with(b"{\"pass.json\":\""));
//! # Ok::<(), pkpass::Error>(())
//! ```

pub mod builder;
pub mod entry;

pub use builder::ManifestBuilder;
pub use entry::{sha1_hex, HashedEntry, ResourceSource};

/// Archive path of the manifest.
pub const MANIFEST_NAME: &str = "manifest.json";

/// Archive path of the detached signature.
pub const SIGNATURE_NAME: &str = "signature";

/// Archive path of the pass descriptor.
pub const PASS_JSON_NAME: &str = "pass.json";
