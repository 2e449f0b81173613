//! Bundle assembly
//!
//! Validates the pass, hashes every resource in parallel, builds and signs
//! `manifest.json`, and packages the result.

use crate::archive::{write_bundle, CompressionLevel};
use crate::crypto::ManifestSigner;
use crate::manifest::{HashedEntry, ManifestBuilder, ResourceSource, PASS_JSON_NAME};
use crate::pass::{ImageSet, Localizations, PassDescriptor};
use crate::Result;
use rayon::prelude::*;

/// Turns a validated pass into signed `.pkpass` bytes.
///
/// The signer is borrowed read-only, so one loaded certificate can serve
/// any number of assemblers and threads.
pub struct BundleAssembler<'a> {
    signer: &'a dyn ManifestSigner,
    compression_level: CompressionLevel,
}

impl<'a> BundleAssembler<'a> {
    pub fn new(signer: &'a dyn ManifestSigner) -> Self {
        Self {
            signer,
            compression_level: CompressionLevel::DEFAULT,
        }
    }

    /// Compression for resource entries.
    pub fn compression_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = level;
        self
    }

    /// Resolve every resource of the pass into `(archive path, source)`.
    ///
    /// Order: `pass.json`, images, then localizations. No file is read.
    pub fn collect_entries(
        descriptor: &PassDescriptor,
        images: &ImageSet,
        localizations: &Localizations,
    ) -> Result<Vec<(String, ResourceSource)>> {
        let mut entries = Vec::with_capacity(1 + images.len());
        entries.push((
            PASS_JSON_NAME.to_string(),
            ResourceSource::Bytes(descriptor.to_json()?),
        ));
        entries.extend(images.resources().map(|(path, source)| (path, source.clone())));
        entries.extend(localizations.resources());
        Ok(entries)
    }

    /// Build the complete bundle.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`](crate::Error::Validation) before any resource is read
    /// - [`Error::Io`](crate::Error::Io) if an image or strings file cannot be read
    /// - [`Error::Signing`](crate::Error::Signing) if the signer fails
    /// - [`Error::Zip`](crate::Error::Zip) if the archive cannot be written
    ///
    /// Nothing is returned on failure.
    pub fn assemble(
        &self,
        descriptor: &PassDescriptor,
        images: &ImageSet,
        localizations: &Localizations,
    ) -> Result<Vec<u8>> {
        descriptor.validate()?;
        images.validate()?;

        if let (Some(cert_team), Some(pass_team)) =
            (self.signer.team_id(), descriptor.team_identifier.as_deref())
        {
            if cert_team != pass_team {
                tracing::warn!(
                    certificate = cert_team,
                    pass = pass_team,
                    "teamIdentifier does not match the signing certificate"
                );
            }
        }

        let sources = Self::collect_entries(descriptor, images, localizations)?;

        // Fails fast on the first unreadable resource
        let entries: Vec<HashedEntry> = sources
            .into_par_iter()
            .map(|(path, source)| HashedEntry::produce(path, source))
            .collect::<Result<_>>()?;

        let mut manifest = ManifestBuilder::new();
        manifest.extend(&entries)?;
        let manifest = manifest.build()?;

        let signature = self.signer.sign_manifest(&manifest)?;

        let bundle = write_bundle(&entries, &manifest, &signature, self.compression_level)?;

        tracing::info!(
            serial = descriptor.serial_number.as_deref().unwrap_or_default(),
            entries = entries.len(),
            size = bundle.len(),
            "assembled pass bundle"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::read_bundle;
    use crate::manifest::sha1_hex;
    use crate::pass::{Density, ImageType};
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records the manifest it was asked to sign.
    #[derive(Default)]
    struct RecordingSigner {
        calls: AtomicUsize,
    }

    impl ManifestSigner for RecordingSigner {
        fn sign_manifest(&self, manifest: &[u8]) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("signed:{}", sha1_hex(manifest)).into_bytes())
        }

        fn team_id(&self) -> Option<&str> {
            Some("MXL")
        }
    }

    fn acme() -> PassDescriptor {
        PassDescriptor::new(
            "pass.com.example.passbook",
            "MXL",
            "123456",
            "Acme flowers",
            "20% of black roses",
        )
    }

    fn images() -> ImageSet {
        let mut images = ImageSet::new();
        images.insert(ImageType::Icon, Density::X1, b"icon".as_slice());
        images.insert(ImageType::Logo, Density::X2, b"logo2x".as_slice());
        images
    }

    #[test]
    fn test_assemble_layout_and_manifest() {
        let signer = RecordingSigner::default();
        let mut loc = Localizations::new();
        loc.set_string("fr", "title", "Fleurs").unwrap();

        let bytes = BundleAssembler::new(&signer)
            .assemble(&acme(), &images(), &loc)
            .unwrap();
        let files = read_bundle(&bytes).unwrap();

        let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "pass.json",
                "icon.png",
                "logo@2x.png",
                "fr.lproj/pass.strings",
                "manifest.json",
                "signature"
            ]
        );

        let manifest: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&files[4].1).unwrap();
        assert_eq!(manifest.len(), files.len() - 2);
        for (name, data) in &files[..4] {
            assert_eq!(manifest[name.as_str()], sha1_hex(data));
        }

        assert_eq!(files[5].1, format!("signed:{}", sha1_hex(&files[4].1)).into_bytes());
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validation_happens_before_io_and_signing() {
        let signer = RecordingSigner::default();
        let mut pass = acme();
        pass.serial_number = None;

        let mut images = ImageSet::new();
        images.insert(ImageType::Icon, Density::X1, std::path::PathBuf::from("/nonexistent/icon.png"));
        images.insert(ImageType::Logo, Density::X1, std::path::PathBuf::from("/nonexistent/logo.png"));

        let err = BundleAssembler::new(&signer)
            .assemble(&pass, &images, &Localizations::new())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("serialNumber")));
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unreadable_image_aborts_before_signing() {
        let signer = RecordingSigner::default();
        let mut images = images();
        images.insert(ImageType::Strip, Density::X1, std::path::PathBuf::from("/nonexistent/strip.png"));

        let err = BundleAssembler::new(&signer)
            .assemble(&acme(), &images, &Localizations::new())
            .unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.to_string().contains("strip.png")));
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_signer_error_propagates() {
        struct FailingSigner;
        impl ManifestSigner for FailingSigner {
            fn sign_manifest(&self, _: &[u8]) -> Result<Vec<u8>> {
                Err(Error::Signing("boom".into()))
            }
        }

        let err = BundleAssembler::new(&FailingSigner)
            .assemble(&acme(), &images(), &Localizations::new())
            .unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }

    #[test]
    fn test_collect_entries_order() {
        let mut loc = Localizations::new();
        loc.insert_file("en", b"strings".as_slice()).unwrap();

        let entries = BundleAssembler::collect_entries(&acme(), &images(), &loc).unwrap();
        let paths: Vec<&str> = entries.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, ["pass.json", "icon.png", "logo@2x.png", "en.lproj/pass.strings"]);
    }
}
