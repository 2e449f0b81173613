//! PkPass builder API
//!
//! Collects the pass content and signing configuration, then builds the
//! signed bundle in memory or writes it to disk.

use crate::archive::CompressionLevel;
use crate::assembler::BundleAssembler;
use crate::crypto::ManifestSigner;
use crate::manifest::ResourceSource;
use crate::pass::{Density, ImageSet, ImageType, Localizations, PassDescriptor};
use crate::{Error, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "openssl-backend")]
use crate::crypto::SigningAssets;
#[cfg(feature = "openssl-backend")]
use secrecy::SecretString;
#[cfg(feature = "openssl-backend")]
use std::path::PathBuf;

/// Wallet pass builder.
///
/// Credentials come either from an already loaded signer
/// ([`signer`](Self::signer), [`shared_signer`](Self::shared_signer)) or,
/// with the `openssl-backend` feature, from certificate paths that are read
/// on every build.
///
/// # Example
///
/// ```no_run
/// use pkpass::pass::{Density, ImageType, PassDescriptor};
/// use pkpass::PkPass;
///
/// let pass = PassDescriptor::new(
///     "pass.com.example.passbook",
///     "MXL",
///     "123456",
///     "Acme flowers",
///     "20% of black roses",
/// );
///
/// PkPass::new()
///     .descriptor(pass)
///     .image(ImageType::Icon, Density::X1, std::path::PathBuf::from("model/icon.png"))
///     .image(ImageType::Logo, Density::X2, std::path::PathBuf::from("model/logo@2x.png"))
///     .pkcs12("pass.p12")
///     .password("secret")
///     .intermediate("AppleWWDRCAG4.pem")
///     .write_to("flowers.pkpass")?;
/// # Ok::<(), pkpass::Error>(())
/// ```
#[derive(Clone)]
pub struct PkPass {
    descriptor: PassDescriptor,
    images: ImageSet,
    localizations: Localizations,
    signer: Option<Arc<dyn ManifestSigner>>,
    #[cfg(feature = "openssl-backend")]
    certificate: Option<PathBuf>,
    #[cfg(feature = "openssl-backend")]
    private_key: Option<PathBuf>,
    #[cfg(feature = "openssl-backend")]
    pkcs12: Option<PathBuf>,
    #[cfg(feature = "openssl-backend")]
    password: Option<SecretString>,
    #[cfg(feature = "openssl-backend")]
    intermediates: Vec<PathBuf>,
    compression_level: CompressionLevel,
}

impl PkPass {
    /// Create a new PkPass builder.
    pub fn new() -> Self {
        Self {
            descriptor: PassDescriptor::default(),
            images: ImageSet::new(),
            localizations: Localizations::new(),
            signer: None,
            #[cfg(feature = "openssl-backend")]
            certificate: None,
            #[cfg(feature = "openssl-backend")]
            private_key: None,
            #[cfg(feature = "openssl-backend")]
            pkcs12: None,
            #[cfg(feature = "openssl-backend")]
            password: None,
            #[cfg(feature = "openssl-backend")]
            intermediates: Vec::new(),
            compression_level: CompressionLevel::DEFAULT,
        }
    }

    /// Set the `pass.json` descriptor.
    pub fn descriptor(mut self, descriptor: PassDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Replace all images.
    pub fn images(mut self, images: ImageSet) -> Self {
        self.images = images;
        self
    }

    /// Add or replace one unlocalized image.
    pub fn image(mut self, image_type: ImageType, density: Density, source: impl Into<ResourceSource>) -> Self {
        self.images.insert(image_type, density, source);
        self
    }

    /// Replace all localizations.
    pub fn localizations(mut self, localizations: Localizations) -> Self {
        self.localizations = localizations;
        self
    }

    /// Sign with an already loaded signer.
    pub fn signer(mut self, signer: impl ManifestSigner + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Sign with a signer shared across builders and threads.
    pub fn shared_signer(mut self, signer: Arc<dyn ManifestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Set certificate file path (PEM or DER format).
    ///
    /// Use together with `private_key()`, or use `pkcs12()` instead.
    #[cfg(feature = "openssl-backend")]
    pub fn certificate(mut self, path: impl AsRef<Path>) -> Self {
        self.certificate = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set private key file path (PEM or DER format).
    #[cfg(feature = "openssl-backend")]
    pub fn private_key(mut self, path: impl AsRef<Path>) -> Self {
        self.private_key = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set PKCS#12 file path (.p12 format).
    ///
    /// PKCS#12 files contain both the certificate and private key.
    /// Use `password()` to set the decryption password.
    #[cfg(feature = "openssl-backend")]
    pub fn pkcs12(mut self, path: impl AsRef<Path>) -> Self {
        self.pkcs12 = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set password for private key or PKCS#12 file.
    ///
    /// The password is stored securely and will be zeroized when dropped.
    #[cfg(feature = "openssl-backend")]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Add an intermediate CA certificate file (the Apple WWDR certificate).
    #[cfg(feature = "openssl-backend")]
    pub fn intermediate(mut self, path: impl AsRef<Path>) -> Self {
        self.intermediates.push(path.as_ref().to_path_buf());
        self
    }

    /// Set ZIP compression level for resource entries (0-9).
    ///
    /// 0 = stored, 9 = maximum compression. Default is 6.
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = CompressionLevel::new(level);
        self
    }

    /// Validate the builder configuration and pass content.
    ///
    /// Returns an error if:
    /// - The descriptor or image set is invalid
    /// - No credentials are configured
    /// - A signer and credential paths are both configured
    /// - Both PKCS#12 and PEM credentials are specified
    /// - Only one of certificate/private_key is specified
    pub fn validate(&self) -> Result<()> {
        self.descriptor.validate()?;
        self.images.validate()?;
        self.validate_credentials()
    }

    #[cfg(feature = "openssl-backend")]
    fn validate_credentials(&self) -> Result<()> {
        let has_p12 = self.pkcs12.is_some();
        let has_pem = self.certificate.is_some() || self.private_key.is_some();

        if self.signer.is_some() {
            if has_p12 || has_pem {
                return Err(Error::Config(
                    "Cannot specify both a signer and certificate files".into(),
                ));
            }
            return Ok(());
        }

        if has_p12 && has_pem {
            return Err(Error::Config(
                "Cannot specify both PKCS#12 and PEM certificate/key".into(),
            ));
        }

        if !has_p12 && !has_pem {
            return Err(Error::MissingCredentials(
                "Must specify a signer, PKCS#12 or certificate/key pair".into(),
            ));
        }

        if has_pem && (self.certificate.is_none() || self.private_key.is_none()) {
            return Err(Error::MissingCredentials(
                "Both certificate and private key must be specified".into(),
            ));
        }

        Ok(())
    }

    #[cfg(not(feature = "openssl-backend"))]
    fn validate_credentials(&self) -> Result<()> {
        if self.signer.is_none() {
            return Err(Error::MissingCredentials("Must specify a signer".into()));
        }
        Ok(())
    }

    /// Resolve the signer, loading certificate files if configured.
    fn load_signer(&self) -> Result<Arc<dyn ManifestSigner>> {
        if let Some(ref signer) = self.signer {
            return Ok(Arc::clone(signer));
        }

        #[cfg(feature = "openssl-backend")]
        {
            Ok(Arc::new(self.load_assets()?))
        }

        #[cfg(not(feature = "openssl-backend"))]
        {
            Err(Error::MissingCredentials("Must specify a signer".into()))
        }
    }

    /// Load signing assets from configured paths.
    ///
    /// Uses PKCS#12 if configured, otherwise uses separate certificate and private key.
    #[cfg(feature = "openssl-backend")]
    fn load_assets(&self) -> Result<SigningAssets> {
        let mut assets = if let Some(ref p12) = self.pkcs12 {
            SigningAssets::from_p12(p12, self.password.as_ref())?
        } else {
            let cert = self
                .certificate
                .as_ref()
                .ok_or_else(|| Error::MissingCredentials("No certificate configured".into()))?;
            let key = self
                .private_key
                .as_ref()
                .ok_or_else(|| Error::MissingCredentials("No private key configured".into()))?;
            SigningAssets::from_pem(cert, key, self.password.as_ref())?
        };

        for intermediate in &self.intermediates {
            assets = assets.with_intermediate_file(intermediate)?;
        }

        if assets.cert_chain.is_empty() {
            tracing::warn!("no intermediate certificate configured; Wallet will reject the pass");
        }

        Ok(assets)
    }

    /// Build the signed bundle in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration or pass content is invalid
    /// - Signing credentials cannot be loaded
    /// - A resource cannot be read
    /// - Signing or archiving fails
    pub fn build(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let signer = self.load_signer()?;

        BundleAssembler::new(signer.as_ref())
            .compression_level(self.compression_level)
            .assemble(&self.descriptor, &self.images, &self.localizations)
    }

    /// Build the bundle and write it to `output`.
    ///
    /// The file is written next to `output` under a temporary name and
    /// renamed into place, so `output` never holds a partial bundle.
    pub fn write_to(&self, output: impl AsRef<Path>) -> Result<()> {
        let output = output.as_ref();
        let bundle = self.build()?;

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, &bundle)?;
        tmp.persist(output).map_err(|e| Error::Io(e.error))?;

        tracing::info!(path = %output.display(), size = bundle.len(), "wrote pass");
        Ok(())
    }
}

impl Default for PkPass {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSigner;

    impl ManifestSigner for StaticSigner {
        fn sign_manifest(&self, _manifest: &[u8]) -> Result<Vec<u8>> {
            Ok(b"signature".to_vec())
        }
    }

    fn complete() -> PkPass {
        PkPass::new()
            .descriptor(PassDescriptor::new("pass.test", "MXL", "1", "Acme", "Pass"))
            .image(ImageType::Icon, Density::X1, b"icon".as_slice())
            .image(ImageType::Logo, Density::X1, b"logo".as_slice())
    }

    #[test]
    fn test_pkpass_builder_default() {
        let pkpass = PkPass::default();
        assert!(pkpass.signer.is_none());
        assert!(pkpass.images.is_empty());
        assert_eq!(pkpass.compression_level, CompressionLevel::DEFAULT);
    }

    #[test]
    fn test_build_requires_valid_descriptor() {
        let result = PkPass::new().signer(StaticSigner).build();
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_build_requires_credentials() {
        let result = complete().build();
        match result {
            Err(Error::MissingCredentials(msg)) => assert!(msg.contains("Must specify")),
            other => panic!("expected missing credentials, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_build_with_signer() {
        let bytes = complete().signer(StaticSigner).build().unwrap();
        let files = crate::archive::read_bundle(&bytes).unwrap();
        assert_eq!(files.last().unwrap().1, b"signature");
    }

    #[test]
    fn test_shared_signer_across_builders() {
        let signer: Arc<dyn ManifestSigner> = Arc::new(StaticSigner);
        let a = complete().shared_signer(Arc::clone(&signer)).build().unwrap();
        let b = complete().shared_signer(signer).build().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("pass.pkpass");

        complete().signer(StaticSigner).write_to(&output).unwrap();

        let written = fs::read(&output).unwrap();
        assert!(written.starts_with(b"PK"));
        assert_eq!(fs::read_dir(output.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_to_leaves_nothing_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("pass.pkpass");

        assert!(complete().write_to(&output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_compression_level_builder() {
        let pkpass = PkPass::new().compression_level(12);
        assert_eq!(pkpass.compression_level.level(), 9);
    }

    #[cfg(feature = "openssl-backend")]
    mod with_paths {
        use super::*;
        use secrecy::ExposeSecret;

        #[test]
        fn test_pkpass_builder_chain() {
            let pkpass = PkPass::new()
                .certificate("/path/to/cert.pem")
                .private_key("/path/to/key.pem")
                .password("secret")
                .intermediate("/path/to/wwdr.pem");

            assert_eq!(pkpass.certificate, Some(PathBuf::from("/path/to/cert.pem")));
            assert_eq!(pkpass.private_key, Some(PathBuf::from("/path/to/key.pem")));
            assert_eq!(pkpass.password.as_ref().unwrap().expose_secret(), "secret");
            assert_eq!(pkpass.intermediates, [PathBuf::from("/path/to/wwdr.pem")]);
        }

        #[test]
        fn test_validate_both_p12_and_pem() {
            let result = complete()
                .pkcs12("/path/to/cert.p12")
                .certificate("/path/to/cert.pem")
                .validate();
            assert!(matches!(result, Err(Error::Config(ref msg)) if msg.contains("Cannot specify both")));
        }

        #[test]
        fn test_validate_signer_and_paths() {
            let result = complete()
                .signer(StaticSigner)
                .pkcs12("/path/to/cert.p12")
                .validate();
            assert!(matches!(result, Err(Error::Config(_))));
        }

        #[test]
        fn test_validate_missing_private_key() {
            let result = complete().certificate("/path/to/cert.pem").validate();
            assert!(matches!(
                result,
                Err(Error::MissingCredentials(ref msg)) if msg.contains("Both certificate and private key")
            ));
        }

        #[test]
        fn test_missing_certificate_file_is_io_error() {
            let result = complete()
                .certificate("/nonexistent/cert.pem")
                .private_key("/nonexistent/key.pem")
                .build();
            assert!(matches!(result, Err(Error::Io(_))));
        }
    }
}
