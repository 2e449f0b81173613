//! Certificate and private key handling for the pure Rust signer.
//!
//! This module loads signing credentials from PEM-encoded data or PKCS#12 (.p12)
//! containers without linking OpenSSL. RSA and ECDSA keys are supported through
//! `x509-certificate`'s in-memory key pairs.
//!
//! # Supported Formats
//!
//! - **PEM**: Separate certificate and PKCS#8 private key, plain or encrypted
//!   (`ENCRYPTED PRIVATE KEY`)
//! - **PKCS#12**: Combined certificate and key in a password-protected container
//!
//! # Examples
//!
//! ```no_run
//! use pkpass::crypto::PureRustCredentials;
//!
//! let cert_pem = std::fs::read("pass-certificate.pem")?;
//! let key_pem = std::fs::read("pass-key.pem")?;
//! let wwdr = std::fs::read("AppleWWDRCAG4.pem")?;
//! let credentials = PureRustCredentials::from_pem(&cert_pem, &key_pem, Some("secret"))?
//!     .with_intermediate_pem(&wwdr)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{Error, Result};
use pkcs8::der::Decode;
use pkcs8::{EncryptedPrivateKeyInfo, SecretDocument};
use x509_certificate::{CapturedX509Certificate, InMemorySigningKeyPair, Sign, X509Certificate};

use super::{cms_pure, ManifestSigner};

/// Signing credentials containing certificate, private key, and certificate chain.
///
/// # Security
///
/// The private key contained in this struct should be treated as sensitive data.
/// Avoid logging or exposing [`PureRustCredentials`] instances.
pub struct PureRustCredentials {
    /// Pass Type ID certificate.
    pub certificate: CapturedX509Certificate,

    /// Private key corresponding to the certificate's public key.
    pub signing_key: InMemorySigningKeyPair,

    /// Intermediate CA certificates embedded in every signature.
    pub cert_chain: Vec<CapturedX509Certificate>,

    /// Apple Team ID extracted from the certificate's Organizational Unit (OU) field.
    pub team_id: Option<String>,
}

impl PureRustCredentials {
    /// Load credentials from PEM-encoded certificate and PKCS#8 private key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Certificate`] if the certificate or key is malformed,
    /// and [`Error::InvalidPassword`] if an encrypted key cannot be decrypted
    /// with `password` (or no password was given for it).
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8], password: Option<&str>) -> Result<Self> {
        let certificate = CapturedX509Certificate::from_pem(cert_pem)
            .map_err(|e| Error::Certificate(format!("Failed to parse certificate PEM: {}", e)))?;

        let key_str = std::str::from_utf8(key_pem)
            .map_err(|e| Error::Certificate(format!("Invalid UTF-8 in key PEM: {}", e)))?;

        let (label, document) = SecretDocument::from_pem(key_str)
            .map_err(|e| Error::Certificate(format!("Failed to parse private key PEM: {}", e)))?;

        let key_der = match label {
            "ENCRYPTED PRIVATE KEY" => {
                let password = password.ok_or(Error::InvalidPassword)?;
                let encrypted = EncryptedPrivateKeyInfo::from_der(document.as_bytes()).map_err(|e| {
                    Error::Certificate(format!("Malformed encrypted private key: {}", e))
                })?;
                encrypted.decrypt(password).map_err(|_| Error::InvalidPassword)?
            }
            "PRIVATE KEY" => document,
            other => {
                return Err(Error::Certificate(format!(
                    "Unsupported private key PEM label '{}', expected PKCS#8",
                    other
                )))
            }
        };

        let signing_key = Self::parse_private_key_der(key_der.as_bytes())?;
        validate_key_pair(&certificate, &signing_key)?;
        let team_id = extract_team_id(&certificate);

        Ok(Self {
            certificate,
            signing_key,
            cert_chain: Vec::new(),
            team_id,
        })
    }

    /// Load credentials from a PKCS#12 (.p12) container.
    ///
    /// Certificates after the first become the embedded chain.
    pub fn from_p12(p12_data: &[u8], password: &str) -> Result<Self> {
        let pfx = p12::PFX::parse(p12_data)
            .map_err(|e| Error::Certificate(format!("Failed to parse PKCS#12: {:?}", e)))?;

        if !pfx.verify_mac(password) {
            return Err(Error::InvalidPassword);
        }

        let keys = pfx
            .key_bags(password)
            .map_err(|e| Error::Certificate(format!("Failed to extract keys from PKCS#12: {:?}", e)))?;

        let certs = pfx
            .cert_x509_bags(password)
            .map_err(|e| Error::Certificate(format!("Failed to extract certs from PKCS#12: {:?}", e)))?;

        let (cert_der, chain_der) = certs
            .split_first()
            .ok_or_else(|| Error::Certificate("No certificate in PKCS#12".into()))?;
        let key_der = keys
            .first()
            .ok_or_else(|| Error::Certificate("No private key in PKCS#12".into()))?;

        let certificate = CapturedX509Certificate::from_der(cert_der.clone())
            .map_err(|e| Error::Certificate(format!("Failed to parse certificate DER: {}", e)))?;

        let signing_key = Self::parse_private_key_der(key_der)?;
        validate_key_pair(&certificate, &signing_key)?;

        let cert_chain: Vec<CapturedX509Certificate> = chain_der
            .iter()
            .filter_map(|der| CapturedX509Certificate::from_der(der.clone()).ok())
            .collect();

        let team_id = extract_team_id(&certificate);

        Ok(Self {
            certificate,
            signing_key,
            cert_chain,
            team_id,
        })
    }

    /// Add an intermediate CA certificate (PEM) to the embedded chain.
    pub fn with_intermediate_pem(mut self, pem: &[u8]) -> Result<Self> {
        let cert = CapturedX509Certificate::from_pem(pem).map_err(|e| {
            Error::Certificate(format!("Failed to parse intermediate certificate: {}", e))
        })?;
        self.cert_chain.push(cert);
        Ok(self)
    }

    fn parse_private_key_der(der: &[u8]) -> Result<InMemorySigningKeyPair> {
        InMemorySigningKeyPair::from_pkcs8_der(der)
            .map_err(|e| Error::Certificate(format!("Failed to parse private key: {}", e)))
    }
}

impl ManifestSigner for PureRustCredentials {
    fn sign_manifest(&self, manifest: &[u8]) -> Result<Vec<u8>> {
        cms_pure::sign_detached(manifest, &self.signing_key, &self.certificate, &self.cert_chain)
    }

    fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }
}

fn validate_key_pair(cert: &X509Certificate, key: &InMemorySigningKeyPair) -> Result<()> {
    if key.public_key_data() != cert.public_key_data() {
        return Err(Error::Certificate(
            "Private key does not match certificate public key".into(),
        ));
    }
    Ok(())
}

/// Extracts the Apple Team ID from a certificate's Organizational Unit field.
fn extract_team_id(cert: &X509Certificate) -> Option<String> {
    let subject = cert.subject_name();

    for atav in subject.iter_organizational_unit() {
        if let Ok(value) = atav.to_string() {
            return Some(value);
        }
    }
    None
}
