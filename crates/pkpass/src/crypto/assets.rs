//! Pass Type ID certificate, private key and intermediate CA loading

use crate::{Error, Result};
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::path::Path;

use super::{cms, ManifestSigner};

/// Signing assets: certificate, private key and intermediate CA certificates
///
/// Loaded once and shared read-only between builds. Signing itself never
/// touches the filesystem.
#[derive(Clone)]
pub struct SigningAssets {
    /// Pass Type ID certificate
    pub certificate: X509,
    /// Private key
    pub private_key: PKey<Private>,
    /// Intermediate CA certificates embedded next to the signer certificate
    pub cert_chain: Vec<X509>,
    /// Team ID extracted from certificate
    pub team_id: Option<String>,
}

impl SigningAssets {
    /// Load from separate certificate and private key files
    ///
    /// The password, if provided, is handled securely via SecretString and will
    /// be zeroized when no longer needed.
    pub fn from_pem(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        key_password: Option<&SecretString>,
    ) -> Result<Self> {
        let cert_data = fs::read(cert_path)?;
        let key_data = fs::read(key_path)?;
        Self::from_pem_bytes(&cert_data, &key_data, key_password)
    }

    /// Load from in-memory certificate and private key
    ///
    /// The certificate may be PEM or DER. The key may be PEM (PKCS#8 or
    /// traditional, optionally encrypted) or unencrypted DER.
    pub fn from_pem_bytes(
        cert_data: &[u8],
        key_data: &[u8],
        key_password: Option<&SecretString>,
    ) -> Result<Self> {
        let certificate = X509::from_pem(cert_data)
            .or_else(|_| X509::from_der(cert_data))
            .map_err(|e| Error::Certificate(format!("Failed to load certificate: {}", e)))?;

        let private_key = Self::load_private_key(key_data, key_password)?;

        let team_id = Self::extract_team_id(&certificate);

        // Validate that private key matches certificate
        Self::validate_key_pair(&certificate, &private_key)?;

        Ok(Self {
            certificate,
            private_key,
            cert_chain: Vec::new(),
            team_id,
        })
    }

    /// Load from PKCS#12 (.p12) file
    ///
    /// Any CA certificates stored in the container become part of the
    /// embedded chain.
    pub fn from_p12(p12_path: impl AsRef<Path>, password: Option<&SecretString>) -> Result<Self> {
        let p12_data = fs::read(p12_path)?;
        Self::from_p12_bytes(&p12_data, password)
    }

    /// Load from in-memory PKCS#12 data
    ///
    /// Defaults to an empty password if none is provided.
    pub fn from_p12_bytes(p12_data: &[u8], password: Option<&SecretString>) -> Result<Self> {
        let pkcs12 = Pkcs12::from_der(p12_data)
            .map_err(|e| Error::Certificate(format!("Invalid PKCS#12: {}", e)))?;

        let pass = password.map(|s| s.expose_secret().as_str()).unwrap_or("");
        let parsed = pkcs12.parse2(pass).map_err(|e| {
            tracing::debug!(error = %e, "PKCS#12 parse failed");
            Error::InvalidPassword
        })?;

        let certificate = parsed
            .cert
            .ok_or_else(|| Error::Certificate("No certificate in PKCS#12".into()))?;

        let private_key = parsed
            .pkey
            .ok_or_else(|| Error::Certificate("No private key in PKCS#12".into()))?;

        let cert_chain: Vec<X509> = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();

        let team_id = Self::extract_team_id(&certificate);

        Self::validate_key_pair(&certificate, &private_key)?;

        Ok(Self {
            certificate,
            private_key,
            cert_chain,
            team_id,
        })
    }

    /// Add an intermediate CA certificate (PEM or DER) to the embedded chain.
    ///
    /// Passes are rejected by Wallet unless the Apple WWDR intermediate is
    /// embedded in the signature.
    pub fn with_intermediate_pem(mut self, data: &[u8]) -> Result<Self> {
        let cert = load_intermediate(data)?;
        self.cert_chain.push(cert);
        Ok(self)
    }

    /// Add an intermediate CA certificate read from a file.
    pub fn with_intermediate_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path)?;
        self.with_intermediate_pem(&data)
    }

    /// Add an already parsed intermediate CA certificate.
    pub fn with_intermediate(mut self, cert: X509) -> Self {
        self.cert_chain.push(cert);
        self
    }

    fn load_private_key(key_data: &[u8], key_password: Option<&SecretString>) -> Result<PKey<Private>> {
        let encrypted = is_encrypted_pem(key_data);

        // Never fall through to OpenSSL's interactive password prompt
        let result = match key_password {
            Some(pass) => PKey::private_key_from_pem_passphrase(key_data, pass.expose_secret().as_bytes()),
            None if encrypted => PKey::private_key_from_pem_passphrase(key_data, b""),
            None => PKey::private_key_from_pem(key_data).or_else(|_| PKey::private_key_from_der(key_data)),
        };

        result.map_err(|e| {
            if encrypted {
                tracing::debug!(error = %e, "private key decryption failed");
                Error::InvalidPassword
            } else {
                Error::Certificate(format!("Failed to load private key: {}", e))
            }
        })
    }

    /// Extract team ID from certificate subject
    fn extract_team_id(cert: &X509) -> Option<String> {
        let subject = cert.subject_name();

        // Look for OU (Organizational Unit) which contains team ID
        for entry in subject.entries() {
            let nid = entry.object().nid();
            if nid == openssl::nid::Nid::ORGANIZATIONALUNITNAME {
                if let Ok(data) = std::str::from_utf8(entry.data().as_slice()) {
                    return Some(data.to_string());
                }
            }
        }
        None
    }

    /// Validate that the private key matches the certificate's public key
    fn validate_key_pair(cert: &X509, private_key: &PKey<Private>) -> Result<()> {
        let cert_public_key = cert.public_key().map_err(|e| {
            Error::Certificate(format!("Failed to extract public key from certificate: {}", e))
        })?;

        if !private_key.public_eq(&cert_public_key) {
            return Err(Error::Certificate(
                "Private key does not match certificate public key".into(),
            ));
        }

        Ok(())
    }
}

impl ManifestSigner for SigningAssets {
    fn sign_manifest(&self, manifest: &[u8]) -> Result<Vec<u8>> {
        cms::sign_detached(manifest, &self.certificate, &self.private_key, &self.cert_chain)
    }

    fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }
}

/// Parse an intermediate CA certificate from PEM or DER.
pub fn load_intermediate(data: &[u8]) -> Result<X509> {
    X509::from_pem(data)
        .or_else(|_| X509::from_der(data))
        .map_err(|e| Error::Certificate(format!("Failed to load intermediate certificate: {}", e)))
}

fn is_encrypted_pem(data: &[u8]) -> bool {
    data.windows(9).any(|w| w == b"ENCRYPTED")
}
