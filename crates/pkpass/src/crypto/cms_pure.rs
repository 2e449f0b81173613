//! Detached CMS signatures without OpenSSL
//!
//! Uses cryptographic-message-syntax crate for CMS signature generation.

use crate::{Error, Result};
use cryptographic_message_syntax::{SignedDataBuilder, SignerBuilder};
use x509_certificate::{CapturedX509Certificate, DigestAlgorithm, KeyInfoSigner};

/// Generate a detached CMS signature over `data`.
///
/// The builder adds the content-type, message-digest and signing-time
/// signed attributes. The message digest is SHA-1.
///
/// # Arguments
///
/// * `data` - The manifest bytes to sign
/// * `signing_key` - The private key implementing KeyInfoSigner trait
/// * `signing_cert` - The Pass Type ID certificate
/// * `cert_chain` - Certificate chain (intermediate CAs)
pub fn sign_detached<K: KeyInfoSigner>(
    data: &[u8],
    signing_key: &K,
    signing_cert: &CapturedX509Certificate,
    cert_chain: &[CapturedX509Certificate],
) -> Result<Vec<u8>> {
    let signer = SignerBuilder::new(signing_key, signing_cert.clone())
        .message_digest_algorithm(DigestAlgorithm::Sha1);

    let mut builder = SignedDataBuilder::default()
        .content_external(data.to_vec())
        .signer(signer);

    for cert in cert_chain {
        builder = builder.certificate(cert.clone());
    }

    let der = builder
        .build_der()
        .map_err(|e| Error::Signing(format!("Failed to build CMS signature: {}", e)))?;

    tracing::debug!(size = der.len(), chain = cert_chain.len(), "signed manifest");
    Ok(der)
}

#[cfg(all(test, feature = "openssl-backend"))]
mod tests {
    use super::*;
    use crate::crypto::assets::test_support::*;
    use crate::crypto::{ManifestSigner, PureRustCredentials};
    use openssl::cms::{CMSOptions, CmsContentInfo};

    #[test]
    fn test_pure_signature_verifies_with_openssl() {
        let key = generate_test_rsa_key();
        let cert = generate_test_cert("Pass Type ID: pass.test", None, &key, None);
        let creds = PureRustCredentials::from_pem(
            &cert.to_pem().unwrap(),
            &key.private_key_to_pem_pkcs8().unwrap(),
            None,
        )
        .unwrap();

        let manifest = br#"{"pass.json":"da39a3ee5e6b4b0d3255bfef95601890afd80709"}"#;
        let der = creds.sign_manifest(manifest).unwrap();

        let mut parsed = CmsContentInfo::from_der(&der).unwrap();
        parsed
            .verify(
                None,
                None,
                Some(manifest),
                None,
                CMSOptions::BINARY | CMSOptions::NO_SIGNER_CERT_VERIFY,
            )
            .unwrap();
    }
}
