//! Detached CMS signatures over `manifest.json`
//!
//! Uses OpenSSL's CMS implementation. rust-openssl does not let callers pick
//! the signer digest, so the signer is added through [`super::cms_ffi`] with
//! SHA-1, which is what Wallet's verifier expects.

use super::cms_ffi::{
    CMS_add1_signer, CMS_final, CMS_set_detached, CMS_BINARY, CMS_NOSMIMECAP, CMS_PARTIAL,
};
use crate::{Error, Result};
use foreign_types::{ForeignType, ForeignTypeRef};
use openssl::cms::{CMSOptions, CmsContentInfo};
use openssl::error::ErrorStack;
use openssl::pkey::{PKeyRef, Private};
use openssl::stack::Stack;
use openssl::x509::{X509Ref, X509};
use std::ffi::{c_int, c_void};
use std::ptr;

/// Produce a DER-encoded detached PKCS#7 `SignedData` over `data`.
///
/// The signed attributes are content-type (`id-data`), message-digest and
/// signing-time; S/MIME capabilities are omitted. The signer certificate and
/// every certificate in `cert_chain` are embedded.
///
/// # Arguments
///
/// * `data` - The manifest bytes to sign; not embedded in the output
/// * `signing_cert` - Pass Type ID certificate
/// * `signing_key` - Private key matching `signing_cert`
/// * `cert_chain` - Intermediate CA certificates (Apple WWDR)
///
/// # Errors
///
/// Returns [`Error::Signing`] if OpenSSL rejects the key or fails to build
/// the structure.
pub fn sign_detached(
    data: &[u8],
    signing_cert: &X509Ref,
    signing_key: &PKeyRef<Private>,
    cert_chain: &[X509],
) -> Result<Vec<u8>> {
    let mut certs = Stack::new().map_err(openssl_error("Failed to allocate certificate stack"))?;
    for cert in cert_chain {
        certs
            .push(cert.clone())
            .map_err(openssl_error("Failed to add intermediate certificate"))?;
    }

    let options = CMSOptions::DETACHED | CMSOptions::BINARY | CMSOptions::NOSMIMECAP | CMSOptions::PARTIAL;
    let cms = CmsContentInfo::sign(None, None::<&PKeyRef<Private>>, Some(&certs), None, options)
        .map_err(openssl_error("Failed to create CMS structure"))?;

    let signer_flags = CMS_BINARY | CMS_NOSMIMECAP | CMS_PARTIAL;

    unsafe {
        if CMS_set_detached(cms.as_ptr(), 1) != 1 {
            return Err(last_error("Failed to mark CMS content as detached"));
        }

        let signer = CMS_add1_signer(
            cms.as_ptr(),
            signing_cert.as_ptr(),
            signing_key.as_ptr(),
            openssl_sys::EVP_sha1(),
            signer_flags,
        );
        if signer.is_null() {
            return Err(last_error("Failed to add signer"));
        }

        let bio = openssl_sys::BIO_new_mem_buf(data.as_ptr() as *const c_void, data.len() as c_int);
        if bio.is_null() {
            return Err(last_error("Failed to allocate content BIO"));
        }

        let finalized = CMS_final(cms.as_ptr(), bio, ptr::null_mut(), CMS_BINARY);
        openssl_sys::BIO_free_all(bio);

        if finalized != 1 {
            return Err(last_error("Failed to finalize CMS signature"));
        }
    }

    let der = cms
        .to_der()
        .map_err(openssl_error("Failed to encode CMS signature"))?;

    tracing::debug!(size = der.len(), chain = cert_chain.len(), "signed manifest");
    Ok(der)
}

fn openssl_error(context: &'static str) -> impl Fn(ErrorStack) -> Error {
    move |e| Error::Signing(format!("{}: {}", context, e))
}

fn last_error(context: &'static str) -> Error {
    openssl_error(context)(ErrorStack::get())
}
