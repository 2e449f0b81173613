//! Manifest signing.
//!
//! Two backends produce the same detached PKCS#7 signature:
//!
//! | Feature | Credentials | Implementation |
//! |---------|-------------|----------------|
//! | `openssl-backend` (default) | [`SigningAssets`] | OpenSSL CMS |
//! | `pure-rust` | [`PureRustCredentials`] | `cryptographic-message-syntax` |
//!
//! Both implement [`ManifestSigner`], which is all the bundle assembler needs.

#[cfg(feature = "openssl-backend")]
pub mod assets;
#[cfg(feature = "pure-rust")]
pub mod cert;
#[cfg(feature = "openssl-backend")]
pub mod cms;
#[cfg(feature = "openssl-backend")]
pub mod cms_ffi;
#[cfg(feature = "pure-rust")]
pub mod cms_pure;

#[cfg(feature = "openssl-backend")]
pub use assets::SigningAssets;
#[cfg(feature = "pure-rust")]
pub use cert::PureRustCredentials;

use crate::Result;

/// Produces the `signature` entry of a pass bundle.
///
/// Implementations hold an already parsed certificate, private key and
/// intermediate chain, and never touch the filesystem while signing.
pub trait ManifestSigner: Send + Sync {
    /// Sign `manifest` (the exact `manifest.json` bytes), returning the raw
    /// DER of a detached PKCS#7 `SignedData` with a SHA-1 digest.
    fn sign_manifest(&self, manifest: &[u8]) -> Result<Vec<u8>>;

    /// Team ID from the signing certificate, if known.
    fn team_id(&self) -> Option<&str> {
        None
    }
}

impl<T: ManifestSigner + ?Sized> ManifestSigner for std::sync::Arc<T> {
    fn sign_manifest(&self, manifest: &[u8]) -> Result<Vec<u8>> {
        (**self).sign_manifest(manifest)
    }

    fn team_id(&self) -> Option<&str> {
        (**self).team_id()
    }
}
