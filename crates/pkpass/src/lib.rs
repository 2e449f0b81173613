//! Build and sign Apple Wallet pass bundles.
//!
//! A `.pkpass` file is a ZIP archive holding `pass.json`, images,
//! localized `pass.strings` files, a `manifest.json` with the SHA-1 of every
//! other entry, and a detached PKCS#7 `signature` over the manifest.
//!
//! Start with [`PkPass`], or drive [`BundleAssembler`] directly with any
//! [`ManifestSigner`].

pub mod archive;
pub mod assembler;
pub mod builder;
pub mod crypto;
pub mod error;
pub mod manifest;
pub mod pass;

pub use archive::{CompressionLevel, PKPASS_MIME_TYPE};
pub use assembler::BundleAssembler;
pub use builder::PkPass;
#[cfg(feature = "pure-rust")]
pub use crypto::PureRustCredentials;
#[cfg(feature = "openssl-backend")]
pub use crypto::SigningAssets;
pub use crypto::ManifestSigner;
pub use error::{Error, ErrorKind};
pub use manifest::{HashedEntry, ManifestBuilder, ResourceSource};
pub use pass::{Density, ImageSet, ImageType, Localizations, PassDescriptor};

pub type Result<T> = std::result::Result<T, Error>;
