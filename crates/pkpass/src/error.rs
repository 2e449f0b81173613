//! Error types for pass bundle operations.
//!
//! This module defines the [`enum@Error`] enum covering all failure cases
//! while assembling and signing a pass bundle, grouped into the coarse
//! categories reported by [`Error::kind`].
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use thiserror::Error;

/// Error type for pass bundle operations.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
/// Match on variants to handle specific failure cases, or on [`Error::kind`]
/// when only the category matters.
///
/// # Examples
///
/// ```no_run
/// use pkpass::{Error, ErrorKind, PkPass};
///
/// let result = PkPass::new().build();
/// match result {
///     Ok(bytes) => println!("Built {} bytes", bytes.len()),
///     Err(Error::Validation(msg)) => eprintln!("Fix the pass: {msg}"),
///     Err(e) if e.kind() == ErrorKind::Crypto => eprintln!("Signing problem: {e}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Occurs when reading image or localization files, certificates,
    /// or writing the finished bundle.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The pass descriptor or image set breaks a required-field rule.
    ///
    /// Raised before any resource is read, so fixing the input and
    /// retrying is always safe.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The manifest input broke the unique-path contract.
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// Signature generation failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Invalid or malformed certificate or private key.
    ///
    /// The certificate or key could not be parsed, or the private key does
    /// not belong to the certificate.
    #[error("Invalid certificate: {0}")]
    Certificate(String),

    /// Incorrect password for private key or PKCS#12 file.
    #[error("Invalid password for private key or PKCS#12")]
    InvalidPassword,

    /// Required credentials not configured.
    ///
    /// A build was attempted without first calling [`crate::PkPass::signer`].
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Invalid builder configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `pass.json` could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP archive operation failed.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Coarse error category, one per failure class of the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Descriptor, image set or manifest input is invalid.
    Validation,
    /// A declared resource could not be read or the output not written.
    Io,
    /// Certificate, key, passphrase or signature failure.
    Crypto,
    /// The archive writer failed.
    Archive,
    /// The builder was not configured correctly.
    Config,
}

impl Error {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::Manifest(_) | Error::Json(_) => ErrorKind::Validation,
            Error::Io(_) => ErrorKind::Io,
            Error::Signing(_) | Error::Certificate(_) | Error::InvalidPassword => ErrorKind::Crypto,
            Error::Zip(_) => ErrorKind::Archive,
            Error::MissingCredentials(_) | Error::Config(_) => ErrorKind::Config,
        }
    }
}
