//! Raw FFI bindings for OpenSSL CMS functions not exposed by rust-openssl

use openssl_sys::*;
use std::ffi::{c_int, c_uint};

// CMS_SignerInfo is opaque - we only need pointer
#[repr(C)]
pub struct CMS_SignerInfo {
    _private: [u8; 0],
}

pub const CMS_PARTIAL: u32 = 0x4000;
pub const CMS_DETACHED: u32 = 0x40;
pub const CMS_BINARY: u32 = 0x80;
pub const CMS_NOSMIMECAP: u32 = 0x200;

extern "C" {
    pub fn CMS_add1_signer(
        cms: *mut CMS_ContentInfo,
        signer: *mut X509,
        pk: *mut EVP_PKEY,
        md: *const EVP_MD,
        flags: c_uint,
    ) -> *mut CMS_SignerInfo;

    pub fn CMS_final(
        cms: *mut CMS_ContentInfo,
        data: *mut BIO,
        dcont: *mut BIO,
        flags: c_uint,
    ) -> c_int;

    pub fn CMS_set_detached(cms: *mut CMS_ContentInfo, detached: c_int) -> c_int;
}
