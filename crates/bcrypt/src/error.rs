// Copyright (C) Microsoft Corporation. All rights reserved.

//! Error type shared by every engine operation.
//!
//! Each variant is one failure *kind*. The numeric NTSTATUS value a Windows
//! caller would observe is available through [`BcryptError::status`].

use std::fmt::Debug;

use thiserror::Error;

/// `STATUS_SUCCESS`
pub const STATUS_SUCCESS: u32 = 0x0000_0000;
/// `STATUS_UNSUCCESSFUL`
pub const STATUS_UNSUCCESSFUL: u32 = 0xC000_0001;
/// `STATUS_NOT_IMPLEMENTED`
pub const STATUS_NOT_IMPLEMENTED: u32 = 0xC000_0002;
/// `STATUS_INVALID_HANDLE`
pub const STATUS_INVALID_HANDLE: u32 = 0xC000_0008;
/// `STATUS_INVALID_PARAMETER`
pub const STATUS_INVALID_PARAMETER: u32 = 0xC000_000D;
/// `STATUS_NO_MEMORY`
pub const STATUS_NO_MEMORY: u32 = 0xC000_0017;
/// `STATUS_BUFFER_TOO_SMALL`
pub const STATUS_BUFFER_TOO_SMALL: u32 = 0xC000_0023;
/// `STATUS_NOT_SUPPORTED`
pub const STATUS_NOT_SUPPORTED: u32 = 0xC000_00BB;
/// `STATUS_INTERNAL_ERROR`
pub const STATUS_INTERNAL_ERROR: u32 = 0xC000_00E5;
/// `STATUS_INVALID_DEVICE_STATE`
pub const STATUS_INVALID_DEVICE_STATE: u32 = 0xC000_0184;
/// `STATUS_INVALID_BUFFER_SIZE`
pub const STATUS_INVALID_BUFFER_SIZE: u32 = 0xC000_0206;
/// `STATUS_AUTH_TAG_MISMATCH`
pub const STATUS_AUTH_TAG_MISMATCH: u32 = 0xC000_A002;

/// Failure kinds reported by the engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcryptError {
    /// The handle is unknown, already released, or of the wrong variant.
    #[error("invalid handle")]
    InvalidHandle,

    /// A required parameter is missing or inconsistent.
    #[error("invalid parameter")]
    InvalidParameter,

    /// The request is recognized but not implemented by this engine.
    #[error("not implemented")]
    NotImplemented,

    /// The combination is intrinsically inapplicable.
    #[error("not supported")]
    NotSupported,

    /// The output buffer is too small; `required` bytes are needed.
    #[error("buffer too small, {required} bytes required")]
    BufferTooSmall {
        /// Number of bytes the caller must provide.
        required: usize,
    },

    /// Input is not aligned to the cipher block size.
    #[error("invalid buffer size")]
    InvalidBufferSize,

    /// GCM authentication tag verification failed.
    #[error("authentication tag mismatch")]
    AuthTagMismatch,

    /// Decrypted PKCS#7 padding is malformed.
    #[error("invalid padding")]
    InvalidPadding,

    /// The object cannot accept the operation in its current state.
    #[error("invalid object state")]
    InvalidState,

    /// Memory for an owned copy could not be reserved.
    #[error("out of memory")]
    OutOfMemory,

    /// The native cipher backend failed or is unavailable.
    #[error("internal error")]
    InternalError,
}

impl BcryptError {
    /// Returns the NTSTATUS code a Windows caller observes for this error.
    pub fn status(&self) -> u32 {
        match self {
            BcryptError::InvalidHandle => STATUS_INVALID_HANDLE,
            BcryptError::InvalidParameter => STATUS_INVALID_PARAMETER,
            BcryptError::NotImplemented => STATUS_NOT_IMPLEMENTED,
            BcryptError::NotSupported => STATUS_NOT_SUPPORTED,
            BcryptError::BufferTooSmall { .. } => STATUS_BUFFER_TOO_SMALL,
            BcryptError::InvalidBufferSize => STATUS_INVALID_BUFFER_SIZE,
            BcryptError::AuthTagMismatch => STATUS_AUTH_TAG_MISMATCH,
            // legacy callers saw a generic failure for bad padding
            BcryptError::InvalidPadding => STATUS_UNSUCCESSFUL,
            BcryptError::InvalidState => STATUS_INVALID_DEVICE_STATE,
            BcryptError::OutOfMemory => STATUS_NO_MEMORY,
            BcryptError::InternalError => STATUS_INTERNAL_ERROR,
        }
    }
}

/// Convenience alias used across the crate.
pub type BcryptResult<T> = Result<T, BcryptError>;

/// Converts a `BcryptResult` into the raw status a Windows caller observes.
pub fn to_status<T>(result: &BcryptResult<T>) -> u32 {
    match result {
        Ok(_) => STATUS_SUCCESS,
        Err(err) => err.status(),
    }
}

pub(crate) trait BcryptErrorMapper<T, E> {
    fn map_bcrypt_err(self, err: BcryptError) -> BcryptResult<T>;
}

impl<T, E: Debug> BcryptErrorMapper<T, E> for Result<T, E> {
    fn map_bcrypt_err(self, bcrypt_err: BcryptError) -> BcryptResult<T> {
        match self {
            Ok(t) => Ok(t),
            Err(err) => {
                tracing::error!("Mapping error {:?} to bcrypt error: {:?}", err, bcrypt_err);
                Err(bcrypt_err)
            }
        }
    }
}

/// Copies `bytes` into a freshly reserved vector, reporting allocation failure.
pub(crate) fn try_copy(bytes: &[u8]) -> BcryptResult<Vec<u8>> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(bytes.len())
        .map_err(|_| BcryptError::OutOfMemory)?;
    copy.extend_from_slice(bytes);
    Ok(copy)
}
