// Copyright (C) Microsoft Corporation. All rights reserved.

//! Symmetric key blob encoding.
//!
//! Two layouts are understood, both little-endian:
//!
//! - `KeyDataBlob`: `{magic, version, key_len}` header followed by the key
//! - `OpaqueKeyBlob`: `key_len` followed by the key

use crate::error::*;

/// Blob type names.
pub const BCRYPT_KEY_DATA_BLOB: &str = "KeyDataBlob";
pub const BCRYPT_OPAQUE_KEY_BLOB: &str = "OpaqueKeyBlob";

/// `KDBM`
pub const BCRYPT_KEY_DATA_BLOB_MAGIC: u32 = 0x4d42_444b;
pub const BCRYPT_KEY_DATA_BLOB_VERSION1: u32 = 1;

const KEY_DATA_HEADER_LEN: usize = 3 * size_of::<u32>();
const OPAQUE_HEADER_LEN: usize = size_of::<u32>();

/// Supported key blob layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBlobType {
    /// Versioned header with magic.
    KeyData,
    /// Bare length prefix.
    Opaque,
}

impl KeyBlobType {
    /// Looks up a blob type by name. Unknown names are not implemented.
    pub fn from_name(name: &str) -> BcryptResult<Self> {
        match name {
            BCRYPT_KEY_DATA_BLOB => Ok(KeyBlobType::KeyData),
            BCRYPT_OPAQUE_KEY_BLOB => Ok(KeyBlobType::Opaque),
            _ => {
                tracing::warn!(name, "Unsupported key blob type");
                Err(BcryptError::NotImplemented)
            }
        }
    }

    fn header_len(&self) -> usize {
        match self {
            KeyBlobType::KeyData => KEY_DATA_HEADER_LEN,
            KeyBlobType::Opaque => OPAQUE_HEADER_LEN,
        }
    }
}

/// Serializes `secret` as a `blob_type` blob.
///
/// `None` for `output` reports the blob size.
pub(crate) fn export(
    blob_type: KeyBlobType,
    secret: &[u8],
    output: Option<&mut [u8]>,
) -> BcryptResult<usize> {
    let header_len = blob_type.header_len();
    let required = header_len + secret.len();
    let Some(output) = output else {
        return Ok(required);
    };
    if output.len() < required {
        Err(BcryptError::BufferTooSmall { required })?;
    }

    let key_len = u32::try_from(secret.len()).map_err(|_| BcryptError::InvalidParameter)?;
    let header = match blob_type {
        KeyBlobType::KeyData => vec![
            BCRYPT_KEY_DATA_BLOB_MAGIC,
            BCRYPT_KEY_DATA_BLOB_VERSION1,
            key_len,
        ],
        KeyBlobType::Opaque => vec![key_len],
    };
    for (dst, word) in output[..header_len].chunks_exact_mut(4).zip(header) {
        dst.copy_from_slice(&word.to_le_bytes());
    }
    output[header_len..required].copy_from_slice(secret);
    Ok(required)
}

fn read_u32(blob: &[u8], index: usize) -> BcryptResult<u32> {
    blob.get(index * 4..index * 4 + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(BcryptError::InvalidParameter)
}

/// Validates `blob` and returns the key bytes it carries.
pub(crate) fn import(blob_type: KeyBlobType, blob: &[u8]) -> BcryptResult<&[u8]> {
    let key_len = match blob_type {
        KeyBlobType::KeyData => {
            let magic = read_u32(blob, 0)?;
            let version = read_u32(blob, 1)?;
            if magic != BCRYPT_KEY_DATA_BLOB_MAGIC || version != BCRYPT_KEY_DATA_BLOB_VERSION1 {
                tracing::error!(magic, version, "Bad key data blob header");
                Err(BcryptError::InvalidParameter)?;
            }
            read_u32(blob, 2)?
        }
        KeyBlobType::Opaque => read_u32(blob, 0)?,
    };

    let start = blob_type.header_len();
    let end = start
        .checked_add(key_len as usize)
        .filter(|end| *end <= blob.len())
        .ok_or_else(|| {
            tracing::error!(key_len, blob_len = blob.len(), "Key blob is truncated");
            BcryptError::InvalidParameter
        })?;
    Ok(&blob[start..end])
}
