// Copyright (C) Microsoft Corporation. All rights reserved.

//! Property get/set dispatch.
//!
//! Values are returned in the layout a Windows caller expects: integers as
//! little-endian `u32`, strings as NUL-terminated UTF-16LE and length
//! ranges as three consecutive `u32` values.

use crate::algorithm::*;
use crate::error::*;

/// Property names.
pub const BCRYPT_OBJECT_LENGTH: &str = "ObjectLength";
pub const BCRYPT_HASH_LENGTH: &str = "HashDigestLength";
pub const BCRYPT_ALGORITHM_NAME: &str = "AlgorithmName";
pub const BCRYPT_BLOCK_LENGTH: &str = "BlockLength";
pub const BCRYPT_CHAINING_MODE: &str = "ChainingMode";
pub const BCRYPT_AUTH_TAG_LENGTH: &str = "AuthTagLength";
pub const BCRYPT_HASH_BLOCK_LENGTH: &str = "HashBlockLength";
pub const BCRYPT_KEY_LENGTHS: &str = "KeyLengths";
pub const BCRYPT_KEY_LENGTH: &str = "KeyLength";

/// AES block length in bytes.
pub(crate) const AES_BLOCK_LEN: u32 = 16;

/// Supported GCM tag lengths in bytes.
pub const GCM_TAG_LENGTHS: LengthRange = LengthRange {
    min: 12,
    max: 16,
    increment: 1,
};

/// Supported AES key lengths in bits.
pub const AES_KEY_LENGTHS: LengthRange = LengthRange {
    min: 128,
    max: 256,
    increment: 64,
};

/// A `{min, max, increment}` length triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRange {
    /// Smallest supported length.
    pub min: u32,
    /// Largest supported length.
    pub max: u32,
    /// Step between supported lengths.
    pub increment: u32,
}

impl LengthRange {
    /// Whether `len` is one of the lengths in the range.
    pub fn contains(&self, len: u32) -> bool {
        len >= self.min
            && len <= self.max
            && self.increment != 0
            && (len - self.min) % self.increment == 0
    }

    /// Decodes the 12-byte wire layout.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let word = |i: usize| {
            bytes
                .get(i * 4..i * 4 + 4)
                .and_then(|b| b.try_into().ok())
                .map(u32::from_le_bytes)
        };
        Some(Self {
            min: word(0)?,
            max: word(1)?,
            increment: word(2)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyValue {
    U32(u32),
    Str(&'static str),
    Lengths(LengthRange),
}

impl PropertyValue {
    fn size(&self) -> usize {
        match self {
            PropertyValue::U32(_) => size_of::<u32>(),
            PropertyValue::Str(s) => (s.encode_utf16().count() + 1) * size_of::<u16>(),
            PropertyValue::Lengths(_) => 3 * size_of::<u32>(),
        }
    }

    fn bytes(&self) -> Vec<u8> {
        match self {
            PropertyValue::U32(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Str(s) => to_wide_bytes(s),
            PropertyValue::Lengths(r) => [r.min, r.max, r.increment]
                .iter()
                .flat_map(|v| v.to_le_bytes())
                .collect(),
        }
    }

    /// Copies the value into `output`.
    ///
    /// `None` reports the required size. A short buffer fails with
    /// [`BcryptError::BufferTooSmall`] carrying the same size.
    pub(crate) fn copy_out(&self, output: Option<&mut [u8]>) -> BcryptResult<usize> {
        let required = self.size();
        let Some(output) = output else {
            return Ok(required);
        };
        if output.len() < required {
            Err(BcryptError::BufferTooSmall { required })?;
        }
        output[..required].copy_from_slice(&self.bytes());
        Ok(required)
    }
}

/// Encodes `s` as NUL-terminated UTF-16LE.
pub fn to_wide_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Decodes UTF-16LE bytes up to the first NUL.
pub fn from_wide_bytes(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Properties every algorithm answers.
fn generic_property(id: AlgorithmId, name: &str) -> BcryptResult<PropertyValue> {
    let props = id.props();
    let value = match name {
        BCRYPT_OBJECT_LENGTH => {
            if props.object_length == 0 {
                Err(BcryptError::NotSupported)?;
            }
            PropertyValue::U32(props.object_length)
        }
        BCRYPT_HASH_LENGTH => PropertyValue::U32(props.hash_length),
        BCRYPT_ALGORITHM_NAME => PropertyValue::Str(props.name),
        BCRYPT_HASH_BLOCK_LENGTH => {
            if props.block_bits == 0 {
                Err(BcryptError::NotSupported)?;
            }
            PropertyValue::U32(props.block_bits / 8)
        }
        _ => Err(BcryptError::NotImplemented)?,
    };
    Ok(value)
}

fn aes_property(mode: ChainingMode, name: &str) -> BcryptResult<PropertyValue> {
    let value = match name {
        BCRYPT_BLOCK_LENGTH => PropertyValue::U32(AES_BLOCK_LEN),
        BCRYPT_CHAINING_MODE => PropertyValue::Str(mode.name()),
        BCRYPT_AUTH_TAG_LENGTH => {
            if mode != ChainingMode::Gcm {
                Err(BcryptError::NotSupported)?;
            }
            PropertyValue::Lengths(GCM_TAG_LENGTHS)
        }
        BCRYPT_KEY_LENGTHS => PropertyValue::Lengths(AES_KEY_LENGTHS),
        _ => Err(BcryptError::NotImplemented)?,
    };
    Ok(value)
}

fn unknown(target: &str, name: &str) -> BcryptError {
    tracing::warn!(target, name, "Unsupported property");
    BcryptError::NotImplemented
}

/// Resolves a property of an algorithm handle.
pub(crate) fn algorithm_property(alg: &Algorithm, name: &str) -> BcryptResult<PropertyValue> {
    match generic_property(alg.id, name) {
        Err(BcryptError::NotImplemented) => {}
        other => return other,
    }
    match alg.id {
        AlgorithmId::Aes => aes_property(alg.mode, name).map_err(|err| match err {
            BcryptError::NotImplemented => unknown(alg.id.name(), name),
            err => err,
        }),
        _ => Err(unknown(alg.id.name(), name)),
    }
}

/// Resolves a property of a hash handle.
pub(crate) fn hash_property(id: AlgorithmId, name: &str) -> BcryptResult<PropertyValue> {
    generic_property(id, name).map_err(|err| match err {
        BcryptError::NotImplemented => unknown("hash", name),
        err => err,
    })
}

/// Resolves a property of a key handle.
pub(crate) fn key_property(
    mode: ChainingMode,
    key_len: usize,
    name: &str,
) -> BcryptResult<PropertyValue> {
    match name {
        BCRYPT_KEY_LENGTH => {
            let bits = u32::try_from(key_len * 8).map_err(|_| BcryptError::InternalError)?;
            Ok(PropertyValue::U32(bits))
        }
        BCRYPT_ALGORITHM_NAME => Ok(PropertyValue::Str(BCRYPT_AES_ALGORITHM)),
        _ => aes_property(mode, name).map_err(|err| match err {
            BcryptError::NotImplemented => unknown("key", name),
            err => err,
        }),
    }
}

/// Parses a set-property request. Only the chaining mode is settable.
pub(crate) fn parse_chaining_mode(name: &str, value: &[u8]) -> BcryptResult<ChainingMode> {
    if name != BCRYPT_CHAINING_MODE {
        return Err(unknown("set", name));
    }
    ChainingMode::from_name(&from_wide_bytes(value))
}
