// Copyright (C) Microsoft Corporation. All rights reserved.

//! Algorithm identities, chaining modes and their fixed metadata.

use crate::error::*;
use crate::hash::HashAlgorithm;

/// The only recognized provider implementation name.
pub const MS_PRIMITIVE_PROVIDER: &str = "Microsoft Primitive Provider";

/// Open-provider flag: hashes created from the handle are HMACs.
pub const BCRYPT_ALG_HANDLE_HMAC_FLAG: u32 = 0x0000_0008;

/// Create-hash flag: the object restarts after every finish.
pub const BCRYPT_HASH_REUSABLE_FLAG: u32 = 0x0000_0020;

/// Encrypt/decrypt flag: apply PKCS#7 padding.
pub const BCRYPT_BLOCK_PADDING: u32 = 0x0000_0001;

/// Gen-random flag: use the system RNG without an algorithm handle.
pub const BCRYPT_USE_SYSTEM_PREFERRED_RNG: u32 = 0x0000_0002;

/// Auth-info flag: chain several encrypt/decrypt calls. Ignored.
pub const BCRYPT_AUTH_MODE_CHAIN_CALLS_FLAG: u32 = 0x0000_0001;

/// Algorithm name strings.
pub const BCRYPT_AES_ALGORITHM: &str = "AES";
pub const BCRYPT_MD5_ALGORITHM: &str = "MD5";
pub const BCRYPT_RNG_ALGORITHM: &str = "RNG";
pub const BCRYPT_SHA1_ALGORITHM: &str = "SHA1";
pub const BCRYPT_SHA256_ALGORITHM: &str = "SHA256";
pub const BCRYPT_SHA384_ALGORITHM: &str = "SHA384";
pub const BCRYPT_SHA512_ALGORITHM: &str = "SHA512";

/// Chaining mode name strings.
pub const BCRYPT_CHAIN_MODE_CBC: &str = "ChainingModeCBC";
pub const BCRYPT_CHAIN_MODE_ECB: &str = "ChainingModeECB";
pub const BCRYPT_CHAIN_MODE_GCM: &str = "ChainingModeGCM";

// Object sizes reported to callers. These are legacy ABI values.
#[cfg(target_pointer_width = "64")]
const AES_OBJECT_LENGTH: u32 = 654;
#[cfg(not(target_pointer_width = "64"))]
const AES_OBJECT_LENGTH: u32 = 618;

/// Fixed per-algorithm metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AlgorithmProps {
    pub(crate) name: &'static str,
    pub(crate) object_length: u32,
    pub(crate) hash_length: u32,
    pub(crate) block_bits: u32,
}

/// Algorithms that can be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmId {
    /// AES block cipher.
    Aes,
    /// MD5 digest.
    Md5,
    /// System random number generator.
    Rng,
    /// SHA-1 digest.
    Sha1,
    /// SHA-256 digest.
    Sha256,
    /// SHA-384 digest.
    Sha384,
    /// SHA-512 digest.
    Sha512,
}

impl AlgorithmId {
    const ALL: [AlgorithmId; 7] = [
        AlgorithmId::Aes,
        AlgorithmId::Md5,
        AlgorithmId::Rng,
        AlgorithmId::Sha1,
        AlgorithmId::Sha256,
        AlgorithmId::Sha384,
        AlgorithmId::Sha512,
    ];

    /// Looks up an algorithm by its exact, case-sensitive name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    /// Canonical algorithm name.
    pub fn name(&self) -> &'static str {
        self.props().name
    }

    pub(crate) fn props(&self) -> AlgorithmProps {
        let (name, object_length, hash_length, block_bits) = match self {
            AlgorithmId::Aes => (BCRYPT_AES_ALGORITHM, AES_OBJECT_LENGTH, 0, 0),
            AlgorithmId::Md5 => (BCRYPT_MD5_ALGORITHM, 274, 16, 512),
            AlgorithmId::Rng => (BCRYPT_RNG_ALGORITHM, 0, 0, 0),
            AlgorithmId::Sha1 => (BCRYPT_SHA1_ALGORITHM, 278, 20, 512),
            AlgorithmId::Sha256 => (BCRYPT_SHA256_ALGORITHM, 286, 32, 512),
            AlgorithmId::Sha384 => (BCRYPT_SHA384_ALGORITHM, 382, 48, 1024),
            AlgorithmId::Sha512 => (BCRYPT_SHA512_ALGORITHM, 382, 64, 1024),
        };
        AlgorithmProps {
            name,
            object_length,
            hash_length,
            block_bits,
        }
    }

    /// Digest algorithm behind this id, `None` for AES and RNG.
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            AlgorithmId::Md5 => Some(HashAlgorithm::Md5),
            AlgorithmId::Sha1 => Some(HashAlgorithm::Sha1),
            AlgorithmId::Sha256 => Some(HashAlgorithm::Sha256),
            AlgorithmId::Sha384 => Some(HashAlgorithm::Sha384),
            AlgorithmId::Sha512 => Some(HashAlgorithm::Sha512),
            AlgorithmId::Aes | AlgorithmId::Rng => None,
        }
    }
}

impl From<HashAlgorithm> for AlgorithmId {
    fn from(alg: HashAlgorithm) -> Self {
        match alg {
            HashAlgorithm::Md5 => AlgorithmId::Md5,
            HashAlgorithm::Sha1 => AlgorithmId::Sha1,
            HashAlgorithm::Sha256 => AlgorithmId::Sha256,
            HashAlgorithm::Sha384 => AlgorithmId::Sha384,
            HashAlgorithm::Sha512 => AlgorithmId::Sha512,
        }
    }
}

/// Block cipher chaining modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainingMode {
    /// Independent blocks.
    Ecb,
    /// Cipher block chaining.
    #[default]
    Cbc,
    /// Galois/counter mode.
    Gcm,
}

impl ChainingMode {
    const ALL: [ChainingMode; 3] = [ChainingMode::Ecb, ChainingMode::Cbc, ChainingMode::Gcm];

    /// Wire name of the mode.
    pub fn name(&self) -> &'static str {
        match self {
            ChainingMode::Ecb => BCRYPT_CHAIN_MODE_ECB,
            ChainingMode::Cbc => BCRYPT_CHAIN_MODE_CBC,
            ChainingMode::Gcm => BCRYPT_CHAIN_MODE_GCM,
        }
    }

    /// Looks up a mode by its exact name.
    pub fn from_name(name: &str) -> BcryptResult<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == name)
            .ok_or_else(|| {
                tracing::warn!(name, "Unsupported chaining mode");
                BcryptError::NotImplemented
            })
    }
}

/// State behind an algorithm handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Algorithm {
    pub(crate) id: AlgorithmId,
    pub(crate) mode: ChainingMode,
    pub(crate) hmac: bool,
}

impl Algorithm {
    pub(crate) fn new(id: AlgorithmId, hmac: bool) -> Self {
        Self {
            id,
            mode: ChainingMode::default(),
            hmac,
        }
    }
}
