// Copyright (C) Microsoft Corporation. All rights reserved.

//! Hash dispatch layer and hash objects.
//!
//! [`HashEngine`] holds exactly one live digest primitive, selected by
//! [`HashAlgorithm`]. Hash objects compose one or two engines, the second
//! being the outer engine of an HMAC.

mod hmac;
mod object;

pub(crate) use object::HashObject;

use crate::digest::*;

/// Digest algorithms a hash object can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5, 16-byte digest.
    Md5,
    /// SHA-1, 20-byte digest.
    Sha1,
    /// SHA-256, 32-byte digest.
    Sha256,
    /// SHA-384, 48-byte digest.
    Sha384,
    /// SHA-512, 64-byte digest.
    Sha512,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => Md5::OUTPUT_LEN,
            HashAlgorithm::Sha1 => Sha1::OUTPUT_LEN,
            HashAlgorithm::Sha256 => Sha256::OUTPUT_LEN,
            HashAlgorithm::Sha384 => Sha384::OUTPUT_LEN,
            HashAlgorithm::Sha512 => Sha512::OUTPUT_LEN,
        }
    }

    /// Compression-function block length in bytes.
    pub fn block_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => Md5::BLOCK_LEN,
            HashAlgorithm::Sha1 => Sha1::BLOCK_LEN,
            HashAlgorithm::Sha256 => Sha256::BLOCK_LEN,
            HashAlgorithm::Sha384 => Sha384::BLOCK_LEN,
            HashAlgorithm::Sha512 => Sha512::BLOCK_LEN,
        }
    }
}

/// One running digest of a known algorithm.
#[derive(Clone)]
pub(crate) enum HashEngine {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl HashEngine {
    pub(crate) fn new(alg: HashAlgorithm) -> Self {
        match alg {
            HashAlgorithm::Md5 => HashEngine::Md5(Md5::default()),
            HashAlgorithm::Sha1 => HashEngine::Sha1(Sha1::default()),
            HashAlgorithm::Sha256 => HashEngine::Sha256(Sha256::default()),
            HashAlgorithm::Sha384 => HashEngine::Sha384(Sha384::default()),
            HashAlgorithm::Sha512 => HashEngine::Sha512(Sha512::default()),
        }
    }

    pub(crate) fn algorithm(&self) -> HashAlgorithm {
        match self {
            HashEngine::Md5(_) => HashAlgorithm::Md5,
            HashEngine::Sha1(_) => HashAlgorithm::Sha1,
            HashEngine::Sha256(_) => HashAlgorithm::Sha256,
            HashEngine::Sha384(_) => HashAlgorithm::Sha384,
            HashEngine::Sha512(_) => HashAlgorithm::Sha512,
        }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        match self {
            HashEngine::Md5(d) => d.update(data),
            HashEngine::Sha1(d) => d.update(data),
            HashEngine::Sha256(d) => d.update(data),
            HashEngine::Sha384(d) => d.update(data),
            HashEngine::Sha512(d) => d.update(data),
        }
    }

    /// Writes the digest into `out`, which the caller sizes to the digest length.
    pub(crate) fn finish(self, out: &mut [u8]) {
        match self {
            HashEngine::Md5(d) => d.finalize_into(out),
            HashEngine::Sha1(d) => d.finalize_into(out),
            HashEngine::Sha256(d) => d.finalize_into(out),
            HashEngine::Sha384(d) => d.finalize_into(out),
            HashEngine::Sha512(d) => d.finalize_into(out),
        }
    }
}

#[cfg(test)]
mod tests;
