// Copyright (C) Microsoft Corporation. All rights reserved.

//! Handle-based hash, HMAC and AES engine with Windows CNG `bcrypt`
//! semantics.
//!
//! The crate reproduces the observable behaviour of the `bcrypt` primitive
//! provider: algorithm providers are opened by name, hash and key objects are
//! created from them, and every call reports one of a fixed set of status
//! kinds.
//!
//! # Architecture
//!
//! - [`digest`]: MD5, SHA-1, SHA-256, SHA-384 and SHA-512 primitives
//! - `hash`: digest dispatch, HMAC composition and hash objects
//! - `cipher`: AES key objects in ECB, CBC and GCM modes
//! - [`backend`]: the native cipher library contract, OpenSSL by default
//! - [`Bcrypt`]: opaque handles and the public operations
//!
//! # Example
//!
//! ```
//! use bcrypt_engine::*;
//!
//! let bcrypt = Bcrypt::with_backend(None);
//! let alg = bcrypt.open_algorithm_provider(BCRYPT_SHA256_ALGORITHM, None, 0)?;
//! let mut digest = [0u8; 32];
//! bcrypt.hash(alg, None, b"abc", Some(&mut digest))?;
//! assert_eq!(digest[..4], [0xbau8, 0x78, 0x16, 0xbf]);
//! bcrypt.close_algorithm_provider(alg, 0)?;
//! # Ok::<(), BcryptError>(())
//! ```

mod algorithm;
pub mod backend;
mod blob;
mod cipher;
pub mod digest;
mod error;
mod handle_table;
mod hash;
mod property;
mod provider;
mod rng;
#[cfg(test)]
mod test_tracing;

pub use algorithm::*;
pub use blob::BCRYPT_KEY_DATA_BLOB;
pub use blob::BCRYPT_KEY_DATA_BLOB_MAGIC;
pub use blob::BCRYPT_KEY_DATA_BLOB_VERSION1;
pub use blob::BCRYPT_OPAQUE_KEY_BLOB;
pub use blob::KeyBlobType;
pub use cipher::AuthInfo;
pub use error::*;
pub use handle_table::BcryptHandle;
pub use hash::HashAlgorithm;
pub use property::*;
pub use provider::Bcrypt;
