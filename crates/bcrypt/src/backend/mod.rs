// Copyright (C) Microsoft Corporation. All rights reserved.

//! Native cipher backend.
//!
//! Key objects never touch a cryptographic library directly. They hold an
//! `Arc<dyn CipherBackend>` and ask it for a [`CipherContext`] bound to one
//! key and one IV or nonce.
//!
//! The process-wide backend is installed once by [`initialize`] and removed
//! by [`shutdown`]. When the crate is built without a backend feature both
//! calls succeed and [`backend`] returns `None`; key operations then fail
//! with [`BcryptError::InternalError`].

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::LazyLock;

use parking_lot::RwLock;

use crate::algorithm::ChainingMode;
use crate::error::*;

cfg_if::cfg_if! {
    if #[cfg(feature = "openssl")] {
        mod ossl;
        pub use ossl::OsslBackend;
    }
}

/// Cipher algorithms a backend is asked to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherKind {
    Aes128Ecb,
    Aes192Ecb,
    Aes256Ecb,
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes192Gcm,
    Aes256Gcm,
}

impl CipherKind {
    /// Selects the AES variant for `mode` and a secret of `key_len` bytes.
    pub fn aes(mode: ChainingMode, key_len: usize) -> BcryptResult<Self> {
        let kind = match (mode, key_len) {
            (ChainingMode::Ecb, 16) => CipherKind::Aes128Ecb,
            (ChainingMode::Ecb, 24) => CipherKind::Aes192Ecb,
            (ChainingMode::Ecb, 32) => CipherKind::Aes256Ecb,
            (ChainingMode::Cbc, 16) => CipherKind::Aes128Cbc,
            (ChainingMode::Cbc, 24) => CipherKind::Aes192Cbc,
            (ChainingMode::Cbc, 32) => CipherKind::Aes256Cbc,
            (ChainingMode::Gcm, 16) => CipherKind::Aes128Gcm,
            (ChainingMode::Gcm, 24) => CipherKind::Aes192Gcm,
            (ChainingMode::Gcm, 32) => CipherKind::Aes256Gcm,
            _ => {
                tracing::error!(?mode, key_len, "No AES cipher for key length");
                Err(BcryptError::InternalError)?
            }
        };
        Ok(kind)
    }

    /// Chaining mode of the cipher.
    pub fn mode(&self) -> ChainingMode {
        match self {
            CipherKind::Aes128Ecb | CipherKind::Aes192Ecb | CipherKind::Aes256Ecb => {
                ChainingMode::Ecb
            }
            CipherKind::Aes128Cbc | CipherKind::Aes192Cbc | CipherKind::Aes256Cbc => {
                ChainingMode::Cbc
            }
            CipherKind::Aes128Gcm | CipherKind::Aes192Gcm | CipherKind::Aes256Gcm => {
                ChainingMode::Gcm
            }
        }
    }
}

/// Factory for cipher contexts.
pub trait CipherBackend: Send + Sync + Debug {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Creates a context for `kind` keyed with `secret`.
    ///
    /// `iv` is the chaining vector for CBC, the nonce for GCM and empty for
    /// ECB.
    fn cipher_init(
        &self,
        kind: CipherKind,
        secret: &[u8],
        iv: &[u8],
    ) -> BcryptResult<Box<dyn CipherContext>>;
}

/// A keyed cipher stream. Chaining state carries over between calls.
pub trait CipherContext: Send {
    /// Feeds additional authenticated data. GCM only.
    fn add_auth_data(&mut self, aad: &[u8]) -> BcryptResult<()>;

    /// Encrypts `input` into `output`; both have the same length.
    fn encrypt(&mut self, input: &[u8], output: &mut [u8]) -> BcryptResult<()>;

    /// Decrypts `input` into `output`; both have the same length.
    fn decrypt(&mut self, input: &[u8], output: &mut [u8]) -> BcryptResult<()>;

    /// Writes the GCM tag over everything processed so far into `tag`.
    fn tag(&mut self, tag: &mut [u8]) -> BcryptResult<()>;
}

static BACKEND: LazyLock<RwLock<Option<Arc<dyn CipherBackend>>>> =
    LazyLock::new(|| RwLock::new(None));

/// Installs the process-wide backend. Later calls are no-ops while one is
/// installed.
pub fn initialize() -> BcryptResult<()> {
    let mut backend = BACKEND.write();
    if backend.is_some() {
        return Ok(());
    }

    *backend = default_backend()?;
    match backend.as_ref() {
        Some(b) => tracing::debug!(backend = b.name(), "Cipher backend initialized"),
        None => tracing::warn!("No cipher backend available, key operations are disabled"),
    }
    Ok(())
}

/// Removes the process-wide backend. Contexts already handed out stay
/// usable until their keys are destroyed.
pub fn shutdown() {
    if BACKEND.write().take().is_some() {
        tracing::debug!("Cipher backend shut down");
    }
}

/// Returns the process-wide backend, if one is installed.
pub fn backend() -> Option<Arc<dyn CipherBackend>> {
    BACKEND.read().clone()
}

cfg_if::cfg_if! {
    if #[cfg(feature = "openssl")] {
        fn default_backend() -> BcryptResult<Option<Arc<dyn CipherBackend>>> {
            Ok(Some(Arc::new(OsslBackend::new()?)))
        }
    } else {
        fn default_backend() -> BcryptResult<Option<Arc<dyn CipherBackend>>> {
            Ok(None)
        }
    }
}
