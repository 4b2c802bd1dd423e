// Copyright (C) Microsoft Corporation. All rights reserved.

//! The public operation surface.
//!
//! [`Bcrypt`] owns a handle table and the cipher backend its keys use. Every
//! operation validates the handle variant before touching the object and
//! returns a [`BcryptResult`]; [`to_status`](crate::to_status) turns that into
//! the raw status a Windows caller would observe.
//!
//! Sizes follow one convention throughout: an output of `None` asks for the
//! required size, a short buffer fails with [`BcryptError::BufferTooSmall`].

use std::sync::Arc;

use tracing::instrument;

use crate::algorithm::*;
use crate::backend;
use crate::backend::CipherBackend;
use crate::blob;
use crate::blob::KeyBlobType;
use crate::cipher::AuthInfo;
use crate::cipher::KeyObject;
use crate::error::*;
use crate::handle_table::*;
use crate::hash::HashObject;
use crate::property::*;
use crate::rng;

/// Handle-based hash, HMAC and AES engine.
pub struct Bcrypt {
    handles: HandleTable,
    backend: Option<Arc<dyn CipherBackend>>,
}

impl Bcrypt {
    /// Creates an engine bound to the process-wide backend, initializing it
    /// on first use.
    pub fn new() -> BcryptResult<Self> {
        backend::initialize()?;
        Ok(Self::with_backend(backend::backend()))
    }

    /// Creates an engine with an explicit backend. `None` disables key
    /// operations.
    pub fn with_backend(backend: Option<Arc<dyn CipherBackend>>) -> Self {
        Self {
            handles: HandleTable::default(),
            backend,
        }
    }

    /// Opens an algorithm provider.
    ///
    /// `id` is matched case-sensitively. The only recognized flag is
    /// [`BCRYPT_ALG_HANDLE_HMAC_FLAG`]; other bits are logged and ignored.
    pub fn open_algorithm_provider(
        &self,
        id: &str,
        implementation: Option<&str>,
        flags: u32,
    ) -> BcryptResult<BcryptHandle> {
        let Some(alg_id) = AlgorithmId::from_name(id) else {
            tracing::warn!(id, "Algorithm not supported");
            return Err(BcryptError::NotImplemented);
        };
        if let Some(implementation) = implementation {
            if implementation != MS_PRIMITIVE_PROVIDER {
                tracing::warn!(implementation, "Implementation not supported");
                Err(BcryptError::NotImplemented)?;
            }
        }
        if flags & !BCRYPT_ALG_HANDLE_HMAC_FLAG != 0 {
            tracing::warn!(flags, "Ignoring unsupported open flags");
        }

        let alg = Algorithm::new(alg_id, flags & BCRYPT_ALG_HANDLE_HMAC_FLAG != 0);
        tracing::debug!(alg = id, hmac = alg.hmac, "Opening algorithm provider");
        Ok(self.handles.alloc_handle(Object::Algorithm(alg)))
    }

    /// Releases an algorithm handle.
    pub fn close_algorithm_provider(&self, algorithm: BcryptHandle, flags: u32) -> BcryptResult<()> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring close flags");
        }
        self.handles.free_handle(algorithm, HandleType::Algorithm)
    }

    /// Reads a property of an algorithm, hash or key handle.
    ///
    /// Returns the value size in bytes. With `output` set to `None` only the
    /// size is reported.
    pub fn get_property(
        &self,
        handle: BcryptHandle,
        name: &str,
        output: Option<&mut [u8]>,
        flags: u32,
    ) -> BcryptResult<usize> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring get property flags");
        }
        let value = self.handles.with_object(handle, |obj| match obj {
            Object::Algorithm(alg) => algorithm_property(alg, name),
            Object::Hash(hash) => hash_property(hash.algorithm().into(), name),
            Object::Key(key) => key.property(name),
        })?;
        value.copy_out(output)
    }

    /// Writes a property of an algorithm or key handle.
    ///
    /// Only [`BCRYPT_CHAINING_MODE`] is settable. `value` holds the UTF-16LE
    /// mode name; a trailing NUL is optional.
    pub fn set_property(
        &self,
        handle: BcryptHandle,
        name: &str,
        value: &[u8],
        flags: u32,
    ) -> BcryptResult<()> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring set property flags");
        }
        self.handles.with_object(handle, |obj| match obj {
            Object::Algorithm(alg) => {
                if alg.id != AlgorithmId::Aes {
                    tracing::warn!(alg = alg.id.name(), name, "Property is not settable");
                    Err(BcryptError::NotImplemented)?;
                }
                alg.mode = parse_chaining_mode(name, value)?;
                tracing::debug!(mode = alg.mode.name(), "Algorithm chaining mode set");
                Ok(())
            }
            Object::Key(key) => {
                let mode = parse_chaining_mode(name, value)?;
                key.set_mode(mode);
                tracing::debug!(mode = mode.name(), "Key chaining mode set");
                Ok(())
            }
            Object::Hash(_) => {
                tracing::warn!(name, "Hash properties are read-only");
                Err(BcryptError::NotImplemented)
            }
        })
    }

    /// Creates a hash object, or an HMAC when the algorithm was opened with
    /// [`BCRYPT_ALG_HANDLE_HMAC_FLAG`].
    ///
    /// `secret` is ignored for plain hashes. [`BCRYPT_HASH_REUSABLE_FLAG`] is
    /// the only accepted flag.
    pub fn create_hash(
        &self,
        algorithm: BcryptHandle,
        secret: Option<&[u8]>,
        flags: u32,
    ) -> BcryptResult<BcryptHandle> {
        let alg = self.handles.algorithm(algorithm)?;
        if flags & !BCRYPT_HASH_REUSABLE_FLAG != 0 {
            tracing::warn!(flags, "Unsupported create hash flags");
            Err(BcryptError::NotImplemented)?;
        }
        let Some(hash_alg) = alg.id.hash_algorithm() else {
            tracing::error!(alg = alg.id.name(), "Algorithm cannot create hashes");
            return Err(BcryptError::NotImplemented);
        };

        let hmac_secret = alg.hmac.then(|| secret.unwrap_or_default());
        let hash = HashObject::new(
            hash_alg,
            hmac_secret,
            flags & BCRYPT_HASH_REUSABLE_FLAG != 0,
        )?;
        tracing::debug!(alg = alg.id.name(), hmac = alg.hmac, "Creating hash");
        Ok(self.handles.alloc_handle(Object::Hash(Box::new(hash))))
    }

    /// Copies a hash object, running state included.
    pub fn duplicate_hash(&self, hash: BcryptHandle, flags: u32) -> BcryptResult<BcryptHandle> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring duplicate hash flags");
        }
        let copy = self.handles.with_hash(hash, |hash| {
            tracing::debug!(alg = ?hash.algorithm(), hmac = hash.is_hmac(), "Duplicating hash");
            hash.try_clone()
        })?;
        Ok(self.handles.alloc_handle(Object::Hash(Box::new(copy))))
    }

    /// Feeds `input` to a hash object. Empty input is a no-op.
    pub fn hash_data(&self, hash: BcryptHandle, input: &[u8], flags: u32) -> BcryptResult<()> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring hash data flags");
        }
        self.handles.with_hash(hash, |hash| {
            if input.is_empty() {
                return Ok(());
            }
            hash.update(input)
        })
    }

    /// Writes the digest or MAC into `output`, which must be exactly the
    /// digest length.
    pub fn finish_hash(
        &self,
        hash: BcryptHandle,
        output: Option<&mut [u8]>,
        flags: u32,
    ) -> BcryptResult<()> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring finish hash flags");
        }
        self.handles.with_hash(hash, |hash| {
            let Some(output) = output else {
                tracing::error!("Finish hash needs an output buffer");
                return Err(BcryptError::InvalidParameter);
            };
            hash.finish(output)
        })
    }

    /// Releases a hash handle.
    pub fn destroy_hash(&self, hash: BcryptHandle) -> BcryptResult<()> {
        self.handles.free_handle(hash, HandleType::Hash)
    }

    /// Hashes `input` in one call through a temporary hash object.
    ///
    /// The temporary handle is released on every path.
    pub fn hash(
        &self,
        algorithm: BcryptHandle,
        secret: Option<&[u8]>,
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> BcryptResult<()> {
        let hash = self.create_hash(algorithm, secret, 0)?;
        let result = self
            .hash_data(hash, input, 0)
            .and_then(|_| self.finish_hash(hash, output, 0));
        let destroyed = self.destroy_hash(hash);
        result.and(destroyed)
    }

    /// Creates an AES key from `secret` using the algorithm's current mode.
    pub fn generate_symmetric_key(
        &self,
        algorithm: BcryptHandle,
        secret: &[u8],
        flags: u32,
    ) -> BcryptResult<BcryptHandle> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring key generation flags");
        }
        let alg = self.handles.algorithm(algorithm)?;
        let key = KeyObject::new(&alg, secret, self.backend.clone())?;
        tracing::debug!(
            mode = alg.mode.name(),
            key_len = secret.len(),
            "Generated symmetric key"
        );
        Ok(self.handles.alloc_handle(Object::Key(Box::new(key))))
    }

    /// Copies a key's secret and mode. The copy starts without cipher state.
    pub fn duplicate_key(&self, key: BcryptHandle, flags: u32) -> BcryptResult<BcryptHandle> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring duplicate key flags");
        }
        let copy = self.handles.with_key(key, |key| {
            tracing::debug!(mode = key.mode().name(), "Duplicating key");
            key.try_clone()
        })?;
        Ok(self.handles.alloc_handle(Object::Key(Box::new(copy))))
    }

    /// Releases a key handle. The secret is zeroized on drop.
    pub fn destroy_key(&self, key: BcryptHandle) -> BcryptResult<()> {
        self.handles.free_handle(key, HandleType::Key)
    }

    /// Encrypts `input` and returns the ciphertext length.
    #[instrument(skip_all, fields(key = *key, len = input.len()))]
    pub fn encrypt(
        &self,
        key: BcryptHandle,
        input: &[u8],
        auth_info: Option<&mut AuthInfo<'_>>,
        iv: Option<&[u8]>,
        output: Option<&mut [u8]>,
        flags: u32,
    ) -> BcryptResult<usize> {
        self.handles
            .with_key(key, |key| key.encrypt(input, auth_info, iv, output, flags))
    }

    /// Decrypts `input` and returns the plaintext length.
    #[instrument(skip_all, fields(key = *key, len = input.len()))]
    pub fn decrypt(
        &self,
        key: BcryptHandle,
        input: &[u8],
        auth_info: Option<&mut AuthInfo<'_>>,
        iv: Option<&[u8]>,
        output: Option<&mut [u8]>,
        flags: u32,
    ) -> BcryptResult<usize> {
        self.handles
            .with_key(key, |key| key.decrypt(input, auth_info, iv, output, flags))
    }

    /// Fills `buffer` with random bytes.
    ///
    /// Without an algorithm handle [`BCRYPT_USE_SYSTEM_PREFERRED_RNG`] must
    /// be set; with one it must be an RNG provider.
    pub fn gen_random(
        &self,
        algorithm: Option<BcryptHandle>,
        buffer: &mut [u8],
        flags: u32,
    ) -> BcryptResult<()> {
        if flags & !BCRYPT_USE_SYSTEM_PREFERRED_RNG != 0 {
            tracing::warn!(flags, "Ignoring unsupported random flags");
        }

        match algorithm {
            None if flags & BCRYPT_USE_SYSTEM_PREFERRED_RNG == 0 => {
                tracing::error!("No algorithm and no system RNG flag");
                Err(BcryptError::InvalidHandle)?;
            }
            None => {}
            Some(handle) => {
                let alg = self.handles.algorithm(handle)?;
                if alg.id != AlgorithmId::Rng {
                    tracing::error!(alg = alg.id.name(), "Not an RNG provider");
                    Err(BcryptError::InvalidHandle)?;
                }
            }
        }

        if buffer.is_empty() {
            return Ok(());
        }
        rng::rand_bytes(buffer)
    }

    /// Serializes a key as a `blob_type` blob and returns the blob size.
    pub fn export_key(
        &self,
        key: BcryptHandle,
        blob_type: &str,
        output: Option<&mut [u8]>,
        flags: u32,
    ) -> BcryptResult<usize> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring export flags");
        }
        let blob_type = KeyBlobType::from_name(blob_type)?;
        self.handles
            .with_key(key, |key| blob::export(blob_type, key.secret(), output))
    }

    /// Creates a key from a `blob_type` blob.
    pub fn import_key(
        &self,
        algorithm: BcryptHandle,
        blob_type: &str,
        blob: &[u8],
        flags: u32,
    ) -> BcryptResult<BcryptHandle> {
        if flags != 0 {
            tracing::warn!(flags, "Ignoring import flags");
        }
        let alg = self.handles.algorithm(algorithm)?;
        let blob_type = KeyBlobType::from_name(blob_type)?;
        let secret = blob::import(blob_type, blob)?;
        let key = KeyObject::new(&alg, secret, self.backend.clone())?;
        tracing::debug!(?blob_type, key_len = secret.len(), "Imported symmetric key");
        Ok(self.handles.alloc_handle(Object::Key(Box::new(key))))
    }
}
