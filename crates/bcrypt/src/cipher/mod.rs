// Copyright (C) Microsoft Corporation. All rights reserved.

//! Symmetric key objects and the AES encrypt/decrypt engine.
//!
//! A key owns a copy of its secret and its own chaining mode. Every encrypt
//! or decrypt call rebuilds the backend context from the supplied IV or
//! nonce, so no chaining state leaks from one call into the next.
//!
//! # Block modes
//!
//! ECB and CBC process whole blocks. With [`BCRYPT_BLOCK_PADDING`] the
//! plaintext is PKCS#7 padded; without it the input must be block aligned.
//!
//! # GCM
//!
//! GCM needs an [`AuthInfo`] carrying the nonce and a tag buffer of 12 to 16
//! bytes. Encryption writes the tag, decryption recomputes it and compares.

mod padding;

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::algorithm::*;
use crate::backend::*;
use crate::error::*;
use crate::property::*;

/// Authenticated cipher parameters for GCM calls.
#[derive(Debug, Default)]
pub struct AuthInfo<'a> {
    /// Nonce; required.
    pub nonce: Option<&'a [u8]>,
    /// Additional authenticated data.
    pub auth_data: Option<&'a [u8]>,
    /// Tag written by encryption and checked by decryption; required.
    pub tag: Option<&'a mut [u8]>,
    /// `BCRYPT_AUTH_MODE_*` flags.
    pub flags: u32,
}

struct GcmParams<'a> {
    nonce: &'a [u8],
    auth_data: Option<&'a [u8]>,
    tag: &'a mut [u8],
}

fn gcm_params<'a, 'b: 'a>(auth_info: Option<&'a mut AuthInfo<'b>>) -> BcryptResult<GcmParams<'a>> {
    let Some(auth_info) = auth_info else {
        tracing::error!("GCM requires auth info");
        return Err(BcryptError::InvalidParameter);
    };
    if auth_info.flags & BCRYPT_AUTH_MODE_CHAIN_CALLS_FLAG != 0 {
        tracing::warn!("Ignoring chained auth mode calls");
    }

    let nonce = auth_info
        .nonce
        .filter(|nonce| !nonce.is_empty())
        .ok_or(BcryptError::InvalidParameter)?;
    let tag = auth_info
        .tag
        .as_deref_mut()
        .ok_or(BcryptError::InvalidParameter)?;

    let tag_len = u32::try_from(tag.len()).map_err(|_| BcryptError::NotSupported)?;
    if tag_len < GCM_TAG_LENGTHS.min || tag_len > GCM_TAG_LENGTHS.max {
        tracing::error!(tag_len, "Unsupported GCM tag length");
        Err(BcryptError::NotSupported)?;
    }

    Ok(GcmParams {
        nonce,
        auth_data: auth_info.auth_data,
        tag,
    })
}

fn check_flags(flags: u32) -> BcryptResult<()> {
    if flags & !BCRYPT_BLOCK_PADDING != 0 {
        tracing::warn!(flags, "Unsupported encrypt/decrypt flags");
        Err(BcryptError::NotImplemented)?;
    }
    Ok(())
}

/// Constant-time comparison of equal-length byte strings.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// State behind a key handle.
pub(crate) struct KeyObject {
    mode: ChainingMode,
    block_size: usize,
    secret: Zeroizing<Vec<u8>>,
    backend: Arc<dyn CipherBackend>,
    ctx: Option<Box<dyn CipherContext>>,
}

impl KeyObject {
    /// Builds an AES key from `alg` and a copy of `secret`.
    pub(crate) fn new(
        alg: &Algorithm,
        secret: &[u8],
        backend: Option<Arc<dyn CipherBackend>>,
    ) -> BcryptResult<Self> {
        if alg.id != AlgorithmId::Aes {
            tracing::error!(alg = alg.id.name(), "Symmetric keys need AES");
            Err(BcryptError::NotSupported)?;
        }

        let key_bits = u32::try_from(secret.len() * 8).map_err(|_| BcryptError::InvalidParameter)?;
        if !AES_KEY_LENGTHS.contains(key_bits) {
            tracing::error!(key_len = secret.len(), "Invalid AES key length");
            Err(BcryptError::InvalidParameter)?;
        }

        let Some(backend) = backend else {
            tracing::error!("No cipher backend for key generation");
            return Err(BcryptError::InternalError);
        };

        let block_size = match algorithm_property(alg, BCRYPT_BLOCK_LENGTH)? {
            PropertyValue::U32(len) => len as usize,
            _ => Err(BcryptError::InternalError)?,
        };

        Ok(Self {
            mode: alg.mode,
            block_size,
            secret: Zeroizing::new(try_copy(secret)?),
            backend,
            ctx: None,
        })
    }

    /// Copies the key material and mode. The copy builds its own context.
    pub(crate) fn try_clone(&self) -> BcryptResult<Self> {
        Ok(Self {
            mode: self.mode,
            block_size: self.block_size,
            secret: Zeroizing::new(try_copy(&self.secret)?),
            backend: Arc::clone(&self.backend),
            ctx: None,
        })
    }

    pub(crate) fn mode(&self) -> ChainingMode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: ChainingMode) {
        self.mode = mode;
        self.ctx = None;
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub(crate) fn property(&self, name: &str) -> BcryptResult<PropertyValue> {
        key_property(self.mode, self.secret.len(), name)
    }

    /// Rebuilds the backend context for a new IV or nonce.
    fn set_params(&mut self, iv: Option<&[u8]>) -> BcryptResult<()> {
        let kind = CipherKind::aes(self.mode, self.secret.len())?;
        self.ctx = None;
        self.ctx = Some(
            self.backend
                .cipher_init(kind, &self.secret, iv.unwrap_or_default())?,
        );
        Ok(())
    }

    fn ctx(&mut self) -> BcryptResult<&mut Box<dyn CipherContext>> {
        self.ctx.as_mut().ok_or(BcryptError::InternalError)
    }

    /// Encrypts `input`.
    ///
    /// Returns the ciphertext length. With `output` set to `None` nothing is
    /// written and only the length is reported.
    pub(crate) fn encrypt(
        &mut self,
        input: &[u8],
        auth_info: Option<&mut AuthInfo<'_>>,
        iv: Option<&[u8]>,
        output: Option<&mut [u8]>,
        flags: u32,
    ) -> BcryptResult<usize> {
        check_flags(flags)?;
        let pad = flags & BCRYPT_BLOCK_PADDING != 0;

        if self.mode == ChainingMode::Gcm {
            let params = gcm_params(auth_info)?;
            self.set_params(Some(params.nonce))?;
            if pad {
                tracing::error!("Block padding is meaningless for GCM");
                Err(BcryptError::InvalidParameter)?;
            }

            let ret_len = input.len();
            let Some(output) = output else {
                return Ok(ret_len);
            };
            if output.len() < ret_len {
                Err(BcryptError::BufferTooSmall { required: ret_len })?;
            }

            let ctx = self.ctx()?;
            if let Some(aad) = params.auth_data {
                ctx.add_auth_data(aad)?;
            }
            ctx.encrypt(input, &mut output[..ret_len])?;
            ctx.tag(params.tag)?;
            return Ok(ret_len);
        }

        self.set_params(iv)?;
        let bs = self.block_size;
        let ret_len = if pad {
            padding::padded_len(input.len(), bs)
        } else if input.len() % bs != 0 {
            tracing::error!(len = input.len(), "Input is not block aligned");
            Err(BcryptError::InvalidBufferSize)?
        } else {
            input.len()
        };

        let Some(output) = output else {
            return Ok(ret_len);
        };
        if output.len() < ret_len {
            Err(BcryptError::BufferTooSmall { required: ret_len })?;
        }
        if self.mode == ChainingMode::Ecb && iv.is_some() {
            tracing::error!("ECB does not take an IV");
            Err(BcryptError::InvalidParameter)?;
        }

        let full = input.len() - input.len() % bs;
        let ctx = self.ctx()?;
        ctx.encrypt(&input[..full], &mut output[..full])?;
        if pad {
            let block = padding::pad_block(&input[full..], bs);
            ctx.encrypt(&block, &mut output[full..full + bs])?;
        }
        Ok(ret_len)
    }

    /// Decrypts `input`.
    ///
    /// Returns the plaintext length. With padding the true length is only
    /// known after the final block is decrypted; a size query reports the
    /// ciphertext length as an upper bound.
    pub(crate) fn decrypt(
        &mut self,
        input: &[u8],
        auth_info: Option<&mut AuthInfo<'_>>,
        iv: Option<&[u8]>,
        output: Option<&mut [u8]>,
        flags: u32,
    ) -> BcryptResult<usize> {
        check_flags(flags)?;
        let pad = flags & BCRYPT_BLOCK_PADDING != 0;

        if self.mode == ChainingMode::Gcm {
            let params = gcm_params(auth_info)?;
            self.set_params(Some(params.nonce))?;
            if pad {
                tracing::error!("Block padding is meaningless for GCM");
                Err(BcryptError::InvalidParameter)?;
            }

            let ret_len = input.len();
            let Some(output) = output else {
                return Ok(ret_len);
            };
            if output.len() < ret_len {
                Err(BcryptError::BufferTooSmall { required: ret_len })?;
            }

            let ctx = self.ctx()?;
            if let Some(aad) = params.auth_data {
                ctx.add_auth_data(aad)?;
            }
            ctx.decrypt(input, &mut output[..ret_len])?;

            let mut computed = Zeroizing::new([0u8; 16]);
            ctx.tag(&mut computed[..])?;
            if !ct_eq(&computed[..params.tag.len()], params.tag) {
                tracing::error!("GCM tag mismatch");
                Err(BcryptError::AuthTagMismatch)?;
            }
            return Ok(ret_len);
        }

        self.set_params(iv)?;
        let bs = self.block_size;
        if input.len() % bs != 0 {
            tracing::error!(len = input.len(), "Input is not block aligned");
            Err(BcryptError::InvalidBufferSize)?;
        }

        let ret_len = input.len();
        let Some(output) = output else {
            return Ok(ret_len);
        };

        let full = if pad {
            if input.is_empty() {
                tracing::error!("Padded ciphertext needs at least one block");
                Err(BcryptError::InvalidBufferSize)?;
            }
            if output.len() + bs < ret_len {
                Err(BcryptError::BufferTooSmall { required: ret_len })?;
            }
            ret_len - bs
        } else {
            if output.len() < ret_len {
                Err(BcryptError::BufferTooSmall { required: ret_len })?;
            }
            ret_len
        };
        if self.mode == ChainingMode::Ecb && iv.is_some() {
            tracing::error!("ECB does not take an IV");
            Err(BcryptError::InvalidParameter)?;
        }

        let ctx = self.ctx()?;
        ctx.decrypt(&input[..full], &mut output[..full])?;
        if !pad {
            return Ok(ret_len);
        }

        let mut last = Zeroizing::new(vec![0u8; bs]);
        ctx.decrypt(&input[full..], &mut last)?;
        let keep = bs - padding::pad_len(&last)?;
        if output.len() < full + keep {
            Err(BcryptError::BufferTooSmall {
                required: full + keep,
            })?;
        }
        output[full..full + keep].copy_from_slice(&last[..keep]);
        Ok(full + keep)
    }
}

#[cfg(test)]
mod tests;
