// Copyright (C) Microsoft Corporation. All rights reserved.

//! OpenSSL cipher backend.
//!
//! ECB and CBC map onto the matching EVP ciphers with padding disabled; the
//! key object applies PKCS#7 itself. GCM keeps a second, encrypt-direction
//! context alive during decryption so the tag over the recovered plaintext
//! can be read back and compared by the caller.

use openssl::cipher::Cipher;
use openssl::cipher::CipherRef;
use openssl::cipher_ctx::CipherCtx;
use zeroize::Zeroizing;

use super::*;

/// AES block size in bytes.
const AES_BLOCK_LEN: usize = 16;

/// [`CipherBackend`] built on OpenSSL's EVP interface.
#[derive(Debug, Default)]
pub struct OsslBackend {
    _private: (),
}

impl OsslBackend {
    /// Initializes the OpenSSL library and returns the backend.
    pub fn new() -> BcryptResult<Self> {
        openssl::init();
        Ok(Self { _private: () })
    }
}

impl CipherBackend for OsslBackend {
    fn name(&self) -> &'static str {
        "openssl"
    }

    fn cipher_init(
        &self,
        kind: CipherKind,
        secret: &[u8],
        iv: &[u8],
    ) -> BcryptResult<Box<dyn CipherContext>> {
        let cipher = cipher(kind);
        if secret.len() != cipher.key_length() {
            tracing::error!(?kind, key_len = secret.len(), "Key length does not match cipher");
            Err(BcryptError::InternalError)?;
        }

        let iv = match kind.mode() {
            ChainingMode::Ecb => Vec::new(),
            // CBC takes exactly one block; shorter vectors are zero filled
            ChainingMode::Cbc => {
                let mut block = vec![0u8; AES_BLOCK_LEN];
                let len = iv.len().min(AES_BLOCK_LEN);
                block[..len].copy_from_slice(&iv[..len]);
                block
            }
            ChainingMode::Gcm => {
                if iv.is_empty() {
                    tracing::error!("GCM requires a nonce");
                    Err(BcryptError::InvalidParameter)?;
                }
                try_copy(iv)?
            }
        };

        Ok(Box::new(OsslCipherContext {
            kind,
            secret: Zeroizing::new(try_copy(secret)?),
            iv,
            aad: Vec::new(),
            encrypter: None,
            decrypter: None,
        }))
    }
}

fn cipher(kind: CipherKind) -> &'static CipherRef {
    match kind {
        CipherKind::Aes128Ecb => Cipher::aes_128_ecb(),
        CipherKind::Aes192Ecb => Cipher::aes_192_ecb(),
        CipherKind::Aes256Ecb => Cipher::aes_256_ecb(),
        CipherKind::Aes128Cbc => Cipher::aes_128_cbc(),
        CipherKind::Aes192Cbc => Cipher::aes_192_cbc(),
        CipherKind::Aes256Cbc => Cipher::aes_256_cbc(),
        CipherKind::Aes128Gcm => Cipher::aes_128_gcm(),
        CipherKind::Aes192Gcm => Cipher::aes_192_gcm(),
        CipherKind::Aes256Gcm => Cipher::aes_256_gcm(),
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

struct OsslCipherContext {
    kind: CipherKind,
    secret: Zeroizing<Vec<u8>>,
    iv: Vec<u8>,
    aad: Vec<u8>,
    encrypter: Option<CipherCtx>,
    decrypter: Option<CipherCtx>,
}

impl OsslCipherContext {
    fn is_gcm(&self) -> bool {
        self.kind.mode() == ChainingMode::Gcm
    }

    fn new_ctx(&self, direction: Direction) -> BcryptResult<CipherCtx> {
        let cipher = cipher(self.kind);
        let mut ctx = CipherCtx::new().map_bcrypt_err(BcryptError::InternalError)?;

        let iv = (!self.iv.is_empty()).then_some(self.iv.as_slice());
        match direction {
            Direction::Encrypt => ctx.encrypt_init(Some(cipher), None, None),
            Direction::Decrypt => ctx.decrypt_init(Some(cipher), None, None),
        }
        .map_bcrypt_err(BcryptError::InternalError)?;

        if self.is_gcm() {
            ctx.set_iv_length(self.iv.len())
                .map_bcrypt_err(BcryptError::InternalError)?;
        }

        match direction {
            Direction::Encrypt => ctx.encrypt_init(None, Some(self.secret.as_slice()), iv),
            Direction::Decrypt => ctx.decrypt_init(None, Some(self.secret.as_slice()), iv),
        }
        .map_bcrypt_err(BcryptError::InternalError)?;

        if !self.is_gcm() {
            ctx.set_padding(false);
        }

        if !self.aad.is_empty() {
            ctx.cipher_update(&self.aad, None)
                .map_bcrypt_err(BcryptError::InternalError)?;
        }
        Ok(ctx)
    }

    fn ctx(&mut self, direction: Direction) -> BcryptResult<&mut CipherCtx> {
        let slot_empty = match direction {
            Direction::Encrypt => self.encrypter.is_none(),
            Direction::Decrypt => self.decrypter.is_none(),
        };
        if slot_empty {
            let ctx = self.new_ctx(direction)?;
            match direction {
                Direction::Encrypt => self.encrypter = Some(ctx),
                Direction::Decrypt => self.decrypter = Some(ctx),
            }
        }

        let slot = match direction {
            Direction::Encrypt => self.encrypter.as_mut(),
            Direction::Decrypt => self.decrypter.as_mut(),
        };
        slot.ok_or(BcryptError::InternalError)
    }

    fn update(&mut self, direction: Direction, input: &[u8], output: &mut [u8]) -> BcryptResult<()> {
        if output.len() < input.len() {
            Err(BcryptError::BufferTooSmall {
                required: input.len(),
            })?;
        }

        // EVP wants room for one extra block on every update
        let mut scratch = Zeroizing::new(vec![0u8; input.len() + AES_BLOCK_LEN]);
        let written = self
            .ctx(direction)?
            .cipher_update(input, Some(scratch.as_mut_slice()))
            .map_bcrypt_err(BcryptError::InternalError)?;
        if written != input.len() {
            tracing::error!(written, expected = input.len(), "Short cipher update");
            Err(BcryptError::InternalError)?;
        }

        output[..written].copy_from_slice(&scratch[..written]);
        Ok(())
    }
}

impl CipherContext for OsslCipherContext {
    fn add_auth_data(&mut self, aad: &[u8]) -> BcryptResult<()> {
        if !self.is_gcm() {
            tracing::error!(kind = ?self.kind, "Auth data on a non-GCM cipher");
            Err(BcryptError::InternalError)?;
        }

        for ctx in [self.encrypter.as_mut(), self.decrypter.as_mut()]
            .into_iter()
            .flatten()
        {
            ctx.cipher_update(aad, None)
                .map_bcrypt_err(BcryptError::InternalError)?;
        }
        self.aad.extend_from_slice(aad);
        Ok(())
    }

    fn encrypt(&mut self, input: &[u8], output: &mut [u8]) -> BcryptResult<()> {
        self.update(Direction::Encrypt, input, output)
    }

    fn decrypt(&mut self, input: &[u8], output: &mut [u8]) -> BcryptResult<()> {
        self.update(Direction::Decrypt, input, output)?;

        if self.is_gcm() {
            // re-encrypt the plaintext so the tag can be read back
            let plaintext = Zeroizing::new(try_copy(&output[..input.len()])?);
            let mut discard = Zeroizing::new(vec![0u8; plaintext.len()]);
            self.update(Direction::Encrypt, &plaintext, &mut discard)?;
        }
        Ok(())
    }

    fn tag(&mut self, tag: &mut [u8]) -> BcryptResult<()> {
        if !self.is_gcm() {
            tracing::error!(kind = ?self.kind, "Tag requested from a non-GCM cipher");
            Err(BcryptError::InternalError)?;
        }

        let ctx = self.ctx(Direction::Encrypt)?;
        let mut final_block = [0u8; AES_BLOCK_LEN];
        ctx.cipher_final(&mut final_block)
            .map_bcrypt_err(BcryptError::InternalError)?;
        ctx.tag(tag).map_bcrypt_err(BcryptError::InternalError)?;

        // the stream is finished; a further call starts from the nonce again
        self.encrypter = None;
        Ok(())
    }
}
