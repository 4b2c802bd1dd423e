// Copyright (C) Microsoft Corporation. All rights reserved.


#[cfg(feature = "openssl")]
mod aes_tests;

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

pub(crate) use testvectors::*;

use super::*;
use crate::digest::DigestOp;
use crate::digest::Sha256;

/// Backend that XORs data with the key and counts context creations.
///
/// Its "tag" is a SHA-256 over key, nonce, auth data and plaintext, which
/// is enough to observe tampering.
#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    inits: AtomicUsize,
}

impl RecordingBackend {
    pub(crate) fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

impl CipherBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn cipher_init(
        &self,
        kind: CipherKind,
        secret: &[u8],
        iv: &[u8],
    ) -> BcryptResult<Box<dyn CipherContext>> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        let mut tag = Sha256::default();
        tag.update(secret);
        tag.update(iv);
        Ok(Box::new(XorContext {
            kind,
            secret: secret.to_vec(),
            tag,
        }))
    }
}

struct XorContext {
    kind: CipherKind,
    secret: Vec<u8>,
    tag: Sha256,
}

impl XorContext {
    fn xor(&self, input: &[u8], output: &mut [u8]) {
        for (i, (o, b)) in output.iter_mut().zip(input).enumerate() {
            *o = b ^ self.secret[i % self.secret.len()];
        }
    }
}

impl CipherContext for XorContext {
    fn add_auth_data(&mut self, aad: &[u8]) -> BcryptResult<()> {
        self.tag.update(aad);
        Ok(())
    }

    fn encrypt(&mut self, input: &[u8], output: &mut [u8]) -> BcryptResult<()> {
        self.tag.update(input);
        self.xor(input, output);
        Ok(())
    }

    fn decrypt(&mut self, input: &[u8], output: &mut [u8]) -> BcryptResult<()> {
        self.xor(input, output);
        self.tag.update(&output[..input.len()]);
        Ok(())
    }

    fn tag(&mut self, tag: &mut [u8]) -> BcryptResult<()> {
        assert_eq!(self.kind.mode(), ChainingMode::Gcm);
        let digest = std::mem::take(&mut self.tag).finalize_vec();
        tag.copy_from_slice(&digest[..tag.len()]);
        Ok(())
    }
}

pub(crate) fn aes(mode: ChainingMode) -> Algorithm {
    let mut alg = Algorithm::new(AlgorithmId::Aes, false);
    alg.mode = mode;
    alg
}

pub(crate) fn recording_key(mode: ChainingMode, secret: &[u8]) -> (Arc<RecordingBackend>, KeyObject) {
    crate::test_tracing::init();
    let backend = Arc::new(RecordingBackend::default());
    let shared: Arc<dyn CipherBackend> = backend.clone();
    let key = KeyObject::new(&aes(mode), secret, Some(shared)).expect("key");
    (backend, key)
}

#[cfg(feature = "openssl")]
pub(crate) fn ossl_key(mode: ChainingMode, secret: &[u8]) -> KeyObject {
    crate::test_tracing::init();
    let backend: Arc<dyn CipherBackend> = Arc::new(OsslBackend::new().expect("openssl backend"));
    KeyObject::new(&aes(mode), secret, Some(backend)).expect("key")
}
