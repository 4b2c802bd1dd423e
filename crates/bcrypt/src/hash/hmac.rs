// Copyright (C) Microsoft Corporation. All rights reserved.

//! HMAC key schedule (RFC 2104).

use zeroize::Zeroizing;

use super::HashAlgorithm;
use super::HashEngine;

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Inner and outer engines primed with the keyed pad blocks.
pub(crate) struct HmacEngines {
    pub(crate) inner: HashEngine,
    pub(crate) outer: HashEngine,
}

/// Builds both HMAC engines for `secret`.
pub(crate) fn key_schedule(alg: HashAlgorithm, secret: &[u8]) -> HmacEngines {
    let key = block_key(alg, secret);

    let mut outer = HashEngine::new(alg);
    outer.update(&xor_block(&key, OPAD));

    let mut inner = HashEngine::new(alg);
    inner.update(&xor_block(&key, IPAD));

    HmacEngines { inner, outer }
}

/// Completes an HMAC: the inner digest is fed to the outer engine.
pub(crate) fn finish(inner: HashEngine, mut outer: HashEngine, out: &mut [u8]) {
    let alg = inner.algorithm();
    let mut inner_digest = Zeroizing::new(vec![0u8; alg.digest_len()]);
    inner.finish(&mut inner_digest);
    outer.update(&inner_digest);
    outer.finish(out);
}

/// Secrets longer than a block are hashed first. The result is zero padded
/// to the block length.
fn block_key(alg: HashAlgorithm, secret: &[u8]) -> Zeroizing<Vec<u8>> {
    let block_len = alg.block_len();
    let mut key = Zeroizing::new(vec![0u8; block_len]);

    if secret.len() > block_len {
        let mut engine = HashEngine::new(alg);
        engine.update(secret);
        engine.finish(&mut key[..alg.digest_len()]);
    } else {
        key[..secret.len()].copy_from_slice(secret);
    }

    key
}

fn xor_block(key: &[u8], pad: u8) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(key.iter().map(|b| b ^ pad).collect())
}
