// Copyright (C) Microsoft Corporation. All rights reserved.



pub(crate) use testvectors::*;

use super::*;

/// HMAC known-answer vector (RFC 2202 / RFC 4231).
pub struct HmacTestVector {
    pub alg: HashAlgorithm,
    pub key: &'static [u8],
    pub data: &'static [u8],
    pub mac: &'static str,
}

pub(crate) fn mac_of(alg: HashAlgorithm, key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut object = HashObject::new(alg, Some(key), false).expect("create hmac");
    object.update(data).expect("update hmac");
    let mut out = vec![0u8; alg.digest_len()];
    object.finish(&mut out).expect("finish hmac");
    out
}

pub(crate) fn digest_of(alg: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut object = HashObject::new(alg, None, false).expect("create hash");
    object.update(data).expect("update hash");
    let mut out = vec![0u8; alg.digest_len()];
    object.finish(&mut out).expect("finish hash");
    out
}
