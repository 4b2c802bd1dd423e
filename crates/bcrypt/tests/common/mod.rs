// Copyright (C) Microsoft Corporation. All rights reserved.

#![allow(dead_code)]

use bcrypt_engine::*;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

pub(crate) const SHA256_ABC: &str =
    "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

pub(crate) fn init_tracing() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let targets = std::env::var("RUST_LOG")
            .ok()
            .and_then(|var| var.parse::<Targets>().ok())
            .unwrap_or_else(|| Targets::new().with_default(LevelFilter::DEBUG));
        let _ = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_test_writer()
            .with_max_level(LevelFilter::TRACE)
            .finish()
            .with(targets)
            .try_init();
    });
}

/// Runs `test` against an engine bound to the process-wide backend.
pub(crate) fn bcrypt_test(test: impl FnOnce(&Bcrypt)) {
    init_tracing();
    let result = Bcrypt::new();
    assert!(result.is_ok(), "result {:?}", result.as_ref().err());
    let bcrypt = result.unwrap();
    test(&bcrypt);
}

pub(crate) fn open(bcrypt: &Bcrypt, id: &str, flags: u32) -> BcryptHandle {
    let result = bcrypt.open_algorithm_provider(id, None, flags);
    assert!(result.is_ok(), "open {id}: {:?}", result);
    result.unwrap()
}

pub(crate) fn get_u32(bcrypt: &Bcrypt, handle: BcryptHandle, name: &str) -> BcryptResult<u32> {
    let mut value = [0u8; 4];
    let len = bcrypt.get_property(handle, name, Some(&mut value), 0)?;
    assert_eq!(len, 4);
    Ok(u32::from_le_bytes(value))
}

pub(crate) fn get_string(bcrypt: &Bcrypt, handle: BcryptHandle, name: &str) -> BcryptResult<String> {
    let size = bcrypt.get_property(handle, name, None, 0)?;
    let mut value = vec![0u8; size];
    assert_eq!(bcrypt.get_property(handle, name, Some(&mut value), 0)?, size);
    Ok(from_wide_bytes(&value))
}

pub(crate) fn set_mode(bcrypt: &Bcrypt, handle: BcryptHandle, mode: &str) -> BcryptResult<()> {
    bcrypt.set_property(handle, BCRYPT_CHAINING_MODE, &to_wide_bytes(mode), 0)
}

/// Hashes `data` through a fresh hash object and returns the digest.
pub(crate) fn digest(bcrypt: &Bcrypt, alg: BcryptHandle, secret: Option<&[u8]>, data: &[u8]) -> Vec<u8> {
    let len = get_u32(bcrypt, alg, BCRYPT_HASH_LENGTH).unwrap() as usize;
    let mut out = vec![0u8; len];
    let result = bcrypt.hash(alg, secret, data, Some(&mut out));
    assert!(result.is_ok(), "result {:?}", result);
    out
}
