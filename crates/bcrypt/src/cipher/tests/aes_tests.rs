// Copyright (C) Microsoft Corporation. All rights reserved.

use rand::Rng;

use super::*;

fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s).expect("hex")
}

fn check_vector(mode: ChainingMode, vector: &AesTestVector) {
    let mut key = ossl_key(mode, &unhex(vector.key));
    let iv = vector.iv.map(unhex);
    let plaintext = unhex(vector.plaintext);
    let expected = unhex(vector.ciphertext);

    let mut ciphertext = vec![0u8; plaintext.len()];
    let len = key
        .encrypt(&plaintext, None, iv.as_deref(), Some(&mut ciphertext), 0)
        .expect("encrypt");
    assert_eq!(len, expected.len());
    assert_eq!(hex::encode(&ciphertext), vector.ciphertext);

    let mut decrypted = vec![0u8; expected.len()];
    let len = key
        .decrypt(&expected, None, iv.as_deref(), Some(&mut decrypted), 0)
        .expect("decrypt");
    assert_eq!(&decrypted[..len], plaintext);
}

#[test]
fn test_aes128_cbc_vector() {
    check_vector(ChainingMode::Cbc, &AES128_CBC_TEST_VECTOR);
}

#[test]
fn test_aes128_ecb_vector() {
    check_vector(ChainingMode::Ecb, &AES128_ECB_TEST_VECTOR);
}

#[test]
fn test_fips197_block() {
    check_vector(ChainingMode::Ecb, &AES128_FIPS197_TEST_VECTOR);

    // a zero IV makes the first CBC block equal to ECB
    let zero_iv = AesTestVector {
        iv: Some("00000000000000000000000000000000"),
        ..AES128_FIPS197_TEST_VECTOR
    };
    check_vector(ChainingMode::Cbc, &zero_iv);
}

#[test]
fn test_cbc_without_iv_uses_zero_iv() {
    let vector = &AES128_FIPS197_TEST_VECTOR;
    let mut key = ossl_key(ChainingMode::Cbc, &unhex(vector.key));
    let mut out = [0u8; 16];
    key.encrypt(&unhex(vector.plaintext), None, None, Some(&mut out), 0)
        .expect("encrypt");
    assert_eq!(hex::encode(out), vector.ciphertext);
}

#[test]
fn test_cbc_short_iv_is_zero_filled() {
    let mut key = ossl_key(ChainingMode::Cbc, &[0x42u8; 16]);
    let mut short = [0u8; 32];
    let mut full = [0u8; 32];
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

    key.encrypt(&[0x24u8; 32], None, Some(&iv[..8]), Some(&mut short), 0)
        .expect("short iv");
    key.encrypt(&[0x24u8; 32], None, Some(&iv), Some(&mut full), 0)
        .expect("full iv");
    assert_eq!(short, full);
}

#[test]
fn test_padding_appends_full_block() {
    let vector = &AES128_CBC_TEST_VECTOR;
    let mut key = ossl_key(ChainingMode::Cbc, &unhex(vector.key));
    let iv = unhex(vector.iv.unwrap_or_default());
    let plaintext = unhex(vector.plaintext);

    let mut ciphertext = vec![0u8; plaintext.len() + 16];
    let len = key
        .encrypt(&plaintext, None, Some(&iv), Some(&mut ciphertext), BCRYPT_BLOCK_PADDING)
        .expect("encrypt");
    assert_eq!(len, 48);
    assert_eq!(hex::encode(&ciphertext[..32]), vector.ciphertext);

    let mut decrypted = vec![0u8; 48];
    let len = key
        .decrypt(&ciphertext, None, Some(&iv), Some(&mut decrypted), BCRYPT_BLOCK_PADDING)
        .expect("decrypt");
    assert_eq!(&decrypted[..len], plaintext);
}

#[test]
fn test_ecb_leaks_equal_blocks() {
    let plaintext = [0x61u8; 32];
    let iv = [0u8; 16];

    let mut ecb = ossl_key(ChainingMode::Ecb, &[0x11u8; 16]);
    let mut out = [0u8; 32];
    ecb.encrypt(&plaintext, None, None, Some(&mut out), 0)
        .expect("ecb");
    assert_eq!(out[..16], out[16..]);

    let mut cbc = ossl_key(ChainingMode::Cbc, &[0x11u8; 16]);
    cbc.encrypt(&plaintext, None, Some(&iv), Some(&mut out), 0)
        .expect("cbc");
    assert_ne!(out[..16], out[16..]);
}

#[test]
fn test_all_key_sizes_round_trip() {
    let mut rng = rand::thread_rng();
    for key_len in [16usize, 24, 32] {
        for mode in [ChainingMode::Ecb, ChainingMode::Cbc] {
            let secret: Vec<u8> = (0..key_len).map(|_| rng.r#gen::<u8>()).collect();
            let plaintext: Vec<u8> = (0..37).map(|_| rng.r#gen::<u8>()).collect();
            let iv = (mode == ChainingMode::Cbc).then_some([0x5cu8; 16]);
            let mut key = ossl_key(mode, &secret);

            let size = key
                .encrypt(&plaintext, None, iv.as_ref().map(|v| &v[..]), None, BCRYPT_BLOCK_PADDING)
                .expect("size");
            assert_eq!(size, 48);

            let mut ciphertext = vec![0u8; size];
            key.encrypt(
                &plaintext,
                None,
                iv.as_ref().map(|v| &v[..]),
                Some(&mut ciphertext),
                BCRYPT_BLOCK_PADDING,
            )
            .expect("encrypt");

            let mut decrypted = vec![0u8; size];
            let len = key
                .decrypt(
                    &ciphertext,
                    None,
                    iv.as_ref().map(|v| &v[..]),
                    Some(&mut decrypted),
                    BCRYPT_BLOCK_PADDING,
                )
                .expect("decrypt");
            assert_eq!(&decrypted[..len], plaintext);
        }
    }
}
