// Copyright (C) Microsoft Corporation. All rights reserved.

#![cfg(feature = "openssl")]

mod common;

use bcrypt_engine::*;
use rand::Rng;

use crate::common::*;

fn aes_key(bcrypt: &Bcrypt, mode: &str, secret: &[u8]) -> (BcryptHandle, BcryptHandle) {
    let alg = open(bcrypt, BCRYPT_AES_ALGORITHM, 0);
    set_mode(bcrypt, alg, mode).unwrap();
    let result = bcrypt.generate_symmetric_key(alg, secret, 0);
    assert!(result.is_ok(), "result {:?}", result);
    (alg, result.unwrap())
}

fn encrypt_all(
    bcrypt: &Bcrypt,
    key: BcryptHandle,
    input: &[u8],
    iv: Option<&[u8]>,
    flags: u32,
) -> Vec<u8> {
    let size = bcrypt.encrypt(key, input, None, iv, None, flags).unwrap();
    let mut out = vec![0u8; size];
    let written = bcrypt
        .encrypt(key, input, None, iv, Some(&mut out), flags)
        .unwrap();
    assert_eq!(written, size);
    out
}

fn decrypt_all(
    bcrypt: &Bcrypt,
    key: BcryptHandle,
    input: &[u8],
    iv: Option<&[u8]>,
    flags: u32,
) -> BcryptResult<Vec<u8>> {
    let size = bcrypt.decrypt(key, input, None, iv, None, flags)?;
    let mut out = vec![0u8; size];
    let written = bcrypt.decrypt(key, input, None, iv, Some(&mut out), flags)?;
    out.truncate(written);
    Ok(out)
}

#[test]
fn test_cbc_round_trip() {
    bcrypt_test(|bcrypt| {
        let mut rng = rand::thread_rng();
        for key_len in [16usize, 24, 32] {
            let secret: Vec<u8> = (0..key_len).map(|_| rng.r#gen()).collect();
            let (_, key) = aes_key(bcrypt, BCRYPT_CHAIN_MODE_CBC, &secret);
            let iv: [u8; 16] = rng.r#gen();

            for len in [0usize, 1, 15, 16, 17, 31, 32, 100] {
                let plaintext: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
                let ciphertext =
                    encrypt_all(bcrypt, key, &plaintext, Some(&iv), BCRYPT_BLOCK_PADDING);
                assert_eq!(ciphertext.len(), (len / 16 + 1) * 16);

                let decrypted =
                    decrypt_all(bcrypt, key, &ciphertext, Some(&iv), BCRYPT_BLOCK_PADDING);
                assert_eq!(decrypted, Ok(plaintext), "key_len {key_len} len {len}");
            }
        }
    });
}

#[test]
fn test_ecb_known_answer() {
    bcrypt_test(|bcrypt| {
        let secret = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let plaintext = hex::decode("00112233445566778899aabbccddeeff").unwrap();
        let (_, key) = aes_key(bcrypt, BCRYPT_CHAIN_MODE_ECB, &secret);

        let doubled = [plaintext.clone(), plaintext].concat();
        let ciphertext = encrypt_all(bcrypt, key, &doubled, None, 0);
        assert_eq!(
            hex::encode(&ciphertext[..16]),
            "69c4e0d86a7b0430d8cdb78070b4c55a"
        );
        assert_eq!(ciphertext[..16], ciphertext[16..]);

        assert_eq!(
            bcrypt.encrypt(key, &doubled, None, Some(&[0u8; 16][..]), Some(&mut [0u8; 32][..]), 0),
            Err(BcryptError::InvalidParameter)
        );
    });
}

#[test]
fn test_unaligned_input_without_padding() {
    bcrypt_test(|bcrypt| {
        let (_, key) = aes_key(bcrypt, BCRYPT_CHAIN_MODE_CBC, &[1u8; 16]);
        let result = bcrypt.encrypt(key, &[0u8; 20], None, None, None, 0);
        assert_eq!(result, Err(BcryptError::InvalidBufferSize));
        assert_eq!(to_status(&result), STATUS_INVALID_BUFFER_SIZE);
    });
}

#[test]
fn test_key_owns_its_mode() {
    bcrypt_test(|bcrypt| {
        let (alg, key) = aes_key(bcrypt, BCRYPT_CHAIN_MODE_CBC, &[2u8; 32]);
        set_mode(bcrypt, alg, BCRYPT_CHAIN_MODE_ECB).unwrap();
        assert_eq!(
            get_string(bcrypt, key, BCRYPT_CHAINING_MODE).as_deref(),
            Ok(BCRYPT_CHAIN_MODE_CBC)
        );
        assert_eq!(get_u32(bcrypt, key, BCRYPT_KEY_LENGTH), Ok(256));
        assert_eq!(get_u32(bcrypt, key, BCRYPT_BLOCK_LENGTH), Ok(16));
        assert_eq!(
            get_string(bcrypt, key, BCRYPT_ALGORITHM_NAME).as_deref(),
            Ok(BCRYPT_AES_ALGORITHM)
        );

        let copy = bcrypt.duplicate_key(key, 0).unwrap();
        set_mode(bcrypt, copy, BCRYPT_CHAIN_MODE_ECB).unwrap();
        assert_eq!(
            get_string(bcrypt, key, BCRYPT_CHAINING_MODE).as_deref(),
            Ok(BCRYPT_CHAIN_MODE_CBC)
        );

        // ECB equals CBC with a zero IV on a single block
        let block = [0x42u8; 16];
        assert_eq!(
            encrypt_all(bcrypt, copy, &block, None, 0),
            encrypt_all(bcrypt, key, &block, Some(&[0u8; 16]), 0)
        );

        assert!(bcrypt.destroy_key(key).is_ok());
        assert_eq!(
            bcrypt.encrypt(key, &block, None, None, None, 0),
            Err(BcryptError::InvalidHandle)
        );
        assert_eq!(encrypt_all(bcrypt, copy, &block, None, 0).len(), 16);
    });
}

#[test]
fn test_invalid_key_lengths() {
    bcrypt_test(|bcrypt| {
        let alg = open(bcrypt, BCRYPT_AES_ALGORITHM, 0);
        for len in [0usize, 8, 15, 17, 20, 33, 64] {
            assert_eq!(
                bcrypt.generate_symmetric_key(alg, &vec![0u8; len], 0),
                Err(BcryptError::InvalidParameter),
                "len {len}"
            );
        }
    });
}

#[test]
fn test_padded_decrypt_rejects_bad_padding() {
    bcrypt_test(|bcrypt| {
        let (_, key) = aes_key(bcrypt, BCRYPT_CHAIN_MODE_ECB, &[3u8; 16]);

        // a final block ending in 0x11 claims more padding than a block holds
        let mut block = [0u8; 16];
        block[15] = 0x11;
        let ciphertext = encrypt_all(bcrypt, key, &block, None, 0);
        assert_eq!(
            decrypt_all(bcrypt, key, &ciphertext, None, BCRYPT_BLOCK_PADDING),
            Err(BcryptError::InvalidPadding)
        );

        block[15] = 0;
        let ciphertext = encrypt_all(bcrypt, key, &block, None, 0);
        assert_eq!(
            decrypt_all(bcrypt, key, &ciphertext, None, BCRYPT_BLOCK_PADDING),
            Err(BcryptError::InvalidPadding)
        );

        block[14] = 0x01;
        block[15] = 0x02;
        let ciphertext = encrypt_all(bcrypt, key, &block, None, 0);
        assert_eq!(
            decrypt_all(bcrypt, key, &ciphertext, None, BCRYPT_BLOCK_PADDING),
            Err(BcryptError::InvalidPadding)
        );

        block[14] = 0x02;
        let ciphertext = encrypt_all(bcrypt, key, &block, None, 0);
        assert_eq!(
            decrypt_all(bcrypt, key, &ciphertext, None, BCRYPT_BLOCK_PADDING),
            Ok(block[..14].to_vec())
        );
    });
}

#[test]
fn test_gcm_detects_every_bit_flip() {
    bcrypt_test(|bcrypt| {
        let (_, key) = aes_key(bcrypt, BCRYPT_CHAIN_MODE_GCM, &[4u8; 16]);
        let nonce = [5u8; 12];
        let aad = b"gcm header";
        let plaintext = b"gcm protected body";

        let mut tag = [0u8; 16];
        let mut ciphertext = vec![0u8; plaintext.len()];
        let mut info = AuthInfo {
            nonce: Some(&nonce[..]),
            auth_data: Some(aad.as_slice()),
            tag: Some(&mut tag[..]),
            flags: 0,
        };
        let written = bcrypt
            .encrypt(key, plaintext, Some(&mut info), None, Some(&mut ciphertext), 0)
            .unwrap();
        assert_eq!(written, plaintext.len());

        let open_box = |ciphertext: &[u8], tag: &[u8]| {
            let mut tag = tag.to_vec();
            let mut out = vec![0u8; ciphertext.len()];
            let mut info = AuthInfo {
                nonce: Some(&nonce[..]),
                auth_data: Some(aad.as_slice()),
                tag: Some(tag.as_mut_slice()),
                flags: 0,
            };
            bcrypt
                .decrypt(key, ciphertext, Some(&mut info), None, Some(&mut out), 0)
                .map(|_| out)
        };
        assert_eq!(open_box(&ciphertext, &tag), Ok(plaintext.to_vec()));

        for bit in 0..ciphertext.len() * 8 {
            let mut flipped = ciphertext.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert_eq!(
                open_box(&flipped, &tag),
                Err(BcryptError::AuthTagMismatch),
                "ciphertext bit {bit}"
            );
        }
        for bit in 0..tag.len() * 8 {
            let mut flipped = tag;
            flipped[bit / 8] ^= 1 << (bit % 8);
            let result = open_box(&ciphertext, &flipped);
            assert_eq!(result, Err(BcryptError::AuthTagMismatch), "tag bit {bit}");
            assert_eq!(to_status(&result), STATUS_AUTH_TAG_MISMATCH);
        }
    });
}

#[test]
fn test_gcm_parameters() {
    bcrypt_test(|bcrypt| {
        let (alg, key) = aes_key(bcrypt, BCRYPT_CHAIN_MODE_GCM, &[6u8; 32]);
        let mut out = [0u8; 16];

        assert_eq!(
            bcrypt.encrypt(key, &[0u8; 16], None, None, Some(&mut out), 0),
            Err(BcryptError::InvalidParameter)
        );

        let mut tag = [0u8; 20];
        let mut info = AuthInfo {
            nonce: Some(&[0u8; 12][..]),
            tag: Some(&mut tag[..]),
            ..Default::default()
        };
        assert_eq!(
            bcrypt.encrypt(key, &[0u8; 16], Some(&mut info), None, Some(&mut out), 0),
            Err(BcryptError::NotSupported)
        );

        let mut lengths = [0u8; 12];
        bcrypt
            .get_property(alg, BCRYPT_AUTH_TAG_LENGTH, Some(&mut lengths), 0)
            .unwrap();
        assert_eq!(LengthRange::from_bytes(&lengths), Some(GCM_TAG_LENGTHS));
        bcrypt
            .get_property(key, BCRYPT_AUTH_TAG_LENGTH, Some(&mut lengths), 0)
            .unwrap();
        assert_eq!(LengthRange::from_bytes(&lengths), Some(GCM_TAG_LENGTHS));
    });
}

#[test]
fn test_key_blobs() {
    bcrypt_test(|bcrypt| {
        let secret = [7u8; 24];
        let (alg, key) = aes_key(bcrypt, BCRYPT_CHAIN_MODE_CBC, &secret);
        let iv = [8u8; 16];
        let expected = encrypt_all(bcrypt, key, b"blob round trip", Some(&iv), BCRYPT_BLOCK_PADDING);

        for blob_type in [BCRYPT_KEY_DATA_BLOB, BCRYPT_OPAQUE_KEY_BLOB] {
            let size = bcrypt.export_key(key, blob_type, None, 0).unwrap();
            let mut short = vec![0u8; size - 1];
            assert_eq!(
                bcrypt.export_key(key, blob_type, Some(&mut short), 0),
                Err(BcryptError::BufferTooSmall { required: size })
            );

            let mut blob = vec![0u8; size];
            assert_eq!(bcrypt.export_key(key, blob_type, Some(&mut blob), 0), Ok(size));
            assert_eq!(blob[size - 24..], secret);

            let imported = bcrypt.import_key(alg, blob_type, &blob, 0).unwrap();
            assert_eq!(
                encrypt_all(bcrypt, imported, b"blob round trip", Some(&iv), BCRYPT_BLOCK_PADDING),
                expected
            );
        }

        assert_eq!(
            bcrypt.export_key(key, "AESWrapKeyBlob", None, 0),
            Err(BcryptError::NotImplemented)
        );
        assert_eq!(
            bcrypt.import_key(alg, BCRYPT_KEY_DATA_BLOB, &[0u8; 12], 0),
            Err(BcryptError::InvalidParameter)
        );
    });
}
