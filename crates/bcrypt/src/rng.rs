// Copyright (C) Microsoft Corporation. All rights reserved.

//! Host random source behind GenRandom.

use crate::error::*;

cfg_if::cfg_if! {
    if #[cfg(feature = "openssl")] {
        /// Fills `buf` from OpenSSL's CSPRNG.
        pub(crate) fn rand_bytes(buf: &mut [u8]) -> BcryptResult<()> {
            openssl::rand::rand_bytes(buf).map_bcrypt_err(BcryptError::InternalError)
        }
    } else {
        pub(crate) fn rand_bytes(buf: &mut [u8]) -> BcryptResult<()> {
            tracing::warn!(len = buf.len(), "No random source available");
            Err(BcryptError::NotImplemented)
        }
    }
}

#[cfg(all(test, feature = "openssl"))]
mod tests {
    use super::*;

    #[test]
    fn test_fills_buffer() {
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        rand_bytes(&mut a).expect("rand");
        rand_bytes(&mut b).expect("rand");
        assert_ne!(a, [0u8; 64]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(rand_bytes(&mut []), Ok(()));
    }
}
