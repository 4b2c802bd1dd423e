// Copyright (C) Microsoft Corporation. All rights reserved.



pub(crate) use testvectors::*;

use super::*;

/// Known-answer vector for a digest primitive.
pub struct DigestTestVector {
    pub msg: &'static [u8],
    pub md: &'static str,
}

pub(crate) fn check_vectors<D: DigestOp>(vectors: &[DigestTestVector]) {
    for vector in vectors {
        let actual = D::digest(vector.msg);
        assert_eq!(
            hex::encode(&actual),
            vector.md,
            "digest mismatch for message {:?}",
            String::from_utf8_lossy(vector.msg)
        );
    }
}
