// Copyright (C) Microsoft Corporation. All rights reserved.

//! PKCS#7 block padding.

use zeroize::Zeroizing;

use crate::error::*;

/// Length of `len` bytes once padded to `block_size`, which must be a power
/// of two. Aligned input gains a full pad block.
pub(crate) fn padded_len(len: usize, block_size: usize) -> usize {
    (len + block_size) & !(block_size - 1)
}

/// Builds the final block from the unaligned `tail`.
pub(crate) fn pad_block(tail: &[u8], block_size: usize) -> Zeroizing<Vec<u8>> {
    let pad = block_size - tail.len();
    let mut block = Zeroizing::new(vec![pad as u8; block_size]);
    block[..tail.len()].copy_from_slice(tail);
    block
}

/// Number of pad bytes at the end of a decrypted final `block`.
pub(crate) fn pad_len(block: &[u8]) -> BcryptResult<usize> {
    let Some(&last) = block.last() else {
        return Err(BcryptError::InvalidPadding);
    };

    let pad = usize::from(last);
    if pad == 0 || pad > block.len() {
        tracing::error!(pad, block_size = block.len(), "Pad length out of range");
        Err(BcryptError::InvalidPadding)?;
    }

    let mismatch = block[block.len() - pad..]
        .iter()
        .fold(0u8, |acc, b| acc | (b ^ last));
    if mismatch != 0 {
        tracing::error!(pad, "Pad bytes are not uniform");
        Err(BcryptError::InvalidPadding)?;
    }
    Ok(pad)
}
