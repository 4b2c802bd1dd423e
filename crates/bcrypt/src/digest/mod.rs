// Copyright (C) Microsoft Corporation. All rights reserved.

//! Block-hash primitives used by the hash objects.
//!
//! Every primitive follows the same contract:
//!
//! - construction loads the algorithm's initial state and zeroes the byte
//!   counter,
//! - [`DigestOp::update`] appends bytes; feeding a message in any chunking
//!   yields the same digest as feeding it in one call,
//! - [`DigestOp::finalize_into`] applies the length padding and serializes
//!   the state. It consumes the primitive, so a finished engine can never be
//!   fed again.
//!
//! SHA-384 shares the SHA-512 compression function and differs only in its
//! initial state and output truncation.

mod md5;
mod sha1;
mod sha256;
mod sha512;

pub use md5::Md5;
pub use sha1::Sha1;
pub use sha256::Sha256;
pub use sha512::Sha384;
pub use sha512::Sha512;

/// Streaming digest primitive.
pub trait DigestOp: Clone + Default + Send {
    /// Compression-function block size in bytes.
    const BLOCK_LEN: usize;

    /// Digest size in bytes.
    const OUTPUT_LEN: usize;

    /// Appends `data` to the message.
    fn update(&mut self, data: &[u8]);

    /// Pads the message and writes the digest into `out`.
    ///
    /// At most [`Self::OUTPUT_LEN`] bytes are written; a shorter `out`
    /// receives a prefix of the digest.
    fn finalize_into(self, out: &mut [u8]);

    /// Pads the message and returns the digest as a vector.
    fn finalize_vec(self) -> Vec<u8> {
        let mut out = vec![0u8; Self::OUTPUT_LEN];
        self.finalize_into(&mut out);
        out
    }

    /// Hashes `data` in one call.
    fn digest(data: &[u8]) -> Vec<u8> {
        let mut engine = Self::default();
        engine.update(data);
        engine.finalize_vec()
    }
}

/// Pending partial block shared by all primitives.
///
/// Holds exactly `total_len % N` bytes between calls.
#[derive(Clone)]
pub(crate) struct BlockBuffer<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> Default for BlockBuffer<N> {
    fn default() -> Self {
        Self {
            buf: [0u8; N],
            len: 0,
        }
    }
}

impl<const N: usize> BlockBuffer<N> {
    /// Number of pending bytes.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.len
    }

    /// Feeds `data`, invoking `compress` for every completed block.
    ///
    /// A pending partial block is topped up first. Full blocks are then
    /// compressed straight from `data` and the tail is kept for later.
    pub(crate) fn input(&mut self, mut data: &[u8], mut compress: impl FnMut(&[u8; N])) {
        if self.len > 0 {
            let take = (N - self.len).min(data.len());
            self.buf[self.len..self.len + take].copy_from_slice(&data[..take]);
            self.len += take;
            data = &data[take..];
            if self.len < N {
                return;
            }
            compress(&self.buf);
            self.len = 0;
        }

        let mut blocks = data.chunks_exact(N);
        for block in &mut blocks {
            if let Ok(block) = <&[u8; N]>::try_from(block) {
                compress(block);
            }
        }

        let tail = blocks.remainder();
        self.buf[..tail.len()].copy_from_slice(tail);
        self.len = tail.len();
    }

    /// Appends `0x80`, zero fill and the encoded message length, compressing
    /// one or two final blocks.
    pub(crate) fn finish(&mut self, length: &[u8], mut compress: impl FnMut(&[u8; N])) {
        let pos = self.len;
        self.buf[pos] = 0x80;
        self.buf[pos + 1..].fill(0);

        let length_at = N - length.len();
        if pos + 1 > length_at {
            compress(&self.buf);
            self.buf.fill(0);
        }

        self.buf[length_at..].copy_from_slice(length);
        compress(&self.buf);
        self.len = 0;
    }
}

/// Writes `words` big-endian into `out`, stopping when `out` is full.
pub(crate) fn store_be_u32(words: &[u32], out: &mut [u8]) {
    let bytes = words.iter().flat_map(|w| w.to_be_bytes());
    out.iter_mut().zip(bytes).for_each(|(o, b)| *o = b);
}

/// Writes `words` big-endian into `out`, stopping when `out` is full.
pub(crate) fn store_be_u64(words: &[u64], out: &mut [u8]) {
    let bytes = words.iter().flat_map(|w| w.to_be_bytes());
    out.iter_mut().zip(bytes).for_each(|(o, b)| *o = b);
}

#[cfg(test)]
mod tests;
