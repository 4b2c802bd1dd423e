// Copyright (C) Microsoft Corporation. All rights reserved.

//! SHA-1 (FIPS 180-4). Kept for compatibility; not collision resistant.

use super::store_be_u32;
use super::BlockBuffer;
use super::DigestOp;

const BLOCK_LEN: usize = 64;

const INIT: [u32; 5] = [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476, 0xc3d2e1f0];

/// Streaming SHA-1 engine.
#[derive(Clone)]
pub struct Sha1 {
    state: [u32; 5],
    total_len: u64,
    buffer: BlockBuffer<BLOCK_LEN>,
}

impl Default for Sha1 {
    fn default() -> Self {
        Self {
            state: INIT,
            total_len: 0,
            buffer: BlockBuffer::default(),
        }
    }
}

impl DigestOp for Sha1 {
    const BLOCK_LEN: usize = BLOCK_LEN;
    const OUTPUT_LEN: usize = 20;

    fn update(&mut self, data: &[u8]) {
        self.total_len = self.total_len.wrapping_add(data.len() as u64);
        self.buffer.input(data, |block| compress(&mut self.state, block));
    }

    fn finalize_into(mut self, out: &mut [u8]) {
        let bit_len = self.total_len.wrapping_mul(8);
        self.buffer
            .finish(&bit_len.to_be_bytes(), |block| compress(&mut self.state, block));
        store_be_u32(&self.state, out);
    }
}

fn compress(state: &mut [u32; 5], block: &[u8; BLOCK_LEN]) {
    let mut w = [0u32; 80];
    for (word, chunk) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for t in 16..80 {
        w[t] = (w[t - 3] ^ w[t - 8] ^ w[t - 14] ^ w[t - 16]).rotate_left(1);
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;

    for (t, wt) in w.iter().enumerate() {
        let (f, k) = match t / 20 {
            0 => ((b & c) | (!b & d), 0x5a827999),
            1 => (b ^ c ^ d, 0x6ed9eba1),
            2 => ((b & c) | (b & d) | (c & d), 0x8f1bbcdc),
            _ => (b ^ c ^ d, 0xca62c1d6),
        };

        let temp = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(*wt);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = temp;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}
