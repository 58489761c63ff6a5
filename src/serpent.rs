//! The Serpent block cipher, in the bitslice formulation of the AES submission.
//!
//! Keys, plaintexts and ciphertexts are packed into 32-bit words in
//! little-endian order, which is the convention of the published test vectors.
use crate::error::{Error, Result};
use crate::util::{load_u32_le, store_u32_le};
use crate::BlockCipher;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const BLOCK_SIZE: usize = 16;

const PHI: u32 = 0x9E3779B9;
const ROUNDS: usize = 32;

const SBOX: [[u8; 16]; 8] = [
    [3, 8, 15, 1, 10, 6, 5, 11, 14, 13, 4, 2, 7, 0, 9, 12],
    [15, 12, 2, 7, 9, 0, 5, 10, 1, 11, 14, 8, 6, 13, 3, 4],
    [8, 6, 7, 9, 3, 12, 10, 15, 13, 1, 14, 4, 0, 11, 5, 2],
    [0, 15, 11, 8, 12, 9, 6, 3, 13, 1, 2, 4, 10, 7, 5, 14],
    [1, 15, 8, 3, 12, 0, 11, 6, 2, 5, 4, 10, 9, 14, 7, 13],
    [15, 5, 2, 11, 4, 10, 9, 12, 0, 3, 14, 8, 13, 6, 7, 1],
    [7, 2, 12, 5, 8, 4, 6, 11, 14, 9, 1, 15, 13, 3, 10, 0],
    [1, 13, 15, 0, 14, 8, 2, 11, 7, 4, 12, 10, 9, 3, 5, 6],
];

const fn invert(sboxes: &[[u8; 16]; 8]) -> [[u8; 16]; 8] {
    let mut out = [[0u8; 16]; 8];
    let mut i = 0;
    while i < 8 {
        let mut x = 0;
        while x < 16 {
            out[i][sboxes[i][x] as usize] = x as u8;
            x += 1;
        }
        i += 1;
    }
    out
}

const SBOX_INV: [[u8; 16]; 8] = invert(&SBOX);

type Block = [u32; 4];

/// Apply a 4-bit S-box to each of the 32 bit columns of `x`.
///
/// Word 0 carries the least significant bit of every nibble.
fn substitute(table: &[u8; 16], x: &mut Block) {
    let mut out = [0u32; 4];
    for j in 0..32 {
        let nibble = ((x[0] >> j) & 1)
            | (((x[1] >> j) & 1) << 1)
            | (((x[2] >> j) & 1) << 2)
            | (((x[3] >> j) & 1) << 3);
        let s = table[nibble as usize] as u32;
        for (bit, o) in out.iter_mut().enumerate() {
            *o |= ((s >> bit) & 1) << j;
        }
    }
    *x = out;
}

pub(crate) fn sbox(i: usize, x: &mut Block) {
    substitute(&SBOX[i], x)
}

pub(crate) fn sbox_inv(i: usize, x: &mut Block) {
    substitute(&SBOX_INV[i], x)
}

/// The linear transformation L.
pub(crate) fn linear(x: &mut Block) {
    x[0] = x[0].rotate_left(13);
    x[2] = x[2].rotate_left(3);
    x[1] ^= x[0] ^ x[2];
    x[3] ^= x[2] ^ (x[0] << 3);
    x[1] = x[1].rotate_left(1);
    x[3] = x[3].rotate_left(7);
    x[0] ^= x[1] ^ x[3];
    x[2] ^= x[3] ^ (x[1] << 7);
    x[0] = x[0].rotate_left(5);
    x[2] = x[2].rotate_left(22);
}

pub(crate) fn linear_inv(x: &mut Block) {
    x[2] = x[2].rotate_right(22);
    x[0] = x[0].rotate_right(5);
    x[2] ^= x[3] ^ (x[1] << 7);
    x[0] ^= x[1] ^ x[3];
    x[3] = x[3].rotate_right(7);
    x[1] = x[1].rotate_right(1);
    x[3] ^= x[2] ^ (x[0] << 3);
    x[1] ^= x[0] ^ x[2];
    x[2] = x[2].rotate_right(3);
    x[0] = x[0].rotate_right(13);
}

#[inline(always)]
fn add_key(x: &mut Block, k: &Block) {
    for (a, b) in x.iter_mut().zip(k) {
        *a ^= b;
    }
}

/// Serpent with a 128, 192 or 256-bit key.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Serpent {
    round_keys: [Block; ROUNDS + 1],
}

impl Serpent {
    pub fn new(key: &[u8]) -> Result<Self> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(Error::InvalidKeySize(key.len()));
        }

        // Short keys get a single 1 bit appended, then zeros.
        let mut padded = [0u8; 32];
        padded[..key.len()].copy_from_slice(key);
        if key.len() < 32 {
            padded[key.len()] = 1;
        }

        // w[0..8] are the prekey words w_{-8}..w_{-1}.
        let mut w = [0u32; 8 + 4 * (ROUNDS + 1)];
        for (word, chunk) in w.iter_mut().zip(padded.chunks_exact(4)) {
            *word = load_u32_le(chunk);
        }
        for i in 8..w.len() {
            w[i] = (w[i - 8] ^ w[i - 5] ^ w[i - 3] ^ w[i - 1] ^ PHI ^ (i - 8) as u32)
                .rotate_left(11);
        }

        let mut round_keys = [[0u32; 4]; ROUNDS + 1];
        for (i, k) in round_keys.iter_mut().enumerate() {
            k.copy_from_slice(&w[8 + 4 * i..12 + 4 * i]);
            sbox((ROUNDS + 3 - i) % 8, k);
        }

        padded.zeroize();
        w.zeroize();
        Ok(Self { round_keys })
    }

    pub fn encrypt_block(&self, block: &mut [u8]) {
        assert_eq!(block.len(), BLOCK_SIZE, "Serpent block must be 16 bytes");
        let mut x = load(block);
        for i in 0..ROUNDS - 1 {
            add_key(&mut x, &self.round_keys[i]);
            sbox(i % 8, &mut x);
            linear(&mut x);
        }
        add_key(&mut x, &self.round_keys[ROUNDS - 1]);
        sbox(7, &mut x);
        add_key(&mut x, &self.round_keys[ROUNDS]);
        store(block, &x);
        x.zeroize();
    }

    pub fn decrypt_block(&self, block: &mut [u8]) {
        assert_eq!(block.len(), BLOCK_SIZE, "Serpent block must be 16 bytes");
        let mut x = load(block);
        add_key(&mut x, &self.round_keys[ROUNDS]);
        sbox_inv(7, &mut x);
        add_key(&mut x, &self.round_keys[ROUNDS - 1]);
        for i in (0..ROUNDS - 1).rev() {
            linear_inv(&mut x);
            sbox_inv(i % 8, &mut x);
            add_key(&mut x, &self.round_keys[i]);
        }
        store(block, &x);
        x.zeroize();
    }
}

fn load(block: &[u8]) -> Block {
    [
        load_u32_le(&block[0..]),
        load_u32_le(&block[4..]),
        load_u32_le(&block[8..]),
        load_u32_le(&block[12..]),
    ]
}

fn store(block: &mut [u8], x: &Block) {
    for (chunk, w) in block.chunks_exact_mut(4).zip(x) {
        store_u32_le(chunk, *w);
    }
}

impl BlockCipher for Serpent {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        Serpent::encrypt_block(self, block)
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        Serpent::decrypt_block(self, block)
    }
}
