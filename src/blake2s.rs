//! BLAKE2s, as described in RFC 7693.
//!
//! Personalization is limited to 8 bytes, the width of its slot in the
//! parameter block.
use crate::blake2b::SIGMA;
use crate::error::{Error, Result};
use crate::util::{load_u32_le, store_u32_le};
use crate::Mac;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const BLOCK_SIZE: usize = 64;
pub const MAX_HASH_SIZE: usize = 32;
pub const MAX_KEY_SIZE: usize = 32;
pub const SALT_SIZE: usize = 8;
pub const PERSONAL_SIZE: usize = 8;

const IV: [u32; 8] = [
    0x6A09E667, 0xBB67AE85, 0x3C6EF372, 0xA54FF53A, 0x510E527F, 0x9B05688C, 0x1F83D9AB, 0x5BE0CD19,
];

const ROUNDS: usize = 10;

#[inline(always)]
fn g(v: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize, x: u32, y: u32) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(12);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(8);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(7);
}

fn compress(h: &mut [u32; 8], t: u64, block: &[u8], last: bool) {
    let mut m = [0u32; 16];
    for (w, chunk) in m.iter_mut().zip(block.chunks_exact(4)) {
        *w = load_u32_le(chunk);
    }

    let mut v = [0u32; 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&IV);
    v[12] ^= t as u32;
    v[13] ^= (t >> 32) as u32;
    if last {
        v[14] ^= u32::MAX;
    }

    for s in SIGMA.iter().take(ROUNDS) {
        g(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
        g(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
        g(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
        g(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
        g(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
        g(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
        g(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
        g(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
    m.zeroize();
    v.zeroize();
}

/// Configuration for a [`Blake2s`] instance.
#[derive(Clone, Copy)]
pub struct Params<'a> {
    hash_size: usize,
    key: &'a [u8],
    salt: &'a [u8],
    personal: &'a [u8],
}

impl Default for Params<'_> {
    fn default() -> Self {
        Self {
            hash_size: MAX_HASH_SIZE,
            key: &[],
            salt: &[],
            personal: &[],
        }
    }
}

impl<'a> Params<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_size(mut self, size: usize) -> Self {
        self.hash_size = size;
        self
    }

    pub fn key(mut self, key: &'a [u8]) -> Self {
        self.key = key;
        self
    }

    pub fn salt(mut self, salt: &'a [u8]) -> Self {
        self.salt = salt;
        self
    }

    pub fn personal(mut self, personal: &'a [u8]) -> Self {
        self.personal = personal;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.hash_size == 0 || self.hash_size > MAX_HASH_SIZE {
            return Err(Error::InvalidConfig("hash size must be between 1 and 32"));
        }
        if self.key.len() > MAX_KEY_SIZE {
            return Err(Error::InvalidKeySize(self.key.len()));
        }
        if self.salt.len() > SALT_SIZE {
            return Err(Error::InvalidConfig("salt longer than 8 bytes"));
        }
        if self.personal.len() > PERSONAL_SIZE {
            return Err(Error::InvalidConfig("personalization longer than 8 bytes"));
        }
        Ok(())
    }

    fn block(&self) -> [u8; 32] {
        let mut p = [0u8; 32];
        p[0] = self.hash_size as u8;
        p[1] = self.key.len() as u8;
        p[2] = 1;
        p[3] = 1;
        p[16..16 + self.salt.len()].copy_from_slice(self.salt);
        p[24..24 + self.personal.len()].copy_from_slice(self.personal);
        p
    }

    pub fn build(&self) -> Result<Blake2s> {
        self.validate()?;

        let p = self.block();
        let mut init = IV;
        for (h, chunk) in init.iter_mut().zip(p.chunks_exact(4)) {
            *h ^= load_u32_le(chunk);
        }

        let mut key_block = [0u8; BLOCK_SIZE];
        key_block[..self.key.len()].copy_from_slice(self.key);

        let mut out = Blake2s {
            h: init,
            t: 0,
            buf: [0; BLOCK_SIZE],
            off: 0,
            size: self.hash_size,
            key_block,
            keyed: !self.key.is_empty(),
            init,
        };
        out.reset();
        Ok(out)
    }
}

/// An incremental BLAKE2s hasher, optionally keyed.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Blake2s {
    h: [u32; 8],
    t: u64,
    buf: [u8; BLOCK_SIZE],
    off: usize,
    size: usize,
    key_block: [u8; BLOCK_SIZE],
    keyed: bool,
    init: [u32; 8],
}

impl Blake2s {
    pub fn new(hash_size: usize) -> Result<Self> {
        Params::new().hash_size(hash_size).build()
    }

    pub fn new_keyed(hash_size: usize, key: &[u8]) -> Result<Self> {
        Params::new().hash_size(hash_size).key(key).build()
    }

    pub fn update(&mut self, mut data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let fill = BLOCK_SIZE - self.off;
        if data.len() > fill {
            self.buf[self.off..].copy_from_slice(&data[..fill]);
            self.t = self.t.wrapping_add(BLOCK_SIZE as u64);
            compress(&mut self.h, self.t, &self.buf, false);
            self.off = 0;
            data = &data[fill..];

            while data.len() > BLOCK_SIZE {
                self.t = self.t.wrapping_add(BLOCK_SIZE as u64);
                compress(&mut self.h, self.t, &data[..BLOCK_SIZE], false);
                data = &data[BLOCK_SIZE..];
            }
        }
        self.buf[self.off..self.off + data.len()].copy_from_slice(data);
        self.off += data.len();
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Write the digest into `out`, which must be exactly [`Blake2s::size`] bytes.
    pub fn finalize_into(&self, out: &mut [u8]) {
        assert_eq!(out.len(), self.size, "output must be {} bytes", self.size);

        let mut h = self.h;
        let t = self.t.wrapping_add(self.off as u64);
        let mut block = self.buf;
        block[self.off..].fill(0);
        compress(&mut h, t, &block, true);

        let mut full = [0u8; 32];
        for (chunk, word) in full.chunks_exact_mut(4).zip(&h) {
            store_u32_le(chunk, *word);
        }
        out.copy_from_slice(&full[..self.size]);

        h.zeroize();
        block.zeroize();
        full.zeroize();
    }

    pub fn reset(&mut self) {
        self.h = self.init;
        self.t = 0;
        if self.keyed {
            self.buf = self.key_block;
            self.off = BLOCK_SIZE;
        } else {
            self.buf = [0; BLOCK_SIZE];
            self.off = 0;
        }
    }
}

impl Mac for Blake2s {
    fn update(&mut self, data: &[u8]) {
        Blake2s::update(self, data)
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn finalize_into(&self, out: &mut [u8]) {
        Blake2s::finalize_into(self, out)
    }

    fn reset(&mut self) {
        Blake2s::reset(self)
    }
}

fn sum<const N: usize>(data: &[u8], key: Option<&[u8]>) -> Result<[u8; N]> {
    let mut h = Params::new()
        .hash_size(N)
        .key(key.unwrap_or(&[]))
        .build()?;
    h.update(data);
    let mut out = [0u8; N];
    h.finalize_into(&mut out);
    Ok(out)
}

/// BLAKE2s-256 of `data`, keyed if `key` is given.
pub fn sum256(data: &[u8], key: Option<&[u8]>) -> Result<[u8; 32]> {
    sum(data, key)
}

/// BLAKE2s-160 of `data`, keyed if `key` is given.
pub fn sum160(data: &[u8], key: Option<&[u8]>) -> Result<[u8; 20]> {
    sum(data, key)
}
