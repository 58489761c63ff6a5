//! Skein 1.3, the UBI chaining mode over Threefish.
//!
//! Every input (key, configuration, personalization, public key, key
//! identifier, nonce, message, output counter) goes through its own UBI
//! pass, distinguished by the type field of the tweak.
use crate::error::{Error, Result};
use crate::threefish::{encrypt_words, expand_tweak, key_parity};
use crate::util::{words_from_le, words_to_le};
use crate::Mac;
use zeroize::{Zeroize, ZeroizeOnDrop};

// UBI types, stored in bits 120..125 of the tweak.
const TYPE_KEY: u64 = 0;
const TYPE_CFG: u64 = 4;
const TYPE_PRS: u64 = 8;
const TYPE_PK: u64 = 12;
const TYPE_KDF: u64 = 16;
const TYPE_NON: u64 = 20;
const TYPE_MSG: u64 = 48;
const TYPE_OUT: u64 = 63;

const FLAG_FIRST: u64 = 1 << 62;
const FLAG_FINAL: u64 = 1 << 63;

/// "SHA3", version 1, as the first word of the configuration block.
const SCHEMA: u64 = 0x0000_0001_3341_4853;

const MAX_BLOCK_SIZE: usize = 128;

/// Optional inputs absorbed before the message.
#[derive(Clone, Copy)]
pub struct Params<'a> {
    hash_size: usize,
    key: &'a [u8],
    personal: &'a [u8],
    public_key: &'a [u8],
    key_id: &'a [u8],
    nonce: &'a [u8],
}

impl<'a> Params<'a> {
    /// Parameters for a plain hash of `hash_size` bytes.
    pub fn new(hash_size: usize) -> Self {
        Self {
            hash_size,
            key: &[],
            personal: &[],
            public_key: &[],
            key_id: &[],
            nonce: &[],
        }
    }

    pub fn key(mut self, key: &'a [u8]) -> Self {
        self.key = key;
        self
    }

    pub fn personal(mut self, personal: &'a [u8]) -> Self {
        self.personal = personal;
        self
    }

    pub fn public_key(mut self, public_key: &'a [u8]) -> Self {
        self.public_key = public_key;
        self
    }

    pub fn key_id(mut self, key_id: &'a [u8]) -> Self {
        self.key_id = key_id;
        self
    }

    pub fn nonce(mut self, nonce: &'a [u8]) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn build<const W: usize>(&self) -> Result<Skein<W>> {
        Skein::with_params(self)
    }
}

/// Skein with an internal state of `W` 64-bit words.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Skein<const W: usize> {
    chain: [u64; W],
    /// `t0` and `t1`; the 96-bit position spans `t0` and the low half of `t1`.
    tweak: [u64; 2],
    buf: [u8; MAX_BLOCK_SIZE],
    off: usize,
    size: usize,
    init: [u64; W],
}

pub type Skein256 = Skein<4>;
pub type Skein512 = Skein<8>;
pub type Skein1024 = Skein<16>;

impl<const W: usize> Skein<W> {
    /// Internal state and block size in bytes.
    pub const BLOCK_SIZE: usize = W * 8;

    /// An unkeyed hasher producing `hash_size` bytes.
    pub fn new(hash_size: usize) -> Result<Self> {
        Self::with_params(&Params::new(hash_size))
    }

    /// A MAC producing `hash_size` bytes under `key`.
    pub fn new_keyed(hash_size: usize, key: &[u8]) -> Result<Self> {
        Self::with_params(&Params::new(hash_size).key(key))
    }

    pub fn with_params(params: &Params<'_>) -> Result<Self> {
        if !(W == 4 || W == 8 || W == 16) {
            return Err(Error::InvalidConfig("Skein block size must be 32, 64 or 128 bytes"));
        }
        if params.hash_size == 0 || params.hash_size > Self::BLOCK_SIZE {
            return Err(Error::InvalidConfig("hash size must be between 1 and the block size"));
        }

        let mut out = Self {
            chain: [0; W],
            tweak: [0; 2],
            buf: [0; MAX_BLOCK_SIZE],
            off: 0,
            size: params.hash_size,
            init: [0; W],
        };

        if !params.key.is_empty() {
            out.ubi(TYPE_KEY, params.key);
        }

        let mut cfg = [0u8; 32];
        cfg[..8].copy_from_slice(&SCHEMA.to_le_bytes());
        cfg[8..16].copy_from_slice(&((params.hash_size as u64) * 8).to_le_bytes());
        out.ubi(TYPE_CFG, &cfg);

        for (ty, data) in [
            (TYPE_PRS, params.personal),
            (TYPE_PK, params.public_key),
            (TYPE_KDF, params.key_id),
            (TYPE_NON, params.nonce),
        ] {
            if !data.is_empty() {
                out.ubi(ty, data);
            }
        }

        out.init = out.chain;
        out.start(TYPE_MSG);
        Ok(out)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn update(&mut self, data: &[u8]) {
        self.absorb(data);
    }

    /// Write the digest into `out`, which must be exactly [`Skein::size`] bytes.
    pub fn finalize_into(&self, out: &mut [u8]) {
        assert_eq!(out.len(), self.size, "output must be {} bytes", self.size);

        let mut state = self.clone();
        state.finish();
        let chain = state.chain;

        let mut block = [0u8; MAX_BLOCK_SIZE];
        for (i, chunk) in out.chunks_mut(Self::BLOCK_SIZE).enumerate() {
            state.chain = chain;
            state.ubi(TYPE_OUT, &(i as u64).to_le_bytes());
            words_to_le(&mut block[..Self::BLOCK_SIZE], &state.chain);
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
        block.zeroize();
    }

    pub fn reset(&mut self) {
        self.chain = self.init;
        self.buf = [0; MAX_BLOCK_SIZE];
        self.start(TYPE_MSG);
    }

    /// Begin a new UBI pass of type `ty` at position zero.
    fn start(&mut self, ty: u64) {
        self.tweak = [0, (ty << 56) | FLAG_FIRST];
        self.off = 0;
    }

    /// Run one full UBI pass over `data`.
    fn ubi(&mut self, ty: u64, data: &[u8]) {
        self.start(ty);
        self.absorb(data);
        self.finish();
    }

    /// Feed `data` through the current pass, always holding the last block back.
    fn absorb(&mut self, mut data: &[u8]) {
        let bs = Self::BLOCK_SIZE;
        if data.is_empty() {
            return;
        }
        let fill = bs - self.off;
        if data.len() > fill {
            self.buf[self.off..bs].copy_from_slice(&data[..fill]);
            let mut block = self.buf;
            self.process(&block[..bs], bs);
            block.zeroize();
            self.off = 0;
            data = &data[fill..];

            while data.len() > bs {
                self.process(&data[..bs], bs);
                data = &data[bs..];
            }
        }
        self.buf[self.off..self.off + data.len()].copy_from_slice(data);
        self.off += data.len();
    }

    /// Process the buffered tail as the last block of the current pass.
    fn finish(&mut self) {
        let bs = Self::BLOCK_SIZE;
        self.tweak[1] |= FLAG_FINAL;
        let mut block = self.buf;
        block[self.off..bs].fill(0);
        self.process(&block[..bs], self.off);
        block.zeroize();
        self.off = 0;
    }

    /// One Matyas-Meyer-Oseas step: `chain = E(chain, tweak, m) ^ m`.
    fn process(&mut self, block: &[u8], bytes: usize) {
        let (t0, carry) = self.tweak[0].overflowing_add(bytes as u64);
        self.tweak[0] = t0;
        self.tweak[1] = self.tweak[1].wrapping_add(carry as u64);

        let mut key = [0u64; MAX_BLOCK_SIZE / 8 + 1];
        key[..W].copy_from_slice(&self.chain);
        key[W] = key_parity(&self.chain);

        let mut m = [0u64; W];
        words_from_le(&mut m, block);
        let mut c = m;
        encrypt_words(&key[..W + 1], &expand_tweak(self.tweak[0], self.tweak[1]), &mut c);
        for (h, (c, m)) in self.chain.iter_mut().zip(c.iter().zip(&m)) {
            *h = c ^ m;
        }

        self.tweak[1] &= !FLAG_FIRST;
        key.zeroize();
        m.zeroize();
        c.zeroize();
    }
}

impl<const W: usize> Mac for Skein<W> {
    fn update(&mut self, data: &[u8]) {
        Skein::update(self, data)
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn finalize_into(&self, out: &mut [u8]) {
        Skein::finalize_into(self, out)
    }

    fn reset(&mut self) {
        Skein::reset(self)
    }
}

fn sum<const W: usize, const N: usize>(data: &[u8], key: Option<&[u8]>) -> Result<[u8; N]> {
    let mut h = Skein::<W>::with_params(&Params::new(N).key(key.unwrap_or(&[])))?;
    h.update(data);
    let mut out = [0u8; N];
    h.finalize_into(&mut out);
    Ok(out)
}

/// Skein-256-256 of `data`, keyed if `key` is given.
pub fn sum256(data: &[u8], key: Option<&[u8]>) -> Result<[u8; 32]> {
    sum::<4, 32>(data, key)
}

/// Skein-512-512 of `data`, keyed if `key` is given.
pub fn sum512(data: &[u8], key: Option<&[u8]>) -> Result<[u8; 64]> {
    sum::<8, 64>(data, key)
}

/// Skein-1024-1024 of `data`, keyed if `key` is given.
pub fn sum1024(data: &[u8], key: Option<&[u8]>) -> Result<[u8; 128]> {
    sum::<16, 128>(data, key)
}
