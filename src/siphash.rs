//! SipHash-2-4, a keyed 64-bit PRF.
use crate::error::{Error, Result};
use crate::util::{check_tag, load_u64_le};
use crate::Mac;
use core::hash::Hasher;
use zeroize::ZeroizeOnDrop;

pub const KEY_SIZE: usize = 16;
pub const OUTPUT_SIZE: usize = 8;

const C_ROUNDS: usize = 2;
const D_ROUNDS: usize = 4;

#[inline(always)]
fn sip_round(v: &mut [u64; 4]) {
    v[0] = v[0].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(13);
    v[1] ^= v[0];
    v[0] = v[0].rotate_left(32);
    v[2] = v[2].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(16);
    v[3] ^= v[2];
    v[0] = v[0].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(21);
    v[3] ^= v[0];
    v[2] = v[2].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(17);
    v[1] ^= v[2];
    v[2] = v[2].rotate_left(32);
}

#[inline(always)]
fn compress(v: &mut [u64; 4], m: u64) {
    v[3] ^= m;
    for _ in 0..C_ROUNDS {
        sip_round(v);
    }
    v[0] ^= m;
}

#[derive(Clone, ZeroizeOnDrop)]
pub struct SipHash {
    k0: u64,
    k1: u64,
    v: [u64; 4],
    buf: [u8; 8],
    off: usize,
    /// Message length mod 256.
    len: u8,
}

impl SipHash {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(Error::InvalidKeySize(key.len()));
        }
        let mut out = Self {
            k0: load_u64_le(&key[..8]),
            k1: load_u64_le(&key[8..]),
            v: [0; 4],
            buf: [0; 8],
            off: 0,
            len: 0,
        };
        out.reset();
        Ok(out)
    }

    pub fn reset(&mut self) {
        self.v = [
            self.k0 ^ 0x736f6d6570736575,
            self.k1 ^ 0x646f72616e646f6d,
            self.k0 ^ 0x6c7967656e657261,
            self.k1 ^ 0x7465646279746573,
        ];
        self.buf = [0; 8];
        self.off = 0;
        self.len = 0;
    }

    pub fn update(&mut self, mut data: &[u8]) {
        self.len = self.len.wrapping_add(data.len() as u8);

        if self.off > 0 {
            let n = data.len().min(8 - self.off);
            self.buf[self.off..self.off + n].copy_from_slice(&data[..n]);
            self.off += n;
            data = &data[n..];
            if self.off < 8 {
                return;
            }
            compress(&mut self.v, u64::from_le_bytes(self.buf));
            self.off = 0;
        }

        let mut words = data.chunks_exact(8);
        for m in &mut words {
            compress(&mut self.v, load_u64_le(m));
        }
        let rest = words.remainder();
        self.buf[..rest.len()].copy_from_slice(rest);
        self.off = rest.len();
    }

    /// The 64-bit hash of everything absorbed so far.
    pub fn sum64(&self) -> u64 {
        let mut v = self.v;
        let mut last = [0u8; 8];
        last[..self.off].copy_from_slice(&self.buf[..self.off]);
        last[7] = self.len;
        compress(&mut v, u64::from_le_bytes(last));

        v[2] ^= 0xff;
        for _ in 0..D_ROUNDS {
            sip_round(&mut v);
        }
        v[0] ^ v[1] ^ v[2] ^ v[3]
    }

    pub fn finalize_into(&self, out: &mut [u8]) {
        assert_eq!(out.len(), OUTPUT_SIZE, "SipHash output is 8 bytes");
        out.copy_from_slice(&self.sum64().to_le_bytes());
    }

    pub fn verify(&self, tag: &[u8]) -> Result<()> {
        check_tag(&self.sum64().to_le_bytes(), tag)
    }
}

impl Hasher for SipHash {
    fn write(&mut self, bytes: &[u8]) {
        self.update(bytes)
    }

    fn finish(&self) -> u64 {
        self.sum64()
    }
}

impl Mac for SipHash {
    fn update(&mut self, data: &[u8]) {
        SipHash::update(self, data)
    }

    fn output_size(&self) -> usize {
        OUTPUT_SIZE
    }

    fn finalize_into(&self, out: &mut [u8]) {
        SipHash::finalize_into(self, out)
    }

    fn reset(&mut self) {
        SipHash::reset(self)
    }
}

/// SipHash-2-4 of `msg` under a 16-byte `key`.
pub fn sum64(key: &[u8], msg: &[u8]) -> Result<u64> {
    let mut h = SipHash::new(key)?;
    h.update(msg);
    Ok(h.sum64())
}
