//! The Poly1305 one-time authenticator (RFC 7539, section 2.5).
//!
//! A key must authenticate exactly one message. [`Poly1305`] therefore has no
//! reset and is consumed by [`Poly1305::finalize`].
use crate::error::{Error, Result};
use crate::util::{check_tag, load_u32_le, store_u32_le};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_SIZE: usize = 32;
pub const BLOCK_SIZE: usize = 16;
pub const TAG_SIZE: usize = 16;

const MASK26: u32 = 0x3ff_ffff;

/// A running Poly1305 computation.
#[derive(ZeroizeOnDrop)]
pub struct Poly1305 {
    /// Clamped `r` in five 26-bit limbs.
    r: [u32; 5],
    /// Accumulator in five 26-bit limbs.
    h: [u32; 5],
    /// `s`, the second key half.
    pad: [u32; 4],
    buf: [u8; BLOCK_SIZE],
    off: usize,
}

impl Poly1305 {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(Error::InvalidKeySize(key.len()));
        }

        let r0 = load_u32_le(&key[0..]) & 0x0fff_ffff;
        let r1 = load_u32_le(&key[4..]) & 0x0fff_fffc;
        let r2 = load_u32_le(&key[8..]) & 0x0fff_fffc;
        let r3 = load_u32_le(&key[12..]) & 0x0fff_fffc;

        Ok(Self {
            r: [
                r0 & MASK26,
                ((r0 >> 26) | (r1 << 6)) & MASK26,
                ((r1 >> 20) | (r2 << 12)) & MASK26,
                ((r2 >> 14) | (r3 << 18)) & MASK26,
                r3 >> 8,
            ],
            h: [0; 5],
            pad: [
                load_u32_le(&key[16..]),
                load_u32_le(&key[20..]),
                load_u32_le(&key[24..]),
                load_u32_le(&key[28..]),
            ],
            buf: [0; BLOCK_SIZE],
            off: 0,
        })
    }

    /// `h = (h + m) * r mod 2^130 - 5`, where `hibit` is the bit above the 16 message bytes.
    fn block(&mut self, m: &[u8], hibit: u32) {
        let t0 = load_u32_le(&m[0..]);
        let t1 = load_u32_le(&m[4..]);
        let t2 = load_u32_le(&m[8..]);
        let t3 = load_u32_le(&m[12..]);

        let h0 = (self.h[0] + (t0 & MASK26)) as u64;
        let h1 = (self.h[1] + (((t0 >> 26) | (t1 << 6)) & MASK26)) as u64;
        let h2 = (self.h[2] + (((t1 >> 20) | (t2 << 12)) & MASK26)) as u64;
        let h3 = (self.h[3] + (((t2 >> 14) | (t3 << 18)) & MASK26)) as u64;
        let h4 = (self.h[4] + ((t3 >> 8) | hibit)) as u64;

        let [r0, r1, r2, r3, r4] = self.r.map(|r| r as u64);
        let (s1, s2, s3, s4) = (r1 * 5, r2 * 5, r3 * 5, r4 * 5);

        let d0 = h0 * r0 + h1 * s4 + h2 * s3 + h3 * s2 + h4 * s1;
        let mut d1 = h0 * r1 + h1 * r0 + h2 * s4 + h3 * s3 + h4 * s2;
        let mut d2 = h0 * r2 + h1 * r1 + h2 * r0 + h3 * s4 + h4 * s3;
        let mut d3 = h0 * r3 + h1 * r2 + h2 * r1 + h3 * r0 + h4 * s4;
        let mut d4 = h0 * r4 + h1 * r3 + h2 * r2 + h3 * r1 + h4 * r0;

        d1 += d0 >> 26;
        d2 += d1 >> 26;
        d3 += d2 >> 26;
        d4 += d3 >> 26;
        let mut h0 = (d0 as u32) & MASK26;
        let h1 = (d1 as u32) & MASK26;
        let h2 = (d2 as u32) & MASK26;
        let h3 = (d3 as u32) & MASK26;
        let h4 = (d4 as u32) & MASK26;
        h0 += ((d4 >> 26) * 5) as u32;
        let h1 = h1 + (h0 >> 26);
        h0 &= MASK26;

        self.h = [h0, h1, h2, h3, h4];
    }

    pub fn update(&mut self, mut data: &[u8]) {
        if self.off > 0 {
            let n = data.len().min(BLOCK_SIZE - self.off);
            self.buf[self.off..self.off + n].copy_from_slice(&data[..n]);
            self.off += n;
            data = &data[n..];
            if self.off < BLOCK_SIZE {
                return;
            }
            let block = self.buf;
            self.block(&block, 1 << 24);
            self.off = 0;
        }

        let mut blocks = data.chunks_exact(BLOCK_SIZE);
        for m in &mut blocks {
            self.block(m, 1 << 24);
        }
        let rest = blocks.remainder();
        self.buf[..rest.len()].copy_from_slice(rest);
        self.off = rest.len();
    }

    /// Produce the tag, consuming the one-time key.
    pub fn finalize(mut self) -> [u8; TAG_SIZE] {
        if self.off > 0 {
            let mut block = [0u8; BLOCK_SIZE];
            block[..self.off].copy_from_slice(&self.buf[..self.off]);
            block[self.off] = 1;
            self.block(&block, 0);
            block.zeroize();
        }

        let mut h = self.h;
        // Full carry propagation.
        let mut c = h[1] >> 26;
        h[1] &= MASK26;
        for i in 2..5 {
            h[i] += c;
            c = h[i] >> 26;
            h[i] &= MASK26;
        }
        h[0] += c * 5;
        c = h[0] >> 26;
        h[0] &= MASK26;
        h[1] += c;

        // g = h + 5 - 2^130; keep it iff the subtraction did not borrow.
        let mut g = [0u32; 5];
        c = 5;
        for i in 0..5 {
            g[i] = h[i] + c;
            c = g[i] >> 26;
            g[i] &= MASK26;
        }
        let mask = 0u32.wrapping_sub(c);
        for (hi, gi) in h.iter_mut().zip(&g) {
            *hi = (*hi & !mask) | (gi & mask);
        }

        let words = [
            h[0] | (h[1] << 26),
            (h[1] >> 6) | (h[2] << 20),
            (h[2] >> 12) | (h[3] << 14),
            (h[3] >> 18) | (h[4] << 8),
        ];

        let mut tag = [0u8; TAG_SIZE];
        let mut carry = 0u64;
        for (i, chunk) in tag.chunks_exact_mut(4).enumerate() {
            carry += words[i] as u64 + self.pad[i] as u64;
            store_u32_le(chunk, carry as u32);
            carry >>= 32;
        }

        h.zeroize();
        g.zeroize();
        tag
    }

    /// Check the tag in constant time, consuming the one-time key.
    pub fn verify(self, tag: &[u8]) -> Result<()> {
        let expected = self.finalize();
        check_tag(&expected, tag)
    }
}

/// The Poly1305 tag of `msg` under the one-time `key`.
pub fn sum(key: &[u8], msg: &[u8]) -> Result<[u8; TAG_SIZE]> {
    let mut p = Poly1305::new(key)?;
    p.update(msg);
    Ok(p.finalize())
}

/// Check that `tag` authenticates `msg` under the one-time `key`.
pub fn verify(key: &[u8], msg: &[u8], tag: &[u8]) -> Result<()> {
    let mut p = Poly1305::new(key)?;
    p.update(msg);
    p.verify(tag)
}
