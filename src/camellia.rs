//! The Camellia block cipher, RFC 3713.
//!
//! The F function is evaluated on two 32-bit halves with four byte-spread
//! S-box tables, built at compile time from SBOX1.
use crate::error::{Error, Result};
use crate::util::{load_u32_be, store_u32_be};
use crate::BlockCipher;
use zeroize::ZeroizeOnDrop;

pub const BLOCK_SIZE: usize = 16;

const SIGMA: [u64; 6] = [
    0xA09E667F3BCC908B,
    0xB67AE8584CAA73B2,
    0xC6EF372FE94F82BE,
    0x54FF53A5F1D36F1C,
    0x10E527FADE682D1D,
    0xB05688C2B3E6C1FD,
];

const SBOX1: [u8; 256] = [
    112, 130, 44, 236, 179, 39, 192, 229, 228, 133, 87, 53, 234, 12, 174, 65,
    35, 239, 107, 147, 69, 25, 165, 33, 237, 14, 79, 78, 29, 101, 146, 189,
    134, 184, 175, 143, 124, 235, 31, 206, 62, 48, 220, 95, 94, 197, 11, 26,
    166, 225, 57, 202, 213, 71, 93, 61, 217, 1, 90, 214, 81, 86, 108, 77,
    139, 13, 154, 102, 251, 204, 176, 45, 116, 18, 43, 32, 240, 177, 132, 153,
    223, 76, 203, 194, 52, 126, 118, 5, 109, 183, 169, 49, 209, 23, 4, 215,
    20, 88, 58, 97, 222, 27, 17, 28, 50, 15, 156, 22, 83, 24, 242, 34,
    254, 68, 207, 178, 195, 181, 122, 145, 36, 8, 232, 168, 96, 252, 105, 80,
    170, 208, 160, 125, 161, 137, 98, 151, 84, 91, 30, 149, 224, 255, 100, 210,
    16, 196, 0, 72, 163, 247, 117, 219, 138, 3, 230, 218, 9, 63, 221, 148,
    135, 92, 131, 2, 205, 74, 144, 51, 115, 103, 246, 243, 157, 127, 191, 226,
    82, 155, 216, 38, 200, 55, 198, 59, 129, 150, 111, 75, 19, 190, 99, 46,
    233, 121, 167, 140, 159, 110, 188, 142, 41, 245, 249, 182, 47, 253, 180, 89,
    120, 152, 6, 106, 231, 70, 113, 186, 212, 37, 171, 66, 136, 162, 141, 250,
    114, 7, 185, 85, 248, 238, 172, 10, 54, 73, 42, 104, 60, 56, 241, 164,
    64, 40, 211, 123, 187, 201, 67, 193, 21, 227, 173, 244, 119, 199, 128, 158,
];

/// The four S-box tables, spread across the byte lanes that each one feeds
/// in the left half of the P function output.
struct Tables {
    sbox1_1110: [u32; 256],
    sbox2_0222: [u32; 256],
    sbox3_3033: [u32; 256],
    sbox4_4404: [u32; 256],
}

const fn build_tables() -> Tables {
    let mut t = Tables {
        sbox1_1110: [0; 256],
        sbox2_0222: [0; 256],
        sbox3_3033: [0; 256],
        sbox4_4404: [0; 256],
    };
    let mut x = 0;
    while x < 256 {
        let s1 = SBOX1[x] as u32;
        let s2 = SBOX1[x].rotate_left(1) as u32;
        let s3 = SBOX1[x].rotate_left(7) as u32;
        let s4 = SBOX1[(x as u8).rotate_left(1) as usize] as u32;
        t.sbox1_1110[x] = (s1 << 24) | (s1 << 16) | (s1 << 8);
        t.sbox2_0222[x] = (s2 << 16) | (s2 << 8) | s2;
        t.sbox3_3033[x] = (s3 << 24) | (s3 << 8) | s3;
        t.sbox4_4404[x] = (s4 << 24) | (s4 << 16) | s4;
        x += 1;
    }
    t
}

static TABLES: Tables = build_tables();

/// F(x, k): S-box layer then P, on a 64-bit half block.
fn f(x: u64, k: u64) -> u64 {
    let x = x ^ k;
    let l = (x >> 32) as u32;
    let r = x as u32;
    let t = &TABLES;
    let u = t.sbox1_1110[(l >> 24) as usize]
        ^ t.sbox2_0222[((l >> 16) & 0xff) as usize]
        ^ t.sbox3_3033[((l >> 8) & 0xff) as usize]
        ^ t.sbox4_4404[(l & 0xff) as usize];
    let d = t.sbox2_0222[(r >> 24) as usize]
        ^ t.sbox3_3033[((r >> 16) & 0xff) as usize]
        ^ t.sbox4_4404[((r >> 8) & 0xff) as usize]
        ^ t.sbox1_1110[(r & 0xff) as usize];
    let yl = u ^ d;
    let yr = yl ^ u.rotate_right(8);
    ((yl as u64) << 32) | yr as u64
}

fn fl(x: u64, k: u64) -> u64 {
    let (mut x1, mut x2) = ((x >> 32) as u32, x as u32);
    let (k1, k2) = ((k >> 32) as u32, k as u32);
    x2 ^= (x1 & k1).rotate_left(1);
    x1 ^= x2 | k2;
    ((x1 as u64) << 32) | x2 as u64
}

fn fl_inv(y: u64, k: u64) -> u64 {
    let (mut y1, mut y2) = ((y >> 32) as u32, y as u32);
    let (k1, k2) = ((k >> 32) as u32, k as u32);
    y1 ^= y2 | k2;
    y2 ^= (y1 & k1).rotate_left(1);
    ((y1 as u64) << 32) | y2 as u64
}

#[inline(always)]
fn hi(x: u128) -> u64 {
    (x >> 64) as u64
}

#[inline(always)]
fn lo(x: u128) -> u64 {
    x as u64
}

/// Camellia with a 128, 192 or 256-bit key.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Camellia {
    kw: [u64; 4],
    k: [u64; 24],
    ke: [u64; 6],
    /// Number of 6-round groups: 3 for 128-bit keys, 4 otherwise.
    groups: usize,
}

impl Camellia {
    pub fn new(key: &[u8]) -> Result<Self> {
        let (kl, kr) = match key.len() {
            16 => (u128::from_be_bytes(to_16(&key[..16])), 0),
            24 => {
                let right = u64::from_be_bytes(to_8(&key[16..24]));
                (
                    u128::from_be_bytes(to_16(&key[..16])),
                    ((right as u128) << 64) | (!right) as u128,
                )
            }
            32 => (
                u128::from_be_bytes(to_16(&key[..16])),
                u128::from_be_bytes(to_16(&key[16..32])),
            ),
            n => return Err(Error::InvalidKeySize(n)),
        };

        let mut d1 = hi(kl ^ kr);
        let mut d2 = lo(kl ^ kr);
        d2 ^= f(d1, SIGMA[0]);
        d1 ^= f(d2, SIGMA[1]);
        d1 ^= hi(kl);
        d2 ^= lo(kl);
        d2 ^= f(d1, SIGMA[2]);
        d1 ^= f(d2, SIGMA[3]);
        let ka = ((d1 as u128) << 64) | d2 as u128;

        let mut out = Self {
            kw: [0; 4],
            k: [0; 24],
            ke: [0; 6],
            groups: 3,
        };

        if key.len() == 16 {
            let l = |n: u32| kl.rotate_left(n);
            let a = |n: u32| ka.rotate_left(n);
            out.kw = [hi(kl), lo(kl), hi(a(111)), lo(a(111))];
            out.k[..18].copy_from_slice(&[
                hi(ka),
                lo(ka),
                hi(l(15)),
                lo(l(15)),
                hi(a(15)),
                lo(a(15)),
                hi(l(45)),
                lo(l(45)),
                hi(a(45)),
                lo(l(60)),
                hi(a(60)),
                lo(a(60)),
                hi(l(94)),
                lo(l(94)),
                hi(a(94)),
                lo(a(94)),
                hi(l(111)),
                lo(l(111)),
            ]);
            out.ke[..4].copy_from_slice(&[hi(a(30)), lo(a(30)), hi(l(77)), lo(l(77))]);
        } else {
            let mut d1 = hi(ka ^ kr);
            let mut d2 = lo(ka ^ kr);
            d2 ^= f(d1, SIGMA[4]);
            d1 ^= f(d2, SIGMA[5]);
            let kb = ((d1 as u128) << 64) | d2 as u128;

            let l = |n: u32| kl.rotate_left(n);
            let r = |n: u32| kr.rotate_left(n);
            let a = |n: u32| ka.rotate_left(n);
            let b = |n: u32| kb.rotate_left(n);
            out.groups = 4;
            out.kw = [hi(kl), lo(kl), hi(b(111)), lo(b(111))];
            out.k = [
                hi(kb),
                lo(kb),
                hi(r(15)),
                lo(r(15)),
                hi(a(15)),
                lo(a(15)),
                hi(b(30)),
                lo(b(30)),
                hi(l(45)),
                lo(l(45)),
                hi(a(45)),
                lo(a(45)),
                hi(r(60)),
                lo(r(60)),
                hi(b(60)),
                lo(b(60)),
                hi(l(77)),
                lo(l(77)),
                hi(r(94)),
                lo(r(94)),
                hi(a(94)),
                lo(a(94)),
                hi(l(111)),
                lo(l(111)),
            ];
            out.ke = [hi(r(30)), lo(r(30)), hi(l(60)), lo(l(60)), hi(a(77)), lo(a(77))];
        }
        Ok(out)
    }

    pub fn encrypt_block(&self, block: &mut [u8]) {
        assert_eq!(block.len(), BLOCK_SIZE, "Camellia block must be 16 bytes");
        let (mut d1, mut d2) = load(block);
        d1 ^= self.kw[0];
        d2 ^= self.kw[1];
        for g in 0..self.groups {
            if g > 0 {
                d1 = fl(d1, self.ke[2 * (g - 1)]);
                d2 = fl_inv(d2, self.ke[2 * (g - 1) + 1]);
            }
            for j in 0..3 {
                d2 ^= f(d1, self.k[6 * g + 2 * j]);
                d1 ^= f(d2, self.k[6 * g + 2 * j + 1]);
            }
        }
        d2 ^= self.kw[2];
        d1 ^= self.kw[3];
        store(block, d2, d1);
    }

    pub fn decrypt_block(&self, block: &mut [u8]) {
        assert_eq!(block.len(), BLOCK_SIZE, "Camellia block must be 16 bytes");
        let (mut d1, mut d2) = load(block);
        d1 ^= self.kw[2];
        d2 ^= self.kw[3];
        for g in (0..self.groups).rev() {
            for j in (0..3).rev() {
                d2 ^= f(d1, self.k[6 * g + 2 * j + 1]);
                d1 ^= f(d2, self.k[6 * g + 2 * j]);
            }
            if g > 0 {
                d1 = fl(d1, self.ke[2 * (g - 1) + 1]);
                d2 = fl_inv(d2, self.ke[2 * (g - 1)]);
            }
        }
        d2 ^= self.kw[0];
        d1 ^= self.kw[1];
        store(block, d2, d1);
    }
}

fn to_16(b: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(b);
    out
}

fn to_8(b: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(b);
    out
}

fn load(block: &[u8]) -> (u64, u64) {
    let w: [u32; 4] = core::array::from_fn(|i| load_u32_be(&block[4 * i..]));
    (
        ((w[0] as u64) << 32) | w[1] as u64,
        ((w[2] as u64) << 32) | w[3] as u64,
    )
}

fn store(block: &mut [u8], a: u64, b: u64) {
    store_u32_be(&mut block[0..], (a >> 32) as u32);
    store_u32_be(&mut block[4..], a as u32);
    store_u32_be(&mut block[8..], (b >> 32) as u32);
    store_u32_be(&mut block[12..], b as u32);
}

impl BlockCipher for Camellia {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        Camellia::encrypt_block(self, block)
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        Camellia::decrypt_block(self, block)
    }
}
