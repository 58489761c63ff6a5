//! BLAKE2b, as described in RFC 7693.
//!
//! Sequential mode only: fanout and depth are both fixed to 1.
use crate::error::{Error, Result};
use crate::util::{load_u64_le, store_u64_le};
use crate::Mac;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const BLOCK_SIZE: usize = 128;
pub const MAX_HASH_SIZE: usize = 64;
pub const MAX_KEY_SIZE: usize = 64;
pub const SALT_SIZE: usize = 16;
pub const PERSONAL_SIZE: usize = 16;

const IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

pub(crate) const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

const ROUNDS: usize = 12;

#[inline(always)]
fn g(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

/// The BLAKE2b compression function F.
///
/// `t` is the number of bytes hashed so far, including this block.
fn compress(h: &mut [u64; 8], t: [u64; 2], block: &[u8], last: bool) {
    let mut m = [0u64; 16];
    for (w, chunk) in m.iter_mut().zip(block.chunks_exact(8)) {
        *w = load_u64_le(chunk);
    }

    let mut v = [0u64; 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&IV);
    v[12] ^= t[0];
    v[13] ^= t[1];
    if last {
        v[14] = !v[14];
    }

    for r in 0..ROUNDS {
        let s = &SIGMA[r % 10];
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

/// 128-bit counter addition.
#[inline(always)]
fn add_counter(t: &mut [u64; 2], n: u64) {
    let (lo, carry) = t[0].overflowing_add(n);
    t[0] = lo;
    t[1] = t[1].wrapping_add(carry as u64);
}

/// Configuration for a [`Blake2b`] instance.
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
            return Err(Error::InvalidConfig("hash size must be between 1 and 64"));
        }
        if self.key.len() > MAX_KEY_SIZE {
            return Err(Error::InvalidKeySize(self.key.len()));
        }
        if self.salt.len() > SALT_SIZE {
            return Err(Error::InvalidConfig("salt longer than 16 bytes"));
        }
        if self.personal.len() > PERSONAL_SIZE {
            return Err(Error::InvalidConfig("personalization longer than 16 bytes"));
        }
        Ok(())
    }

    /// The 64-byte parameter block XORed into the IV.
    fn block(&self) -> [u8; 64] {
        let mut p = [0u8; 64];
        p[0] = self.hash_size as u8;
        p[1] = self.key.len() as u8;
        // fanout, depth
        p[2] = 1;
        p[3] = 1;
        p[32..32 + self.salt.len()].copy_from_slice(self.salt);
        p[48..48 + self.personal.len()].copy_from_slice(self.personal);
        p
    }

    pub fn build(&self) -> Result<Blake2b> {
        self.validate()?;

        let p = self.block();
        let mut init = IV;
        for (h, chunk) in init.iter_mut().zip(p.chunks_exact(8)) {
            *h ^= load_u64_le(chunk);
        }

        let mut key_block = [0u8; BLOCK_SIZE];
        key_block[..self.key.len()].copy_from_slice(self.key);

        let mut out = Blake2b {
            h: init,
            t: [0; 2],
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

/// An incremental BLAKE2b hasher, optionally keyed.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Blake2b {
    h: [u64; 8],
    t: [u64; 2],
    buf: [u8; BLOCK_SIZE],
    off: usize,
    size: usize,
    key_block: [u8; BLOCK_SIZE],
    keyed: bool,
    init: [u64; 8],
}

impl Blake2b {
    /// An unkeyed hasher producing `hash_size` bytes.
    pub fn new(hash_size: usize) -> Result<Self> {
        Params::new().hash_size(hash_size).build()
    }

    /// A MAC producing `hash_size` bytes under `key`.
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
            add_counter(&mut self.t, BLOCK_SIZE as u64);
            compress(&mut self.h, self.t, &self.buf, false);
            self.off = 0;
            data = &data[fill..];

            while data.len() > BLOCK_SIZE {
                add_counter(&mut self.t, BLOCK_SIZE as u64);
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

    /// Write the digest into `out`, which must be exactly [`Blake2b::size`] bytes.
    pub fn finalize_into(&self, out: &mut [u8]) {
        assert_eq!(out.len(), self.size, "output must be {} bytes", self.size);

        let mut h = self.h;
        let mut t = self.t;
        add_counter(&mut t, self.off as u64);
        let mut block = self.buf;
        block[self.off..].fill(0);
        compress(&mut h, t, &block, true);

        let mut full = [0u8; 64];
        for (chunk, word) in full.chunks_exact_mut(8).zip(&h) {
            store_u64_le(chunk, *word);
        }
        out.copy_from_slice(&full[..self.size]);

        h.zeroize();
        block.zeroize();
        full.zeroize();
    }

    pub fn reset(&mut self) {
        self.h = self.init;
        self.t = [0; 2];
        if self.keyed {
            self.buf = self.key_block;
            self.off = BLOCK_SIZE;
        } else {
            self.buf = [0; BLOCK_SIZE];
            self.off = 0;
        }
    }
}

impl Mac for Blake2b {
    fn update(&mut self, data: &[u8]) {
        Blake2b::update(self, data)
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn finalize_into(&self, out: &mut [u8]) {
        Blake2b::finalize_into(self, out)
    }

    fn reset(&mut self) {
        Blake2b::reset(self)
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

/// BLAKE2b-512 of `data`, keyed if `key` is given.
pub fn sum512(data: &[u8], key: Option<&[u8]>) -> Result<[u8; 64]> {
    sum(data, key)
}

/// BLAKE2b-256 of `data`, keyed if `key` is given.
pub fn sum256(data: &[u8], key: Option<&[u8]>) -> Result<[u8; 32]> {
    sum(data, key)
}

#[cfg(test)]
mod test {
    use super::*;

    fn digest(h: &Blake2b) -> Vec<u8> {
        let mut out = vec![0u8; h.size()];
        h.finalize_into(&mut out);
        out
    }

    #[test]
    fn test_rfc7693_abc() {
        let out = sum512(b"abc", None).unwrap();
        assert_eq!(
            hex::encode(out),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
        );
    }

    #[test]
    fn test_empty() {
        let out = sum512(b"", None).unwrap();
        assert_eq!(
            hex::encode(out),
            "786a02f742015903c6c6fd852552d272912f4740e15847618a86e217f71f5419\
             d25e1031afee585313896444934eb04b903a685b1448b755d56f701afe9be2ce"
        );
    }

    #[test]
    fn test_keyed_empty() {
        let key: Vec<u8> = (0..64).collect();
        let out = sum512(b"", Some(&key)).unwrap();
        assert_eq!(
            hex::encode(out),
            "10ebb67700b1868efb4417987acf4690ae9d972fb7a590c2f02871799aaa4786\
             b5e996e8f0f4eb981fc214b005f42d2ff4233499391653df7aefcbc13fc51568"
        );
    }

    #[test]
    fn test_exact_block_boundaries() {
        let data = [0x5Au8; 3 * BLOCK_SIZE];
        for len in [BLOCK_SIZE - 1, BLOCK_SIZE, BLOCK_SIZE + 1, 2 * BLOCK_SIZE, 3 * BLOCK_SIZE] {
            let mut h = Blake2b::new(64).unwrap();
            for b in &data[..len] {
                h.update(core::slice::from_ref(b));
            }
            assert_eq!(digest(&h), sum512(&data[..len], None).unwrap().to_vec());
        }
    }

    #[test]
    fn test_finalize_is_repeatable() {
        let mut h = Blake2b::new_keyed(32, b"key").unwrap();
        h.update(b"some data");
        let a = digest(&h);
        let b = digest(&h);
        assert_eq!(a, b);
        h.update(b" and more");
        let mut fresh = Blake2b::new_keyed(32, b"key").unwrap();
        fresh.update(b"some data and more");
        assert_eq!(digest(&h), digest(&fresh));
    }

    #[test]
    fn test_truncated_size_is_not_a_prefix() {
        let short = sum256(b"abc", None).unwrap();
        let long = sum512(b"abc", None).unwrap();
        assert_ne!(&short[..], &long[..32]);
    }

    #[test]
    fn test_verify() {
        let mut h = Blake2b::new_keyed(16, b"secret").unwrap();
        h.update(b"msg");
        let tag = digest(&h);
        assert!(h.verify(&tag).is_ok());
        let mut bad = tag.clone();
        bad[3] ^= 1;
        assert_eq!(h.verify(&bad), Err(Error::AuthenticationFailed));
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(Blake2b::new(0), Err(Error::InvalidConfig(_))));
        assert!(matches!(Blake2b::new(65), Err(Error::InvalidConfig(_))));
        assert_eq!(
            Blake2b::new_keyed(64, &[0; 65]).err(),
            Some(Error::InvalidKeySize(65))
        );
        assert!(Params::new().salt(&[0; 17]).build().is_err());
        assert!(Params::new().personal(&[0; 17]).build().is_err());
        assert!(Params::new()
            .salt(&[0; 16])
            .personal(&[0; 16])
            .build()
            .is_ok());
    }

    #[test]
    fn test_parameter_block_vector() {
        let mut h = Params::new()
            .hash_size(40)
            .key(&[b'k'; 10])
            .salt(&[b'S'; 16])
            .personal(&[b'P'; 16])
            .build()
            .unwrap();
        h.update(b"data");
        assert_eq!(
            hex::encode(digest(&h)),
            "60acb2749d8202982d67368c41863672b7d00101bea61088e34a0d82d17d2c0ce4f9148eb07fc41a"
        );
    }

    #[test]
    fn test_truncated_vector() {
        assert_eq!(
            hex::encode(sum256(b"abc", None).unwrap()),
            "bddd813c634239723171ef3fee98579b94964e3bb1cb3e427262c8c068d52319"
        );
    }

    #[test]
    fn test_salt_and_personal_change_output() {
        let mut plain = Params::new().build().unwrap();
        let mut salted = Params::new().salt(b"salt").build().unwrap();
        let mut personal = Params::new().personal(b"app").build().unwrap();
        for h in [&mut plain, &mut salted, &mut personal] {
            h.update(b"data");
        }
        assert_ne!(digest(&plain), digest(&salted));
        assert_ne!(digest(&plain), digest(&personal));
        assert_ne!(digest(&salted), digest(&personal));
    }
}
