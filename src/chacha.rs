//! The ChaCha stream cipher with a 96-bit nonce and 32-bit block counter (RFC 7539).
//!
//! The round count is a const parameter: [`ChaCha20`], [`ChaCha12`] and
//! [`ChaCha8`] differ only in how many double rounds the core runs.
use crate::error::{Error, Result};
use crate::util::{load_u32_le, store_u32_le};
use crate::StreamCipher;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const BLOCK_SIZE: usize = 64;

/// "expand 32-byte k" as little-endian words.
const CONSTANTS: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

#[inline(always)]
fn quarter_round(x: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    x[a] = x[a].wrapping_add(x[b]);
    x[d] = (x[d] ^ x[a]).rotate_left(16);
    x[c] = x[c].wrapping_add(x[d]);
    x[b] = (x[b] ^ x[c]).rotate_left(12);
    x[a] = x[a].wrapping_add(x[b]);
    x[d] = (x[d] ^ x[a]).rotate_left(8);
    x[c] = x[c].wrapping_add(x[d]);
    x[b] = (x[b] ^ x[c]).rotate_left(7);
}

/// One 64-byte keystream block for `state`, using `rounds` rounds.
fn core(state: &[u32; 16], rounds: usize, out: &mut [u8; BLOCK_SIZE]) {
    let mut x = *state;
    for _ in 0..rounds / 2 {
        quarter_round(&mut x, 0, 4, 8, 12);
        quarter_round(&mut x, 1, 5, 9, 13);
        quarter_round(&mut x, 2, 6, 10, 14);
        quarter_round(&mut x, 3, 7, 11, 15);

        quarter_round(&mut x, 0, 5, 10, 15);
        quarter_round(&mut x, 1, 6, 11, 12);
        quarter_round(&mut x, 2, 7, 8, 13);
        quarter_round(&mut x, 3, 4, 9, 14);
    }
    for (i, chunk) in out.chunks_exact_mut(4).enumerate() {
        store_u32_le(chunk, x[i].wrapping_add(state[i]));
    }
    x.zeroize();
}

/// A ChaCha keystream positioned at some byte of some block.
#[derive(Clone, ZeroizeOnDrop)]
pub struct ChaCha<const R: usize> {
    state: [u32; 16],
    keystream: [u8; BLOCK_SIZE],
    /// Bytes of `keystream` already used; `BLOCK_SIZE` when nothing is buffered.
    off: usize,
}

pub type ChaCha20 = ChaCha<20>;
pub type ChaCha12 = ChaCha<12>;
pub type ChaCha8 = ChaCha<8>;

impl<const R: usize> ChaCha<R> {
    pub fn new(key: &[u8], nonce: &[u8]) -> Result<Self> {
        Self::with_counter(key, nonce, 0)
    }

    /// Start the keystream at block `counter`.
    pub fn with_counter(key: &[u8], nonce: &[u8], counter: u32) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(Error::InvalidKeySize(key.len()));
        }
        if nonce.len() != NONCE_SIZE {
            return Err(Error::InvalidNonceSize(nonce.len()));
        }

        let mut state = [0u32; 16];
        state[..4].copy_from_slice(&CONSTANTS);
        for (s, chunk) in state[4..12].iter_mut().zip(key.chunks_exact(4)) {
            *s = load_u32_le(chunk);
        }
        state[12] = counter;
        for (s, chunk) in state[13..].iter_mut().zip(nonce.chunks_exact(4)) {
            *s = load_u32_le(chunk);
        }

        Ok(Self {
            state,
            keystream: [0; BLOCK_SIZE],
            off: BLOCK_SIZE,
        })
    }

    /// The counter of the next block to be generated.
    pub fn counter(&self) -> u32 {
        self.state[12]
    }

    /// Seek to the start of block `counter`, dropping any buffered keystream.
    pub fn set_counter(&mut self, counter: u32) {
        self.state[12] = counter;
        self.keystream.zeroize();
        self.off = BLOCK_SIZE;
    }

    /// Generate the block at the current counter and advance it.
    ///
    /// The counter wraps after 2^32 blocks; callers must not get that far.
    fn refill(&mut self) {
        core(&self.state, R, &mut self.keystream);
        self.state[12] = self.state[12].wrapping_add(1);
        self.off = 0;
    }

    /// XOR `data` with the keystream in place.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        let mut i = 0;

        // Leftover keystream from the previous call.
        if self.off < BLOCK_SIZE {
            let n = data.len().min(BLOCK_SIZE - self.off);
            for (d, k) in data[..n].iter_mut().zip(&self.keystream[self.off..]) {
                *d ^= k;
            }
            self.off += n;
            i = n;
        }

        while data.len() - i >= BLOCK_SIZE {
            self.refill();
            for (d, k) in data[i..i + BLOCK_SIZE].iter_mut().zip(&self.keystream) {
                *d ^= k;
            }
            self.off = BLOCK_SIZE;
            i += BLOCK_SIZE;
        }

        if i < data.len() {
            self.refill();
            let tail = &mut data[i..];
            for (d, k) in tail.iter_mut().zip(&self.keystream) {
                *d ^= k;
            }
            self.off = tail.len();
        }
    }

    /// XOR `input` with the keystream into `output`, which must have the same length.
    pub fn xor(&mut self, input: &[u8], output: &mut [u8]) {
        assert_eq!(input.len(), output.len(), "input and output lengths differ");
        output.copy_from_slice(input);
        self.apply_keystream(output);
    }
}

impl<const R: usize> StreamCipher for ChaCha<R> {
    fn apply_keystream(&mut self, data: &mut [u8]) {
        ChaCha::apply_keystream(self, data)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rfc_key() -> Vec<u8> {
        (0..32).collect()
    }

    const SUNSCREEN: &[u8] = b"Ladies and Gentlemen of the class of '99: \
        If I could offer you only one tip for the future, sunscreen would be it.";

    #[test]
    fn test_rfc7539_block_function() {
        let nonce = hex::decode("000000090000004a00000000").unwrap();
        let mut c = ChaCha20::with_counter(&rfc_key(), &nonce, 1).unwrap();
        let mut block = [0u8; 64];
        c.apply_keystream(&mut block);
        assert_eq!(
            hex::encode(block),
            "10f1e7e4d13b5915500fdd1fa32071c4c7d1f4c733c068030422aa9ac3d46c4e\
             d2826446079faa0914c2d705d98b02a2b5129cd1de164eb9cbd083e8a2503c4e"
        );
        assert_eq!(c.counter(), 2);
    }

    #[test]
    fn test_rfc7539_encryption() {
        let nonce = hex::decode("000000000000004a00000000").unwrap();
        let mut c = ChaCha20::with_counter(&rfc_key(), &nonce, 1).unwrap();
        let mut out = vec![0u8; SUNSCREEN.len()];
        c.xor(SUNSCREEN, &mut out);
        assert_eq!(
            hex::encode(&out),
            "6e2e359a2568f98041ba0728dd0d6981e97e7aec1d4360c20a27afccfd9fae0b\
             f91b65c5524733ab8f593dabcd62b3571639d624e65152ab8f530c359f0861d8\
             07ca0dbf500d6a6156a38e088a22b65e52bc514d16ccf806818ce91ab7793736\
             5af90bbf74a35be6b40b8eedf2785e42874d"
        );

        let mut d = ChaCha20::with_counter(&rfc_key(), &nonce, 1).unwrap();
        d.apply_keystream(&mut out);
        assert_eq!(out, SUNSCREEN);
    }

    #[test]
    fn test_split_calls_match_single_call() {
        let nonce = [3u8; 12];
        let mut whole = vec![0u8; 300];
        ChaCha20::new(&rfc_key(), &nonce)
            .unwrap()
            .apply_keystream(&mut whole);

        let mut pieces = vec![0u8; 300];
        let mut c = ChaCha20::new(&rfc_key(), &nonce).unwrap();
        let mut start = 0;
        for n in [1, 63, 64, 65, 7, 100] {
            c.apply_keystream(&mut pieces[start..start + n]);
            start += n;
        }
        assert_eq!(pieces, whole);
        assert_eq!(c.counter(), 5);
    }

    #[test]
    fn test_set_counter_seeks() {
        let nonce = [0u8; 12];
        let mut a = ChaCha20::new(&rfc_key(), &nonce).unwrap();
        let mut stream = [0u8; 192];
        a.apply_keystream(&mut stream);

        let mut b = ChaCha20::new(&rfc_key(), &nonce).unwrap();
        b.apply_keystream(&mut [0u8; 10]);
        b.set_counter(2);
        let mut third = [0u8; 64];
        b.apply_keystream(&mut third);
        assert_eq!(third, stream[128..]);
    }

    #[test]
    fn test_round_variant_vectors() {
        // All-zero key, nonce and counter.
        let mut block = [0u8; 64];
        ChaCha20::new(&[0; 32], &[0; 12])
            .unwrap()
            .apply_keystream(&mut block);
        assert_eq!(
            hex::encode(block),
            "76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7\
             da41597c5157488d7724e03fb8d84a376a43b8f41518a11cc387b669b2ee6586"
        );

        let mut block = [0u8; 64];
        ChaCha12::new(&[0; 32], &[0; 12])
            .unwrap()
            .apply_keystream(&mut block);
        assert_eq!(
            hex::encode(block),
            "9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f\
             0564f879d27ae3c02ce82834acfa8c793a629f2ca0de6919610be82f411326be"
        );

        let mut block = [0u8; 64];
        ChaCha8::new(&[0; 32], &[0; 12])
            .unwrap()
            .apply_keystream(&mut block);
        assert_eq!(
            hex::encode(block),
            "3e00ef2f895f40d67f5bb8e81f09a5a12c840ec3ce9a7f3b181be188ef711a1e\
             984ce172b9216f419f445367456d5619314a42a3da86b001387bfdb80e0cfe42"
        );
    }

    #[test]
    fn test_round_variants_differ() {
        let nonce = [0u8; 12];
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        let mut c = [0u8; 64];
        ChaCha20::new(&rfc_key(), &nonce)
            .unwrap()
            .apply_keystream(&mut a);
        ChaCha12::new(&rfc_key(), &nonce)
            .unwrap()
            .apply_keystream(&mut b);
        ChaCha8::new(&rfc_key(), &nonce)
            .unwrap()
            .apply_keystream(&mut c);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_sizes() {
        assert_eq!(ChaCha20::new(&[0; 16], &[0; 12]).err(), Some(Error::InvalidKeySize(16)));
        assert_eq!(ChaCha20::new(&[0; 32], &[0; 8]).err(), Some(Error::InvalidNonceSize(8)));
    }
}
