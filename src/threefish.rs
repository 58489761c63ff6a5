//! The Threefish tweakable block cipher from the Skein 1.3 submission.
//!
//! The word-level functions here take an already expanded key (with its
//! parity word) so that Skein can run one block per chain value without
//! building a [`Threefish`] each time.
use crate::error::{Error, Result};
use crate::util::{load_u64_le, words_from_le, words_to_le};
use crate::BlockCipher;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The key schedule constant.
pub const C240: u64 = 0x1BD11BDAA9FC1A22;
pub const TWEAK_SIZE: usize = 16;

const MAX_WORDS: usize = 16;

struct Variant {
    rounds: usize,
    /// `rotations[d % 8][j]` for MIX `j` of round `d`; only the first `words / 2` entries are used.
    rotations: [[u32; 8]; 8],
    /// Word `i` after a round is word `permutation[i]` before it.
    permutation: [usize; MAX_WORDS],
}

const THREEFISH_256: Variant = Variant {
    rounds: 72,
    rotations: [
        [14, 16, 0, 0, 0, 0, 0, 0],
        [52, 57, 0, 0, 0, 0, 0, 0],
        [23, 40, 0, 0, 0, 0, 0, 0],
        [5, 37, 0, 0, 0, 0, 0, 0],
        [25, 33, 0, 0, 0, 0, 0, 0],
        [46, 12, 0, 0, 0, 0, 0, 0],
        [58, 22, 0, 0, 0, 0, 0, 0],
        [32, 32, 0, 0, 0, 0, 0, 0],
    ],
    permutation: [0, 3, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
};

const THREEFISH_512: Variant = Variant {
    rounds: 72,
    rotations: [
        [46, 36, 19, 37, 0, 0, 0, 0],
        [33, 27, 14, 42, 0, 0, 0, 0],
        [17, 49, 36, 39, 0, 0, 0, 0],
        [44, 9, 54, 56, 0, 0, 0, 0],
        [39, 30, 34, 24, 0, 0, 0, 0],
        [13, 50, 10, 17, 0, 0, 0, 0],
        [25, 29, 39, 43, 0, 0, 0, 0],
        [8, 35, 56, 22, 0, 0, 0, 0],
    ],
    permutation: [2, 1, 4, 7, 6, 5, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0],
};

const THREEFISH_1024: Variant = Variant {
    rounds: 80,
    rotations: [
        [24, 13, 8, 47, 8, 17, 22, 37],
        [38, 19, 10, 55, 49, 18, 23, 52],
        [33, 4, 51, 13, 34, 41, 59, 17],
        [5, 20, 48, 41, 47, 28, 16, 25],
        [41, 9, 37, 31, 12, 47, 44, 30],
        [16, 34, 56, 51, 4, 53, 42, 41],
        [31, 44, 47, 46, 19, 42, 44, 25],
        [9, 48, 35, 52, 23, 31, 37, 20],
    ],
    permutation: [0, 9, 2, 13, 6, 11, 4, 15, 10, 7, 12, 3, 14, 5, 8, 1],
};

fn variant(words: usize) -> &'static Variant {
    match words {
        4 => &THREEFISH_256,
        8 => &THREEFISH_512,
        16 => &THREEFISH_1024,
        _ => panic!("Threefish has no {}-word variant.", words),
    }
}

/// The parity word `C240 ^ k[0] ^ ... ^ k[n-1]`.
pub(crate) fn key_parity(key: &[u64]) -> u64 {
    key.iter().fold(C240, |acc, k| acc ^ k)
}

/// The tweak triple `(t0, t1, t0 ^ t1)`.
pub(crate) fn expand_tweak(t0: u64, t1: u64) -> [u64; 3] {
    [t0, t1, t0 ^ t1]
}

/// Word `i` of subkey `s`.
#[inline(always)]
fn subkey(key: &[u64], tweak: &[u64; 3], s: usize, i: usize) -> u64 {
    let n = key.len();
    let words = n - 1;
    let k = key[(s + i) % n];
    if i == words - 3 {
        k.wrapping_add(tweak[s % 3])
    } else if i == words - 2 {
        k.wrapping_add(tweak[(s + 1) % 3])
    } else if i == words - 1 {
        k.wrapping_add(s as u64)
    } else {
        k
    }
}

/// Encrypt `block` in place.
///
/// `key` is the expanded key: `block.len() + 1` words, the last being the parity word.
pub(crate) fn encrypt_words(key: &[u64], tweak: &[u64; 3], block: &mut [u64]) {
    let words = block.len();
    debug_assert_eq!(key.len(), words + 1);
    let v = variant(words);
    let mut tmp = [0u64; MAX_WORDS];

    for d in 0..v.rounds {
        if d % 4 == 0 {
            for (i, x) in block.iter_mut().enumerate() {
                *x = x.wrapping_add(subkey(key, tweak, d / 4, i));
            }
        }
        let rot = &v.rotations[d % 8];
        for (j, pair) in block.chunks_exact_mut(2).enumerate() {
            pair[0] = pair[0].wrapping_add(pair[1]);
            pair[1] = pair[1].rotate_left(rot[j]) ^ pair[0];
        }
        tmp[..words].copy_from_slice(block);
        for (i, x) in block.iter_mut().enumerate() {
            *x = tmp[v.permutation[i]];
        }
    }
    let s = v.rounds / 4;
    for (i, x) in block.iter_mut().enumerate() {
        *x = x.wrapping_add(subkey(key, tweak, s, i));
    }
    tmp.zeroize();
}

/// Decrypt `block` in place; the inverse of [`encrypt_words`].
pub(crate) fn decrypt_words(key: &[u64], tweak: &[u64; 3], block: &mut [u64]) {
    let words = block.len();
    debug_assert_eq!(key.len(), words + 1);
    let v = variant(words);
    let mut tmp = [0u64; MAX_WORDS];

    let s = v.rounds / 4;
    for (i, x) in block.iter_mut().enumerate() {
        *x = x.wrapping_sub(subkey(key, tweak, s, i));
    }
    for d in (0..v.rounds).rev() {
        tmp[..words].copy_from_slice(block);
        for (i, x) in tmp[..words].iter().enumerate() {
            block[v.permutation[i]] = *x;
        }
        let rot = &v.rotations[d % 8];
        for (j, pair) in block.chunks_exact_mut(2).enumerate() {
            pair[1] = (pair[1] ^ pair[0]).rotate_right(rot[j]);
            pair[0] = pair[0].wrapping_sub(pair[1]);
        }
        if d % 4 == 0 {
            for (i, x) in block.iter_mut().enumerate() {
                *x = x.wrapping_sub(subkey(key, tweak, d / 4, i));
            }
        }
    }
    tmp.zeroize();
}

/// Threefish with a block (and key) of `W` 64-bit words.
///
/// The expanded key is immutable after construction; only the tweak can change.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Threefish<const W: usize> {
    key: [u64; MAX_WORDS + 1],
    tweak: [u64; 3],
}

pub type Threefish256 = Threefish<4>;
pub type Threefish512 = Threefish<8>;
pub type Threefish1024 = Threefish<16>;

impl<const W: usize> Threefish<W> {
    const SUPPORTED: () = assert!(W == 4 || W == 8 || W == 16, "Threefish needs 4, 8 or 16 words");

    /// Block and key size in bytes.
    pub const BLOCK_SIZE: usize = W * 8;

    pub fn new(key: &[u8], tweak: &[u8]) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::SUPPORTED;
        if key.len() != Self::BLOCK_SIZE {
            return Err(Error::InvalidKeySize(key.len()));
        }
        let mut out = Self {
            key: [0; MAX_WORDS + 1],
            tweak: [0; 3],
        };
        words_from_le(&mut out.key[..W], key);
        out.key[W] = key_parity(&out.key[..W]);
        out.set_tweak(tweak)?;
        Ok(out)
    }

    /// Replace the 16-byte tweak, keeping the key schedule.
    pub fn set_tweak(&mut self, tweak: &[u8]) -> Result<()> {
        if tweak.len() != TWEAK_SIZE {
            return Err(Error::InvalidTweakSize(tweak.len()));
        }
        self.tweak = expand_tweak(load_u64_le(&tweak[..8]), load_u64_le(&tweak[8..]));
        Ok(())
    }

    pub fn encrypt_block(&self, block: &mut [u8]) {
        assert_eq!(
            block.len(),
            Self::BLOCK_SIZE,
            "Threefish block must be {} bytes",
            Self::BLOCK_SIZE
        );
        let mut words = [0u64; W];
        words_from_le(&mut words, block);
        encrypt_words(&self.key[..W + 1], &self.tweak, &mut words);
        words_to_le(block, &words);
        words.zeroize();
    }

    pub fn decrypt_block(&self, block: &mut [u8]) {
        assert_eq!(
            block.len(),
            Self::BLOCK_SIZE,
            "Threefish block must be {} bytes",
            Self::BLOCK_SIZE
        );
        let mut words = [0u64; W];
        words_from_le(&mut words, block);
        decrypt_words(&self.key[..W + 1], &self.tweak, &mut words);
        words_to_le(block, &words);
        words.zeroize();
    }
}

impl<const W: usize> BlockCipher for Threefish<W> {
    fn block_size(&self) -> usize {
        Self::BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        Threefish::encrypt_block(self, block)
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        Threefish::decrypt_block(self, block)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip<const W: usize>() {
        let key: Vec<u8> = (0..W * 8).map(|i| i as u8).collect();
        let tweak: Vec<u8> = (0..16).map(|i| 0xF0 ^ i as u8).collect();
        let cipher = Threefish::<W>::new(&key, &tweak).unwrap();

        let plain: Vec<u8> = (0..W * 8).map(|i| (i * 7) as u8).collect();
        let mut block = plain.clone();
        cipher.encrypt_block(&mut block);
        assert_ne!(block, plain);
        cipher.decrypt_block(&mut block);
        assert_eq!(block, plain);
    }

    #[test]
    fn test_round_trips() {
        round_trip::<4>();
        round_trip::<8>();
        round_trip::<16>();
    }

    fn encrypt_zeros<const W: usize>() -> String {
        let cipher = Threefish::<W>::new(&vec![0u8; W * 8], &[0; 16]).unwrap();
        let mut block = vec![0u8; W * 8];
        cipher.encrypt_block(&mut block);
        let out = hex::encode(&block);
        cipher.decrypt_block(&mut block);
        assert!(block.iter().all(|&b| b == 0));
        out
    }

    #[test]
    fn test_all_zero_vectors() {
        assert_eq!(
            encrypt_zeros::<4>(),
            "84da2a1f8beaee947066ae3e3103f1ad536db1f4a1192495116b9f3ce6133fd8"
        );
        assert_eq!(
            encrypt_zeros::<8>(),
            "b1a2bbc6ef6025bc40eb3822161f36e375d1bb0aee3186fbd19e47c5d479947b\
             7bc2f8586e35f0cff7e7f03084b0b7b1f1ab3961a580a3e97eb41ea14a6d7bbe"
        );
        assert_eq!(
            encrypt_zeros::<16>(),
            "f05c3d0a3d05b304f785ddc7d1e036015c8aa76e2f217b06c6e1544c0bc1a90d\
             f0accb9473c24e0fd54fea68057f43329cb454761d6df5cf7b2e9b3614fbd5a2\
             0b2e4760b40603540d82eabc5482c171c832afbe68406bc39500367a592943fa\
             9a5b4a43286ca3c4cf46104b443143d560a4b230488311df4feef7e1dfe8391e"
        );
    }

    #[test]
    fn test_parity_word() {
        let key = [0u8; 32];
        let cipher = Threefish256::new(&key, &[0; 16]).unwrap();
        assert_eq!(cipher.key[4], C240);
        assert_eq!(expand_tweak(1, 2), [1, 2, 3]);
    }

    #[test]
    fn test_tweak_changes_output() {
        let key = [9u8; 64];
        let mut cipher = Threefish512::new(&key, &[0; 16]).unwrap();
        let mut a = [0u8; 64];
        cipher.encrypt_block(&mut a);
        cipher.set_tweak(&[1; 16]).unwrap();
        let mut b = [0u8; 64];
        cipher.encrypt_block(&mut b);
        assert_ne!(a, b);
        cipher.decrypt_block(&mut b);
        assert_eq!(b, [0u8; 64]);
    }

    #[test]
    fn test_invalid_sizes() {
        assert_eq!(Threefish256::new(&[0; 31], &[0; 16]).err(), Some(Error::InvalidKeySize(31)));
        assert_eq!(Threefish1024::new(&[0; 64], &[0; 16]).err(), Some(Error::InvalidKeySize(64)));
        assert_eq!(Threefish512::new(&[0; 64], &[0; 8]).err(), Some(Error::InvalidTweakSize(8)));
    }
}
