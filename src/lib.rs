#![cfg_attr(not(test), no_std)]
//! Hash functions, block ciphers, stream ciphers, MACs and AEAD modes built
//! directly from their published specifications.
//!
//! Every primitive is an independent value with no shared state. Streaming
//! hashes and MACs buffer partial blocks and always keep the last block back
//! until finalization, so the final-block treatment of each construction is
//! applied exactly once.
mod util;

pub mod blake2b;
pub mod blake2s;
pub mod camellia;
pub mod chacha;
pub mod chacha20poly1305;
pub mod cmac;
pub mod eax;
pub mod error;
pub mod poly1305;
pub mod serpent;
pub mod siphash;
pub mod skein;
pub mod threefish;

pub use crate::error::{Error, Result};
pub use crate::util::ct_eq;
use zeroize::Zeroize;

/// A block cipher with a fixed key, usable by the generic modes.
///
/// `encrypt_block` and `decrypt_block` work in place and panic if the slice
/// is not exactly [`BlockCipher::block_size`] bytes long.
pub trait BlockCipher {
    fn block_size(&self) -> usize;
    fn encrypt_block(&self, block: &mut [u8]);
    fn decrypt_block(&self, block: &mut [u8]);
}

impl<C: BlockCipher + ?Sized> BlockCipher for &C {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        (**self).encrypt_block(block)
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        (**self).decrypt_block(block)
    }
}

/// An incremental hash or reusable MAC.
pub trait Mac {
    /// Absorb more input.
    fn update(&mut self, data: &[u8]);
    /// The number of bytes [`Mac::finalize_into`] writes.
    fn output_size(&self) -> usize;
    /// Write the digest into `out`, which must be exactly `output_size()` bytes.
    ///
    /// This does not disturb the running state.
    fn finalize_into(&self, out: &mut [u8]);
    /// Go back to the state right after construction.
    fn reset(&mut self);

    /// Compare the current digest against `tag` in constant time.
    fn verify(&self, tag: &[u8]) -> Result<()> {
        let mut expected = [0u8; 128];
        let n = self.output_size();
        self.finalize_into(&mut expected[..n]);
        let res = util::check_tag(&expected[..n], tag);
        expected.zeroize();
        res
    }
}

/// A keystream generator that encrypts and decrypts by XOR.
pub trait StreamCipher {
    fn apply_keystream(&mut self, data: &mut [u8]);
}
