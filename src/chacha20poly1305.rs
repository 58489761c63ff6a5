//! ChaCha20-Poly1305 authenticated encryption (RFC 7539, section 2.8).
use crate::chacha::{ChaCha20, KEY_SIZE, NONCE_SIZE};
use crate::error::{Error, Result};
use crate::poly1305::{self, Poly1305};
use crate::util::check_tag;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const MAX_TAG_SIZE: usize = poly1305::TAG_SIZE;

#[derive(Clone, ZeroizeOnDrop)]
pub struct ChaCha20Poly1305 {
    key: [u8; KEY_SIZE],
    #[zeroize(skip)]
    tag_size: usize,
}

impl ChaCha20Poly1305 {
    pub fn new(key: &[u8]) -> Result<Self> {
        Self::with_tag_size(key, MAX_TAG_SIZE)
    }

    /// Truncate tags to `tag_size` bytes, between 1 and 16.
    pub fn with_tag_size(key: &[u8], tag_size: usize) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(Error::InvalidKeySize(key.len()));
        }
        if tag_size == 0 || tag_size > MAX_TAG_SIZE {
            return Err(Error::InvalidTagSize(tag_size));
        }
        let mut out = Self {
            key: [0; KEY_SIZE],
            tag_size,
        };
        out.key.copy_from_slice(key);
        Ok(out)
    }

    pub fn tag_size(&self) -> usize {
        self.tag_size
    }

    /// Key the stream at counter 0 and take the one-time Poly1305 key from the first block.
    ///
    /// The returned stream is positioned at block 1.
    fn start(&self, nonce: &[u8]) -> Result<(ChaCha20, Poly1305)> {
        if nonce.len() != NONCE_SIZE {
            return Err(Error::InvalidNonceSize(nonce.len()));
        }
        let mut stream = ChaCha20::new(&self.key, nonce)?;
        let mut block = [0u8; 64];
        stream.apply_keystream(&mut block);
        let mac = Poly1305::new(&block[..poly1305::KEY_SIZE]);
        block.zeroize();
        Ok((stream, mac?))
    }

    /// Encrypt `plaintext` into `dst` as `ciphertext || tag`, returning the bytes written.
    pub fn seal(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
        dst: &mut [u8],
    ) -> Result<usize> {
        let need = plaintext.len() + self.tag_size;
        if dst.len() < need {
            return Err(Error::BufferTooSmall {
                need,
                got: dst.len(),
            });
        }
        let (mut stream, mac) = self.start(nonce)?;

        let (ct, rest) = dst.split_at_mut(plaintext.len());
        stream.xor(plaintext, ct);
        let tag = authenticate(mac, aad, ct);
        rest[..self.tag_size].copy_from_slice(&tag[..self.tag_size]);
        Ok(need)
    }

    /// Check and decrypt `ciphertext || tag` into `dst`, returning the plaintext length.
    ///
    /// Nothing is written to `dst` unless the tag matches.
    pub fn open(
        &self,
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        dst: &mut [u8],
    ) -> Result<usize> {
        if ciphertext.len() < self.tag_size {
            return Err(Error::AuthenticationFailed);
        }
        let (ct, received) = ciphertext.split_at(ciphertext.len() - self.tag_size);
        if dst.len() < ct.len() {
            return Err(Error::BufferTooSmall {
                need: ct.len(),
                got: dst.len(),
            });
        }
        let (mut stream, mac) = self.start(nonce)?;

        let tag = authenticate(mac, aad, ct);
        check_tag(&tag[..self.tag_size], received)?;
        stream.xor(ct, &mut dst[..ct.len()]);
        Ok(ct.len())
    }
}

/// Poly1305 over `aad || pad16 || ciphertext || pad16 || len(aad) || len(ciphertext)`.
fn authenticate(mut mac: Poly1305, aad: &[u8], ciphertext: &[u8]) -> [u8; MAX_TAG_SIZE] {
    const ZEROS: [u8; 16] = [0; 16];

    mac.update(aad);
    mac.update(&ZEROS[..(16 - aad.len() % 16) % 16]);
    mac.update(ciphertext);
    mac.update(&ZEROS[..(16 - ciphertext.len() % 16) % 16]);
    mac.update(&(aad.len() as u64).to_le_bytes());
    mac.update(&(ciphertext.len() as u64).to_le_bytes());
    mac.finalize()
}
