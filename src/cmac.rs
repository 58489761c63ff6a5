//! CMAC (OMAC1) over any [`BlockCipher`] with a 64 to 1024-bit block.
use crate::error::{Error, Result};
use crate::util::{check_tag, xor_in_place};
use crate::{BlockCipher, Mac};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const MAX_BLOCK_SIZE: usize = 128;

/// The reduction constant for doubling in GF(2^(8 * block_size)).
fn polynomial(block_size: usize) -> Option<u32> {
    match block_size {
        8 => Some(0x1B),
        16 => Some(0x87),
        32 => Some(0x425),
        64 => Some(0x125),
        128 => Some(0x80043),
        _ => None,
    }
}

/// Multiply `x` by the generator, treating it as a big-endian polynomial.
fn double(x: &mut [u8], poly: u32) {
    let mask = 0u8.wrapping_sub(x[0] >> 7);
    for i in 0..x.len() - 1 {
        x[i] = (x[i] << 1) | (x[i + 1] >> 7);
    }
    let last = x.len() - 1;
    x[last] <<= 1;

    let n = x.len();
    for (b, p) in x[n - 4..].iter_mut().zip(poly.to_be_bytes()) {
        *b ^= p & mask;
    }
}

/// A streaming CMAC computation.
#[derive(Clone)]
pub struct Cmac<C: BlockCipher> {
    cipher: C,
    k1: [u8; MAX_BLOCK_SIZE],
    k2: [u8; MAX_BLOCK_SIZE],
    /// The CBC chaining value.
    state: [u8; MAX_BLOCK_SIZE],
    buf: [u8; MAX_BLOCK_SIZE],
    off: usize,
    block_size: usize,
}

impl<C: BlockCipher> Cmac<C> {
    /// Derive the subkeys for `cipher`.
    ///
    /// Ciphers whose block size has no listed reduction polynomial are rejected.
    pub fn new(cipher: C) -> Result<Self> {
        let bs = cipher.block_size();
        let poly = polynomial(bs).ok_or(Error::InvalidConfig("unsupported CMAC block size"))?;

        let mut k1 = [0u8; MAX_BLOCK_SIZE];
        cipher.encrypt_block(&mut k1[..bs]);
        double(&mut k1[..bs], poly);
        let mut k2 = k1;
        double(&mut k2[..bs], poly);

        Ok(Self {
            cipher,
            k1,
            k2,
            state: [0; MAX_BLOCK_SIZE],
            buf: [0; MAX_BLOCK_SIZE],
            off: 0,
            block_size: bs,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub(crate) fn cipher(&self) -> &C {
        &self.cipher
    }

    pub fn update(&mut self, mut data: &[u8]) {
        let bs = self.block_size;
        while !data.is_empty() {
            // A full buffer is only chained once more input shows it is not the last block.
            if self.off == bs {
                xor_in_place(&mut self.state[..bs], &self.buf[..bs]);
                self.cipher.encrypt_block(&mut self.state[..bs]);
                self.off = 0;
            }
            let n = data.len().min(bs - self.off);
            self.buf[self.off..self.off + n].copy_from_slice(&data[..n]);
            self.off += n;
            data = &data[n..];
        }
    }

    /// Write the full-width tag into `out`, which must be `block_size()` bytes.
    pub fn finalize_into(&self, out: &mut [u8]) {
        let bs = self.block_size;
        assert_eq!(out.len(), bs, "CMAC output must be one block");

        let mut last = [0u8; MAX_BLOCK_SIZE];
        last[..self.off].copy_from_slice(&self.buf[..self.off]);
        if self.off == bs {
            xor_in_place(&mut last[..bs], &self.k1[..bs]);
        } else {
            last[self.off] = 0x80;
            xor_in_place(&mut last[..bs], &self.k2[..bs]);
        }

        out.copy_from_slice(&self.state[..bs]);
        xor_in_place(out, &last[..bs]);
        self.cipher.encrypt_block(out);
        last.zeroize();
    }

    pub fn reset(&mut self) {
        self.state.zeroize();
        self.buf.zeroize();
        self.off = 0;
    }

    /// Compare against a possibly truncated tag in constant time.
    pub fn verify(&self, tag: &[u8]) -> Result<()> {
        let mut expected = [0u8; MAX_BLOCK_SIZE];
        self.finalize_into(&mut expected[..self.block_size]);
        let n = tag.len().min(self.block_size);
        let res = if tag.is_empty() {
            Err(Error::AuthenticationFailed)
        } else {
            check_tag(&expected[..n], tag)
        };
        expected.zeroize();
        res
    }
}

impl<C: BlockCipher> Drop for Cmac<C> {
    fn drop(&mut self) {
        self.k1.zeroize();
        self.k2.zeroize();
        self.state.zeroize();
        self.buf.zeroize();
    }
}

impl<C: BlockCipher> ZeroizeOnDrop for Cmac<C> {}

impl<C: BlockCipher> Mac for Cmac<C> {
    fn update(&mut self, data: &[u8]) {
        Cmac::update(self, data)
    }

    fn output_size(&self) -> usize {
        self.block_size
    }

    fn finalize_into(&self, out: &mut [u8]) {
        Cmac::finalize_into(self, out)
    }

    fn reset(&mut self) {
        Cmac::reset(self)
    }

    fn verify(&self, tag: &[u8]) -> Result<()> {
        Cmac::verify(self, tag)
    }
}

/// One-shot CMAC of `msg` under `cipher`, written to the first block of `out`.
pub fn sum<C: BlockCipher>(cipher: C, msg: &[u8], out: &mut [u8]) -> Result<()> {
    let bs = cipher.block_size();
    if out.len() < bs {
        return Err(Error::BufferTooSmall {
            need: bs,
            got: out.len(),
        });
    }
    let mut mac = Cmac::new(cipher)?;
    mac.update(msg);
    mac.finalize_into(&mut out[..bs]);
    Ok(())
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::camellia::Camellia;
    use crate::serpent::Serpent;
    use crate::threefish::{Threefish1024, Threefish256, Threefish512};
    use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};

    /// AES-128 behind the crate's block cipher trait, for published vectors.
    pub(crate) struct Aes128(aes::Aes128);

    impl Aes128 {
        pub(crate) fn new(key: &[u8]) -> Self {
            Self(aes::Aes128::new(GenericArray::from_slice(key)))
        }
    }

    impl BlockCipher for Aes128 {
        fn block_size(&self) -> usize {
            16
        }

        fn encrypt_block(&self, block: &mut [u8]) {
            self.0.encrypt_block(GenericArray::from_mut_slice(block));
        }

        fn decrypt_block(&self, block: &mut [u8]) {
            self.0.decrypt_block(GenericArray::from_mut_slice(block));
        }
    }

    const NIST_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
    const NIST_MSG: &str = "6bc1bee22e409f96e93d7e117393172a\
                            ae2d8a571e03ac9c9eb76fac45af8e51\
                            30c81c46a35ce411e5fbc1191a0a52ef\
                            f69f2445df4f9b17ad2b417be66c3710";

    fn nist_mac() -> Cmac<Aes128> {
        Cmac::new(Aes128::new(&hex::decode(NIST_KEY).unwrap())).unwrap()
    }

    #[test]
    fn test_nist_subkeys() {
        let mac = nist_mac();
        assert_eq!(hex::encode(&mac.k1[..16]), "fbeed618357133667c85e08f7236a8de");
        assert_eq!(hex::encode(&mac.k2[..16]), "f7ddac306ae266ccf90bc11ee46d513b");
    }

    #[test]
    fn test_nist_aes128_vectors() {
        let msg = hex::decode(NIST_MSG).unwrap();
        let cases = [
            (0, "bb1d6929e95937287fa37d129b756746"),
            (16, "070a16b46b4d4144f79bdd9dd04a287c"),
            (40, "dfa66747de9ae63030ca32611497c827"),
            (64, "51f0bebf7e3b9d92fc49741779363cfe"),
        ];
        for (len, want) in cases {
            let mut mac = nist_mac();
            mac.update(&msg[..len]);
            let mut tag = [0u8; 16];
            mac.finalize_into(&mut tag);
            assert_eq!(hex::encode(tag), want, "length {}", len);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let msg = hex::decode(NIST_MSG).unwrap();
        let mut mac = nist_mac();
        for b in &msg[..40] {
            mac.update(core::slice::from_ref(b));
        }
        let mut tag = [0u8; 16];
        mac.finalize_into(&mut tag);
        assert_eq!(hex::encode(tag), "dfa66747de9ae63030ca32611497c827");
    }

    #[test]
    fn test_reset_and_verify() {
        let msg = hex::decode(NIST_MSG).unwrap();
        let mut mac = nist_mac();
        mac.update(b"unrelated");
        mac.reset();
        mac.update(&msg[..16]);
        let tag = hex::decode("070a16b46b4d4144f79bdd9dd04a287c").unwrap();
        assert!(mac.verify(&tag).is_ok());
        assert!(mac.verify(&tag[..8]).is_ok());
        assert_eq!(mac.verify(&tag[..0]), Err(Error::AuthenticationFailed));
        let mut bad = tag.clone();
        bad[0] ^= 1;
        assert_eq!(mac.verify(&bad), Err(Error::AuthenticationFailed));
    }

    #[test]
    fn test_double_reduces_on_carry() {
        let mut x = [0u8; 16];
        x[0] = 0x80;
        double(&mut x, 0x87);
        let mut want = [0u8; 16];
        want[15] = 0x87;
        assert_eq!(x, want);

        let mut x = [0u8; 8];
        x[7] = 0x01;
        double(&mut x, 0x1B);
        assert_eq!(x, [0, 0, 0, 0, 0, 0, 0, 0x02]);
    }

    #[test]
    fn test_other_ciphers() {
        let msg = b"CMAC is not tied to any one block cipher";
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        sum(Camellia::new(&[7; 16]).unwrap(), msg, &mut a).unwrap();
        sum(Serpent::new(&[7; 16]).unwrap(), msg, &mut b).unwrap();
        assert_ne!(a, b);

        let tweak = [0u8; 16];
        let mut t256 = [0u8; 32];
        let mut t512 = [0u8; 64];
        let mut t1024 = [0u8; 128];
        sum(Threefish256::new(&[1; 32], &tweak).unwrap(), msg, &mut t256).unwrap();
        sum(Threefish512::new(&[1; 64], &tweak).unwrap(), msg, &mut t512).unwrap();
        sum(Threefish1024::new(&[1; 128], &tweak).unwrap(), msg, &mut t1024).unwrap();
        assert_ne!(t256, [0u8; 32]);
        assert_ne!(t512[..32], t256);
    }

    #[test]
    fn test_cipher_by_reference() {
        let cipher = Camellia::new(&[9; 32]).unwrap();
        let mut by_ref = [0u8; 16];
        let mut by_val = [0u8; 16];
        sum(&cipher, b"msg", &mut by_ref).unwrap();
        sum(cipher, b"msg", &mut by_val).unwrap();
        assert_eq!(by_ref, by_val);
    }

    struct OddBlock;

    impl BlockCipher for OddBlock {
        fn block_size(&self) -> usize {
            12
        }
        fn encrypt_block(&self, _: &mut [u8]) {}
        fn decrypt_block(&self, _: &mut [u8]) {}
    }

    #[test]
    fn test_unsupported_block_size() {
        assert!(matches!(Cmac::new(OddBlock), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_sum_output_size() {
        let key = hex::decode(NIST_KEY).unwrap();
        assert_eq!(
            sum(Aes128::new(&key), b"", &mut [0u8; 8]),
            Err(Error::BufferTooSmall { need: 16, got: 8 })
        );

        let mut wide = [0xEEu8; 32];
        assert_eq!(sum(Aes128::new(&key), b"", &mut wide), Ok(()));
        assert_eq!(hex::encode(&wide[..16]), "bb1d6929e95937287fa37d129b756746");
        assert_eq!(wide[16..], [0xEE; 16]);
    }
}
