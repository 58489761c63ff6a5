//! The EAX mode of operation: CTR encryption plus three domain-separated CMACs.
//!
//! ```text
//! N' = OMAC_0(nonce)   H = OMAC_1(aad)   C = CTR_{N'}(plaintext)
//! tag = (N' ^ H ^ OMAC_2(C))[..tag_size]
//! ```
use crate::cmac::{Cmac, MAX_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::util::{check_tag, increment_be, xor_in_place};
use crate::BlockCipher;
use zeroize::Zeroize;

/// An EAX instance with a fixed key and tag size.
pub struct Eax<C: BlockCipher> {
    mac: Cmac<C>,
    tag_size: usize,
}

impl<C: BlockCipher> Eax<C> {
    /// Use the full block as the tag.
    pub fn new(cipher: C) -> Result<Self> {
        let bs = cipher.block_size();
        Self::with_tag_size(cipher, bs)
    }

    pub fn with_tag_size(cipher: C, tag_size: usize) -> Result<Self> {
        let mac = Cmac::new(cipher)?;
        if tag_size == 0 || tag_size > mac.block_size() {
            return Err(Error::InvalidTagSize(tag_size));
        }
        Ok(Self { mac, tag_size })
    }

    /// Nonces are exactly one cipher block.
    pub fn nonce_size(&self) -> usize {
        self.mac.block_size()
    }

    pub fn tag_size(&self) -> usize {
        self.tag_size
    }

    /// CMAC of `[0; B - 1] || domain || data`, from a fresh state.
    fn omac(&mut self, domain: u8, data: &[u8], out: &mut [u8]) {
        let bs = self.mac.block_size();
        let mut prefix = [0u8; MAX_BLOCK_SIZE];
        prefix[bs - 1] = domain;

        self.mac.reset();
        self.mac.update(&prefix[..bs]);
        self.mac.update(data);
        self.mac.finalize_into(&mut out[..bs]);
    }

    fn ctr(&self, start: &[u8], input: &[u8], output: &mut [u8]) {
        let bs = self.mac.block_size();
        let mut counter = [0u8; MAX_BLOCK_SIZE];
        counter[..bs].copy_from_slice(start);
        let mut keystream = [0u8; MAX_BLOCK_SIZE];

        for (src, dst) in input.chunks(bs).zip(output.chunks_mut(bs)) {
            keystream[..bs].copy_from_slice(&counter[..bs]);
            self.mac.cipher().encrypt_block(&mut keystream[..bs]);
            dst.copy_from_slice(src);
            xor_in_place(dst, &keystream[..src.len()]);
            increment_be(&mut counter[..bs]);
        }
        keystream.zeroize();
    }

    /// The full-width tag for `ciphertext`, with `n` holding OMAC_0(nonce).
    fn tag(&mut self, n: &[u8], aad: &[u8], ciphertext: &[u8]) -> [u8; MAX_BLOCK_SIZE] {
        let bs = self.mac.block_size();
        let mut tag = [0u8; MAX_BLOCK_SIZE];
        let mut part = [0u8; MAX_BLOCK_SIZE];

        self.omac(1, aad, &mut tag);
        self.omac(2, ciphertext, &mut part);
        xor_in_place(&mut tag[..bs], &part[..bs]);
        xor_in_place(&mut tag[..bs], n);
        tag
    }

    /// Encrypt `plaintext` into `dst` as `ciphertext || tag`, returning the bytes written.
    pub fn seal(
        &mut self,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
        dst: &mut [u8],
    ) -> Result<usize> {
        let bs = self.mac.block_size();
        if nonce.len() != bs {
            return Err(Error::InvalidNonceSize(nonce.len()));
        }
        let need = plaintext.len() + self.tag_size;
        if dst.len() < need {
            return Err(Error::BufferTooSmall {
                need,
                got: dst.len(),
            });
        }

        let mut n = [0u8; MAX_BLOCK_SIZE];
        self.omac(0, nonce, &mut n);

        let (ct, rest) = dst.split_at_mut(plaintext.len());
        self.ctr(&n[..bs], plaintext, ct);
        let tag = self.tag(&n[..bs], aad, ct);
        rest[..self.tag_size].copy_from_slice(&tag[..self.tag_size]);

        n.zeroize();
        Ok(need)
    }

    /// Check and decrypt `ciphertext || tag` into `dst`, returning the plaintext length.
    ///
    /// Nothing is written to `dst` unless the tag matches.
    pub fn open(
        &mut self,
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        dst: &mut [u8],
    ) -> Result<usize> {
        let bs = self.mac.block_size();
        if nonce.len() != bs {
            return Err(Error::InvalidNonceSize(nonce.len()));
        }
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

        let mut n = [0u8; MAX_BLOCK_SIZE];
        self.omac(0, nonce, &mut n);
        let tag = self.tag(&n[..bs], aad, ct);
        let res = check_tag(&tag[..self.tag_size], received);
        if res.is_ok() {
            self.ctr(&n[..bs], ct, &mut dst[..ct.len()]);
        }

        n.zeroize();
        res.map(|()| ct.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cmac::test::Aes128;
    use crate::serpent::Serpent;
    use crate::threefish::Threefish512;

    fn eax(key: &str) -> Eax<Aes128> {
        Eax::new(Aes128::new(&hex::decode(key).unwrap())).unwrap()
    }

    #[test]
    fn test_eax_paper_empty_message() {
        let mut e = eax("233952DEE4D5ED5F9B9C6D6FF80FF478");
        let nonce = hex::decode("62EC67F9C3A4A407FCB2A8C49031A8B3").unwrap();
        let aad = hex::decode("6BFB914FD07EAE6B").unwrap();
        let mut out = [0u8; 16];
        assert_eq!(e.seal(&nonce, b"", &aad, &mut out), Ok(16));
        assert_eq!(hex::encode_upper(out), "E037830E8389F27B025A2D6527E79D01");

        let mut empty = [0u8; 0];
        assert_eq!(e.open(&nonce, &out, &aad, &mut empty), Ok(0));
    }

    #[test]
    fn test_eax_paper_two_bytes() {
        let mut e = eax("91945D3F4DCBEE0BF45EF52255F095A4");
        let nonce = hex::decode("BECAF043B0A23D843194BA972C66DEBD").unwrap();
        let aad = hex::decode("FA3BFD4806EB53FA").unwrap();
        let msg = hex::decode("F7FB").unwrap();
        let mut out = [0u8; 18];
        assert_eq!(e.seal(&nonce, &msg, &aad, &mut out), Ok(18));
        assert_eq!(hex::encode_upper(out), "19DD5C4C9331049D0BDAB0277408F67967E5");

        let mut plain = [0u8; 2];
        assert_eq!(e.open(&nonce, &out, &aad, &mut plain), Ok(2));
        assert_eq!(plain[..], msg[..]);
    }

    #[test]
    fn test_tampering_is_rejected_without_output() {
        let mut e = Eax::with_tag_size(Serpent::new(&[5; 32]).unwrap(), 12).unwrap();
        let nonce = [1u8; 16];
        let msg = b"a message that spans more than one block";
        let mut sealed = vec![0u8; msg.len() + 12];
        e.seal(&nonce, msg, b"hdr", &mut sealed).unwrap();

        let mut plain = vec![0xAAu8; msg.len()];
        for i in [0, msg.len(), sealed.len() - 1] {
            let mut bad = sealed.clone();
            bad[i] ^= 0x04;
            assert_eq!(
                e.open(&nonce, &bad, b"hdr", &mut plain),
                Err(Error::AuthenticationFailed)
            );
            assert!(plain.iter().all(|&b| b == 0xAA));
        }
        assert_eq!(
            e.open(&nonce, &sealed, b"hdX", &mut plain),
            Err(Error::AuthenticationFailed)
        );
        assert_eq!(
            e.open(&[2u8; 16], &sealed, b"hdr", &mut plain),
            Err(Error::AuthenticationFailed)
        );

        assert_eq!(e.open(&nonce, &sealed, b"hdr", &mut plain), Ok(msg.len()));
        assert_eq!(&plain[..], &msg[..]);
    }

    #[test]
    fn test_wide_block_cipher() {
        let cipher = Threefish512::new(&[3; 64], &[0; 16]).unwrap();
        let mut e = Eax::new(cipher).unwrap();
        assert_eq!(e.nonce_size(), 64);
        assert_eq!(e.tag_size(), 64);

        let nonce = [9u8; 64];
        let msg = [0x5Au8; 150];
        let mut sealed = [0u8; 150 + 64];
        e.seal(&nonce, &msg, b"", &mut sealed).unwrap();
        let mut plain = [0u8; 150];
        e.open(&nonce, &sealed, b"", &mut plain).unwrap();
        assert_eq!(plain, msg);
    }

    #[test]
    fn test_argument_errors() {
        let aes = || Aes128::new(&[0; 16]);
        assert_eq!(Eax::with_tag_size(aes(), 0).err(), Some(Error::InvalidTagSize(0)));
        assert_eq!(Eax::with_tag_size(aes(), 17).err(), Some(Error::InvalidTagSize(17)));

        let mut e = Eax::new(aes()).unwrap();
        let mut out = [0u8; 32];
        assert_eq!(e.seal(&[0; 12], b"", b"", &mut out), Err(Error::InvalidNonceSize(12)));
        assert_eq!(e.open(&[0; 12], &out, b"", &mut out.clone()), Err(Error::InvalidNonceSize(12)));
        assert_eq!(
            e.seal(&[0; 16], &[0; 20], b"", &mut out),
            Err(Error::BufferTooSmall { need: 36, got: 32 })
        );
        assert_eq!(e.open(&[0; 16], &[0; 8], b"", &mut out), Err(Error::AuthenticationFailed));
    }
}
