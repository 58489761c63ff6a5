//! Byte packing and comparison helpers shared by every primitive.
use crate::error::{Error, Result};
use subtle::{Choice, ConstantTimeEq};

/// Compare two tags without leaking where they differ.
///
/// Slices of different length never match; the length itself is public.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut ok = Choice::from(1);
    for (x, y) in a.iter().zip(b) {
        ok &= x.ct_eq(y);
    }
    bool::from(ok)
}

/// Like [`ct_eq`], but shaped for `verify` helpers.
pub(crate) fn check_tag(expected: &[u8], received: &[u8]) -> Result<()> {
    if ct_eq(expected, received) {
        Ok(())
    } else {
        Err(Error::AuthenticationFailed)
    }
}

#[inline(always)]
pub(crate) fn load_u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[inline(always)]
pub(crate) fn load_u64_le(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

#[inline(always)]
pub(crate) fn load_u32_be(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

#[inline(always)]
pub(crate) fn store_u32_le(out: &mut [u8], v: u32) {
    out[..4].copy_from_slice(&v.to_le_bytes());
}

#[inline(always)]
pub(crate) fn store_u64_le(out: &mut [u8], v: u64) {
    out[..8].copy_from_slice(&v.to_le_bytes());
}

#[inline(always)]
pub(crate) fn store_u32_be(out: &mut [u8], v: u32) {
    out[..4].copy_from_slice(&v.to_be_bytes());
}

/// Unpack `bytes` into little-endian words. `bytes` must hold `words.len() * 8` bytes.
pub(crate) fn words_from_le(words: &mut [u64], bytes: &[u8]) {
    for (w, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
        *w = load_u64_le(chunk);
    }
}

pub(crate) fn words_to_le(bytes: &mut [u8], words: &[u64]) {
    for (chunk, w) in bytes.chunks_exact_mut(8).zip(words) {
        store_u64_le(chunk, *w);
    }
}

/// Increment a big-endian counter of arbitrary width, wrapping at the top.
pub(crate) fn increment_be(counter: &mut [u8]) {
    for b in counter.iter_mut().rev() {
        *b = b.wrapping_add(1);
        if *b != 0 {
            break;
        }
    }
}

pub(crate) fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
