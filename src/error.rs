use thiserror::Error;

/// Everything that can go wrong when constructing or using a primitive.
///
/// All variants except [`Error::AuthenticationFailed`] are raised before any
/// data is processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid key size: {0} bytes")]
    InvalidKeySize(usize),
    #[error("invalid nonce size: {0} bytes")]
    InvalidNonceSize(usize),
    #[error("invalid tweak size: {0} bytes")]
    InvalidTweakSize(usize),
    #[error("invalid tag size: {0} bytes")]
    InvalidTagSize(usize),
    /// A hash size, salt, personalization or block size is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The tag did not match. No plaintext was released.
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("output buffer too small: need {need} bytes, got {got}")]
    BufferTooSmall { need: usize, got: usize },
}

pub type Result<T> = core::result::Result<T, Error>;
