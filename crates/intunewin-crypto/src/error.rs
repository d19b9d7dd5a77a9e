use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// The OS entropy source failed. Not retried.
    #[error("secure random source unavailable: {0}")]
    RandomSource(#[from] rand::Error),

    /// A key, IV, or length did not match the fixed parameter sizes.
    #[error("invalid {what} size: expected {expected} bytes, got {actual}")]
    InvalidParameterSize {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("reading plaintext: {0}")]
    Io(#[from] std::io::Error),
}
