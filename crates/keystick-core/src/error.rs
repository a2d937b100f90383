use thiserror::Error;

pub type KeystickResult<T> = Result<T, KeystickError>;

#[derive(Debug, Error)]
pub enum KeystickError {
    #[error("wrapped key must be exactly 16 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("passphrases do not match")]
    PassphraseMismatch,

    #[error("passphrase incorrect: verification value mismatch")]
    PassphraseIncorrect,

    #[error("image length {0} is not a multiple of the {1}-byte sector size")]
    MalformedImageLength(u64, usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
