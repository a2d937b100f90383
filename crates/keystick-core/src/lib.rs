pub mod config;
pub mod error;

pub use error::{KeystickError, KeystickResult};

/// Size of one disk image sector in bytes.
pub const SECTOR_SIZE: usize = 512;

/// Size of the master key and of one AES block (AES-128).
pub const KEY_SIZE: usize = 16;

/// Size of a SHA-256 digest (derived key, verifier).
pub const DIGEST_SIZE: usize = 32;
