//! ESSIV per-sector IV derivation
//!
//! `iv(sector) = AES128(key = SHA256(master)[0..16], LE64(sector) ‖ zeros)`.
//!
//! The sector index encoding is pinned to a little-endian u64 zero-padded
//! to one AES block; anything host-dependent here would make images
//! unreadable across platforms.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use sha2::{Digest, Sha256};

use keystick_core::KEY_SIZE;

use crate::keywrap::MasterKey;

/// IV generator keyed by a master key.
///
/// The ESSIV key is computed once per master key and the expanded cipher is
/// reused across all sectors.
pub struct Essiv {
    cipher: Aes128,
}

impl Essiv {
    pub fn new(master: &MasterKey) -> Self {
        let digest = Sha256::digest(master.as_bytes());
        let cipher = Aes128::new(GenericArray::from_slice(&digest[..KEY_SIZE]));
        Self { cipher }
    }

    /// Derive the IV for a sector index. Pure: same index, same IV.
    pub fn iv_for(&self, sector: u64) -> [u8; KEY_SIZE] {
        let mut block = [0u8; KEY_SIZE];
        block[..8].copy_from_slice(&sector.to_le_bytes());
        self.cipher
            .encrypt_block(GenericArray::from_mut_slice(&mut block));
        block
    }
}
