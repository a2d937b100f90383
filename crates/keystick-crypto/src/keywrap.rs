//! Master key generation and single-block AES-128 wrap/unwrap
//!
//! The master key is the only key used for bulk sector encryption. It is
//! persisted solely in wrapped form: one AES-128 block encrypted under the
//! first 16 bytes of the derived key. Single-block (unchained) mode is
//! acceptable here only because exactly one block is ever wrapped; this
//! mode must never be reused for multi-block data.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use rand::RngCore;
use secrecy::SecretString;
use zeroize::Zeroize;

use keystick_core::{KeystickError, KeystickResult, KEY_SIZE};

use crate::stretch::{stretch, DerivedKey, StretchParams, Verifier};

/// The 128-bit bulk encryption key. Zeroized on drop.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The master key encrypted under the derived key: the only persisted copy
/// of the key material besides the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappedKey {
    bytes: [u8; KEY_SIZE],
}

impl WrappedKey {
    /// Accepts exactly 16 bytes of wrapped key material.
    pub fn from_bytes(bytes: &[u8]) -> KeystickResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| KeystickError::InvalidKeyLength(bytes.len()))?;
        Ok(Self { bytes })
    }

    /// Parses the 32-hex-character command-line form.
    pub fn from_hex(s: &str) -> KeystickResult<Self> {
        let decoded = hex::decode(s)?;
        Self::from_bytes(&decoded)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

/// Generate a random 128-bit master key.
pub fn generate_master_key() -> MasterKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    MasterKey::from_bytes(bytes)
}

/// Wrap (encrypt) the master key under the derived key.
pub fn wrap(master: &MasterKey, derived: &DerivedKey) -> WrappedKey {
    let cipher = Aes128::new(GenericArray::from_slice(derived.wrapping_key()));
    let mut block = GenericArray::clone_from_slice(master.as_bytes());
    cipher.encrypt_block(&mut block);
    WrappedKey { bytes: block.into() }
}

/// Unwrap (decrypt) a wrapped master key.
///
/// Block decryption always succeeds syntactically: a wrong derived key
/// yields a wrong master key with no error signal. Callers must go through
/// [`unlock`] before trusting the result.
pub fn unwrap_key(wrapped: &WrappedKey, derived: &DerivedKey) -> MasterKey {
    let cipher = Aes128::new(GenericArray::from_slice(derived.wrapping_key()));
    let mut block = GenericArray::clone_from_slice(wrapped.as_bytes());
    cipher.decrypt_block(&mut block);
    MasterKey::from_bytes(block.into())
}

/// Verified unlock: stretch the candidate passphrase, check its verifier
/// against the stored one, and only then unwrap the master key.
///
/// This is the mandatory pre-flight gate: without it a wrong passphrase
/// silently decrypts to a garbage master key and corrupts every sector
/// processed afterwards.
pub fn unlock(
    wrapped: &WrappedKey,
    passphrase: &SecretString,
    params: &StretchParams,
    expected: &Verifier,
) -> KeystickResult<MasterKey> {
    let (derived, verifier) = stretch(passphrase, params);
    if verifier != *expected {
        return Err(KeystickError::PassphraseIncorrect);
    }
    Ok(unwrap_key(wrapped, &derived))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn derived_from(passphrase: &str) -> (DerivedKey, Verifier) {
        stretch(
            &SecretString::from(passphrase),
            &StretchParams { iterations: 10 },
        )
    }

    #[test]
    fn test_master_key_generation_is_random() {
        let k1 = generate_master_key();
        let k2 = generate_master_key();
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let (derived, _) = derived_from("some passphrase");
        let master = generate_master_key();

        let wrapped = wrap(&master, &derived);
        let unwrapped = unwrap_key(&wrapped, &derived);

        assert_eq!(master.as_bytes(), unwrapped.as_bytes());
        assert_ne!(
            wrapped.as_bytes(),
            master.as_bytes(),
            "wrapped form must not equal the cleartext key"
        );
    }

    #[test]
    fn test_unwrap_wrong_derived_key() {
        let (derived1, _) = derived_from("passphrase-a");
        let (derived2, _) = derived_from("passphrase-b");
        let master = generate_master_key();

        let wrapped = wrap(&master, &derived1);
        let unwrapped = unwrap_key(&wrapped, &derived2);

        // No intrinsic failure signal; the result is simply wrong.
        assert_ne!(master.as_bytes(), unwrapped.as_bytes());
    }

    #[test]
    fn test_wrap_golden_vector() {
        // master = 00 01 .. 0f wrapped under "correct-horse" @ 1000 iterations
        let (derived, _) = stretch(
            &SecretString::from("correct-horse"),
            &StretchParams::default(),
        );
        let mut bytes = [0u8; KEY_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let wrapped = wrap(&MasterKey::from_bytes(bytes), &derived);

        assert_eq!(wrapped.to_hex(), "f2cfa95efc09e113ac9e0b5edd42948e");
    }

    #[test]
    fn test_wrapped_key_rejects_wrong_length() {
        assert!(matches!(
            WrappedKey::from_bytes(&[0u8; 15]),
            Err(KeystickError::InvalidKeyLength(15))
        ));
        assert!(matches!(
            WrappedKey::from_hex("abcd"),
            Err(KeystickError::InvalidKeyLength(2))
        ));
        assert!(WrappedKey::from_hex("not hex at all, not hex at all!!").is_err());
    }

    #[test]
    fn test_wrapped_key_hex_roundtrip() {
        let wrapped = WrappedKey::from_hex("f2cfa95efc09e113ac9e0b5edd42948e").unwrap();
        assert_eq!(wrapped.to_hex(), "f2cfa95efc09e113ac9e0b5edd42948e");
    }

    #[test]
    fn test_unlock_correct_passphrase() {
        let passphrase = SecretString::from("open-sesame");
        let params = StretchParams { iterations: 10 };
        let (derived, verifier) = stretch(&passphrase, &params);
        let master = generate_master_key();
        let wrapped = wrap(&master, &derived);

        let unlocked = unlock(&wrapped, &passphrase, &params, &verifier).unwrap();
        assert_eq!(master.as_bytes(), unlocked.as_bytes());
    }

    #[test]
    fn test_unlock_wrong_passphrase() {
        let params = StretchParams { iterations: 10 };
        let (derived, verifier) = stretch(&SecretString::from("open-sesame"), &params);
        let wrapped = wrap(&generate_master_key(), &derived);

        let result = unlock(&wrapped, &SecretString::from("open-seseme"), &params, &verifier);
        assert!(matches!(result, Err(KeystickError::PassphraseIncorrect)));
    }

    #[test]
    fn test_unlock_wrong_iteration_count() {
        // A mismatched cost parameter must fail the gate, not yield a key.
        let (derived, verifier) =
            stretch(&SecretString::from("open-sesame"), &StretchParams { iterations: 10 });
        let wrapped = wrap(&generate_master_key(), &derived);

        let result = unlock(
            &wrapped,
            &SecretString::from("open-sesame"),
            &StretchParams { iterations: 11 },
            &verifier,
        );
        assert!(matches!(result, Err(KeystickError::PassphraseIncorrect)));
    }

    proptest! {
        #[test]
        fn prop_wrap_roundtrip(master_bytes: [u8; KEY_SIZE]) {
            let (derived, _) = derived_from("prop-passphrase");
            let master = MasterKey::from_bytes(master_bytes);

            let unwrapped = unwrap_key(&wrap(&master, &derived), &derived);
            prop_assert_eq!(master.as_bytes(), unwrapped.as_bytes());
        }
    }
}
