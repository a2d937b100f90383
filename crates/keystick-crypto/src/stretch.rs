//! Passphrase stretching: iterated SHA-256 → derived key + verification value

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use keystick_core::{KeystickResult, DIGEST_SIZE, KEY_SIZE};

/// Passphrase stretching parameters.
#[derive(Debug, Clone)]
pub struct StretchParams {
    /// SHA-256 iteration count (default: 1000).
    ///
    /// This is the brute-force cost parameter. It must match the count the
    /// EEPROM image was provisioned with; the low-cost companion variant
    /// uses 1, which degenerates to a single hash. Minimum effective value
    /// is 1.
    pub iterations: u32,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self { iterations: 1000 }
    }
}

/// A 256-bit key stretched from a passphrase.
///
/// Its first 16 bytes are the AES-128 key used to wrap the master key.
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: [u8; DIGEST_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.bytes
    }

    /// The AES-128 wrapping key: the first 16 bytes of the derived key.
    pub fn wrapping_key(&self) -> &[u8] {
        &self.bytes[..KEY_SIZE]
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The 32-byte verification value stored in EEPROM.
///
/// One-way function of the derived key; knowing it must not yield the
/// passphrase or the derived key. Not secret at rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verifier {
    bytes: [u8; DIGEST_SIZE],
}

impl Verifier {
    pub fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn from_hex(s: &str) -> KeystickResult<Self> {
        let mut bytes = [0u8; DIGEST_SIZE];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

/// Stretch a passphrase into a derived key and its verification value.
///
/// `derived = SHA256^iterations(passphrase)`; the verifier is the same
/// stretching procedure applied to the derived key's digest, so the two
/// values are computationally independent. Deterministic, no error path.
pub fn stretch(passphrase: &SecretString, params: &StretchParams) -> (DerivedKey, Verifier) {
    let derived = iterate_sha256(passphrase.expose_secret().as_bytes(), params.iterations);
    let verifier = iterate_sha256(&derived, params.iterations);
    (DerivedKey::from_bytes(derived), Verifier::from_bytes(verifier))
}

/// Hash `input` once, then re-hash the digest `iterations - 1` more times.
fn iterate_sha256(input: &[u8], iterations: u32) -> [u8; DIGEST_SIZE] {
    let mut digest: [u8; DIGEST_SIZE] = Sha256::digest(input).into();
    for _ in 1..iterations {
        digest = Sha256::digest(digest).into();
    }
    digest
}
