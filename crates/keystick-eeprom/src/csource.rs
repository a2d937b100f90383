//! C source EEPROM encoder
//!
//! Companion format to the Intel-HEX encoder: the same two values as
//! `uint8_t EEMEM` array declarations compiled straight into the firmware.
//! The declaration layout (decimal bytes, trailing comma, hex comment) is
//! fixed by the firmware build that consumes it.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use keystick_core::KeystickResult;
use keystick_crypto::{Verifier, WrappedKey};

/// Encode the wrapped key and verifier as C array declarations.
pub fn encode_c_source(verifier: &Verifier, wrapped: &WrappedKey) -> String {
    let mut out = String::new();
    push_array(&mut out, "aes_key_encrypted", wrapped.as_bytes());
    push_array(&mut out, "passphrase_hash_hash", verifier.as_bytes());
    out
}

/// Write the declarations to `path`, surfacing any I/O failure.
pub fn write_c_source(path: &Path, verifier: &Verifier, wrapped: &WrappedKey) -> KeystickResult<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(encode_c_source(verifier, wrapped).as_bytes())?;
    file.sync_all()?;
    tracing::debug!(path = %path.display(), "EEPROM C source file written");
    Ok(())
}

fn push_array(out: &mut String, name: &str, data: &[u8]) {
    let _ = write!(out, "uint8_t EEMEM {name}[] = {{");
    for b in data {
        let _ = write!(out, "{b},");
    }
    let _ = writeln!(out, "}}; // {}", hex::encode(data));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_declaration_format() {
        let wrapped = WrappedKey::from_hex("000102030405060708090a0b0c0dfeff").unwrap();
        let verifier = Verifier::from_bytes([0xAB; 32]);

        let encoded = encode_c_source(&verifier, &wrapped);
        let lines: Vec<&str> = encoded.lines().collect();

        assert_eq!(
            lines[0],
            "uint8_t EEMEM aes_key_encrypted[] = {0,1,2,3,4,5,6,7,8,9,10,11,12,13,254,255,}; \
             // 000102030405060708090a0b0c0dfeff"
        );
        assert!(lines[1].starts_with(
            "uint8_t EEMEM passphrase_hash_hash[] = {171,171,"
        ));
        assert!(lines[1].ends_with(&format!("}}; // {}", "ab".repeat(32))));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeprom_contents.c");
        let verifier = Verifier::from_bytes([3; 32]);
        let wrapped = WrappedKey::from_bytes(&[4; 16]).unwrap();

        write_c_source(&path, &verifier, &wrapped).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            encode_c_source(&verifier, &wrapped)
        );
    }
}
