//! Intel-HEX EEPROM encoder
//!
//! EEPROM layout, fixed by the device firmware:
//! ```text
//! 0x0000..0x0010  verifier[0..16]
//! 0x0010..0x0020  verifier[16..32]
//! 0x0020..0x0030  wrapped master key
//! ```
//! Three `:10<addr>00<data><checksum>` data records followed by the
//! standard `:00000001FF` end-of-file record. The checksum is the
//! two's complement of the low byte of the sum over byte count, address,
//! record type, and data.

use std::io::Write;
use std::path::Path;

use keystick_core::KeystickResult;
use keystick_crypto::{Verifier, WrappedKey};

const RECORD_LEN: usize = 16;
const EOF_RECORD: &str = ":00000001FF";

/// Encode the verifier and wrapped key as an Intel-HEX record set.
pub fn encode_intel_hex(verifier: &Verifier, wrapped: &WrappedKey) -> String {
    let v = verifier.as_bytes();
    let mut out = String::new();
    out.push_str(&data_record(0x0000, &v[..RECORD_LEN]));
    out.push('\n');
    out.push_str(&data_record(0x0010, &v[RECORD_LEN..]));
    out.push('\n');
    out.push_str(&data_record(0x0020, wrapped.as_bytes()));
    out.push('\n');
    out.push_str(EOF_RECORD);
    out.push('\n');
    out
}

/// Write the record set to `path`, surfacing any I/O failure.
pub fn write_intel_hex(path: &Path, verifier: &Verifier, wrapped: &WrappedKey) -> KeystickResult<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(encode_intel_hex(verifier, wrapped).as_bytes())?;
    file.sync_all()?;
    tracing::debug!(path = %path.display(), "EEPROM hex file written");
    Ok(())
}

/// One 16-byte data record at `addr`.
fn data_record(addr: u16, data: &[u8]) -> String {
    debug_assert_eq!(data.len(), RECORD_LEN);

    let mut sum = data.len() as u8;
    sum = sum.wrapping_add((addr >> 8) as u8).wrapping_add(addr as u8);
    for b in data {
        sum = sum.wrapping_add(*b);
    }
    let checksum = sum.wrapping_neg();

    format!(
        ":{:02X}{:04X}00{}{:02X}",
        data.len(),
        addr,
        hex::encode_upper(data),
        checksum
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_scenario() {
        // Known-answer scenario: verifier = 32 x 0xAB, wrapped key = 16 x 0xCD
        let verifier = Verifier::from_bytes([0xAB; 32]);
        let wrapped = WrappedKey::from_bytes(&[0xCD; 16]).unwrap();

        let encoded = encode_intel_hex(&verifier, &wrapped);
        let lines: Vec<&str> = encoded.lines().collect();

        assert_eq!(
            lines,
            vec![
                ":10000000ABABABABABABABABABABABABABABABAB40",
                ":10001000ABABABABABABABABABABABABABABABAB30",
                ":10002000CDCDCDCDCDCDCDCDCDCDCDCDCDCDCDCD00",
                ":00000001FF",
            ]
        );

        // Every record's full byte sum, checksum included, is 0 mod 256.
        for line in &lines {
            let bytes = hex::decode(&line[1..]).unwrap();
            let sum: u32 = bytes.iter().map(|b| *b as u32).sum();
            assert_eq!(sum % 256, 0, "record checksum invalid: {line}");
        }
    }

    #[test]
    fn test_provisioned_golden_records() {
        // "correct-horse" verifier at 1000 iterations, master 00..0f wrapped
        let verifier = Verifier::from_hex(
            "7acc2bb3c1eab9d834c113b45044ef678cd1e0bc7df18f97484711a6724a2b23",
        )
        .unwrap();
        let wrapped = WrappedKey::from_hex("f2cfa95efc09e113ac9e0b5edd42948e").unwrap();

        assert_eq!(
            encode_intel_hex(&verifier, &wrapped),
            ":100000007ACC2BB3C1EAB9D834C113B45044EF67EA\n\
             :100010008CD1E0BC7DF18F97484711A6724A2B2303\n\
             :10002000F2CFA95EFC09E113AC9E0B5EDD42948E1B\n\
             :00000001FF\n"
        );
    }

    #[test]
    fn test_record_addresses_fixed() {
        let encoded = encode_intel_hex(
            &Verifier::from_bytes([0; 32]),
            &WrappedKey::from_bytes(&[0; 16]).unwrap(),
        );
        let lines: Vec<&str> = encoded.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(":10000000"));
        assert!(lines[1].starts_with(":10001000"));
        assert!(lines[2].starts_with(":10002000"));
        assert_eq!(lines[3], ":00000001FF");
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.eep");
        let verifier = Verifier::from_bytes([0x11; 32]);
        let wrapped = WrappedKey::from_bytes(&[0x22; 16]).unwrap();

        write_intel_hex(&path, &verifier, &wrapped).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, encode_intel_hex(&verifier, &wrapped));
    }

    #[test]
    fn test_write_to_unwritable_path_fails() {
        let verifier = Verifier::from_bytes([0; 32]);
        let wrapped = WrappedKey::from_bytes(&[0; 16]).unwrap();
        let result = write_intel_hex(
            Path::new("/nonexistent-dir/out.eep"),
            &verifier,
            &wrapped,
        );
        assert!(result.is_err());
    }
}
