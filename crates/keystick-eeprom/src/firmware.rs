//! Firmware + disk image assembly
//!
//! Pads the firmware binary with 0xFF up to the configured start address
//! and appends the (already encrypted) disk image, producing the combined
//! binary the device boots from. Pure byte-buffer operation; no key
//! material involved.

use std::path::Path;

use keystick_core::KeystickResult;

const FILL_BYTE: u8 = 0xFF;

/// Concatenate firmware and disk image with 0xFF fill up to `start_address`.
///
/// A firmware already longer than `start_address` is passed through without
/// padding; the image then lands past its expected offset, so this is
/// logged as a warning.
pub fn attach_image(firmware: &[u8], image: &[u8], start_address: usize) -> Vec<u8> {
    if firmware.len() > start_address {
        tracing::warn!(
            firmware_len = firmware.len(),
            start_address,
            "firmware overruns the image start address"
        );
    }

    let padded_len = firmware.len().max(start_address);
    let mut out = Vec::with_capacity(padded_len + image.len());
    out.extend_from_slice(firmware);
    out.resize(padded_len, FILL_BYTE);
    out.extend_from_slice(image);
    out
}

/// File-level wrapper around [`attach_image`].
pub fn attach_image_files(
    firmware_path: &Path,
    image_path: &Path,
    output_path: &Path,
    start_address: usize,
) -> KeystickResult<u64> {
    let firmware = std::fs::read(firmware_path)?;
    let image = std::fs::read(image_path)?;

    let combined = attach_image(&firmware, &image, start_address);
    std::fs::write(output_path, &combined)?;

    tracing::debug!(
        bytes = combined.len(),
        output = %output_path.display(),
        "combined firmware written"
    );
    Ok(combined.len() as u64)
}
