use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level tool configuration (loaded from keystick.toml).
///
/// Every field has a default matching the behavior of deployed EEPROM
/// images, so a missing config file is equivalent to an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystickConfig {
    pub stretch: StretchConfig,
    pub image: ImageConfig,
    pub eeprom: EepromConfig,
    pub firmware: FirmwareConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StretchConfig {
    /// SHA-256 iteration count for passphrase stretching (default: 1000).
    ///
    /// Changing this breaks compatibility with EEPROM images provisioned
    /// under the old count; the companion low-cost tool variant uses 1.
    pub iterations: u32,
    /// Log level (default: info)
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Default input disk image path
    pub input: PathBuf,
    /// Default output disk image path
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EepromConfig {
    /// Intel-HEX EEPROM output path
    pub hex_file: PathBuf,
    /// C source EEPROM output path
    pub c_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// Default firmware binary path
    pub firmware: PathBuf,
    /// Default combined firmware+image output path
    pub output: PathBuf,
    /// Byte offset where the disk image begins in the combined binary
    pub start_address: u32,
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            log_level: "info".into(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("image.bin"),
            output: PathBuf::from("image.bin.out"),
        }
    }
}

impl Default for EepromConfig {
    fn default() -> Self {
        Self {
            hex_file: PathBuf::from("keystick.eep"),
            c_file: PathBuf::from("eeprom_contents.c"),
        }
    }
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            firmware: PathBuf::from("keystick.bin"),
            output: PathBuf::from("FIRMWARE.BIN"),
            start_address: 0x6000,
        }
    }
}
