//! keystick-eeprom: serialization of provisioning artifacts
//!
//! Two encoders emit the verification value and the wrapped master key for
//! the device's EEPROM — an Intel-HEX record set for EEPROM-programming
//! tools and a C byte-array source file for firmware builds — plus the
//! utility that splices a disk image into a firmware binary. All three are
//! bit-exact external formats; none touch cleartext key material.

pub mod csource;
pub mod firmware;
pub mod intelhex;

pub use csource::{encode_c_source, write_c_source};
pub use firmware::{attach_image, attach_image_files};
pub use intelhex::{encode_intel_hex, write_intel_hex};
