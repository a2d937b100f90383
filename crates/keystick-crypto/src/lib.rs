//! keystick-crypto: passphrase-based provisioning of a sector-encrypted disk image
//!
//! Key hierarchy:
//! ```text
//! Passphrase (never persisted)
//!   └── DerivedKey (256-bit, SHA-256 iterated `iterations` times)
//!       ├── Verifier (same stretch applied to SHA256(DerivedKey); stored in EEPROM)
//!       └── AES-128 wrapping key (DerivedKey[0..16])
//!           └── MasterKey (128-bit random, stored only wrapped)
//!               ├── ESSIV key (SHA256(MasterKey)[0..16])
//!               │   └── IV(sector) = AES(essiv_key, LE64(sector) ‖ zero pad)
//!               └── Sector cipher: AES-128-CBC (key=MasterKey, iv=IV(sector))
//! ```
//!
//! Sectors are 512 bytes and independently decryptable: the IV depends only
//! on the sector index and the master key, never on prior ciphertext.

pub mod essiv;
pub mod image;
pub mod keywrap;
pub mod stretch;

pub use essiv::Essiv;
pub use image::{process_image, process_image_file, Mode};
pub use keywrap::{generate_master_key, unlock, unwrap_key, wrap, MasterKey, WrappedKey};
pub use stretch::{stretch, DerivedKey, StretchParams, Verifier};
