//! Sector-streamed AES-128-CBC disk image transform
//!
//! The image is processed in 512-byte sectors in increasing index order
//! starting at 0. Each sector gets its own ESSIV-derived IV, so sectors are
//! independently decryptable and seekable; corrupting one ciphertext sector
//! cannot affect any other sector's plaintext.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use keystick_core::{KeystickError, KeystickResult, KEY_SIZE, SECTOR_SIZE};

use crate::essiv::Essiv;
use crate::keywrap::MasterKey;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encrypt,
    Decrypt,
}

/// Called once per processed sector with the number of sectors done so far.
pub type ProgressFn<'a> = dyn Fn(u64) + 'a;

/// Transform a disk image stream sector by sector.
///
/// Returns the number of sectors processed. A trailing chunk shorter than
/// [`SECTOR_SIZE`] is rejected with [`KeystickError::MalformedImageLength`]:
/// CBC over a partial block is undefined, and no padding convention exists
/// in the deployed image format.
pub fn process_image<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    master: &MasterKey,
    mode: Mode,
    progress: Option<&ProgressFn>,
) -> KeystickResult<u64> {
    let essiv = Essiv::new(master);
    let mut buf = [0u8; SECTOR_SIZE];
    let mut sector: u64 = 0;

    loop {
        let filled = read_sector(&mut input, &mut buf)?;
        if filled == 0 {
            break;
        }
        if filled < SECTOR_SIZE {
            return Err(KeystickError::MalformedImageLength(
                sector * SECTOR_SIZE as u64 + filled as u64,
                SECTOR_SIZE,
            ));
        }

        let iv = essiv.iv_for(sector);
        transform_sector(&mut buf, master, &iv, mode);
        output.write_all(&buf)?;

        sector += 1;
        tracing::trace!(sector, "sector processed");
        if let Some(report) = progress {
            report(sector);
        }
    }

    output.flush()?;
    Ok(sector)
}

/// File-level wrapper: validates the image length up front, writes to a
/// temporary file in the destination directory, and renames into place on
/// success so an interrupted run never leaves partial ciphertext at the
/// output path.
pub fn process_image_file(
    input: &Path,
    output: &Path,
    master: &MasterKey,
    mode: Mode,
    progress: Option<&ProgressFn>,
) -> KeystickResult<u64> {
    let len = std::fs::metadata(input)?.len();
    if len % SECTOR_SIZE as u64 != 0 {
        return Err(KeystickError::MalformedImageLength(len, SECTOR_SIZE));
    }

    let reader = BufReader::new(File::open(input)?);
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    let mut writer = BufWriter::new(tmp);

    let sectors = process_image(reader, &mut writer, master, mode, progress)?;

    let tmp = writer
        .into_inner()
        .map_err(|e| KeystickError::Io(e.into_error()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(output)
        .map_err(|e| KeystickError::Io(e.error))?;

    tracing::debug!(sectors, output = %output.display(), "image written");
    Ok(sectors)
}

/// CBC-transform one full sector in place.
fn transform_sector(buf: &mut [u8; SECTOR_SIZE], master: &MasterKey, iv: &[u8; KEY_SIZE], mode: Mode) {
    match mode {
        Mode::Encrypt => {
            let mut cipher = Aes128CbcEnc::new(
                GenericArray::from_slice(master.as_bytes()),
                GenericArray::from_slice(iv),
            );
            for block in buf.chunks_exact_mut(KEY_SIZE) {
                cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
            }
        }
        Mode::Decrypt => {
            let mut cipher = Aes128CbcDec::new(
                GenericArray::from_slice(master.as_bytes()),
                GenericArray::from_slice(iv),
            );
            for block in buf.chunks_exact_mut(KEY_SIZE) {
                cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
            }
        }
    }
}

/// Fill `buf` from the reader, tolerating short reads. Returns the number
/// of bytes read; less than a full sector only at end of input.
fn read_sector<R: Read>(input: &mut R, buf: &mut [u8; SECTOR_SIZE]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < SECTOR_SIZE {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
