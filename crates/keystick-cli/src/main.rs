//! keystick: provisioning CLI for passphrase-protected encrypted stick images
//!
//! Commands:
//!   image   - encrypt or decrypt a disk image sector by sector
//!   eeprom  - emit the EEPROM record set (Intel-HEX or C source)
//!   attach  - splice an encrypted disk image into a firmware binary

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

use keystick_core::config::KeystickConfig;
use keystick_core::{KeystickError, SECTOR_SIZE};
use keystick_crypto::{
    generate_master_key, process_image_file, stretch, unlock, wrap, MasterKey, Mode,
    StretchParams, Verifier, WrappedKey,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "keystick",
    version,
    about = "Encrypted-stick provisioning tool",
    long_about = "keystick: derive keys from a passphrase, encrypt disk images \
                  sector by sector, and emit the EEPROM/firmware artifacts"
)]
struct Cli {
    /// Path to keystick.toml configuration file
    #[arg(long, short = 'c', env = "KEYSTICK_CONFIG", default_value = "keystick.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt (default) or decrypt a disk image
    ///
    /// Prompts for the passphrase twice. With --key, the existing wrapped
    /// master key is unlocked instead of generating a fresh one; --verify
    /// must then carry the stored verification value so a wrong passphrase
    /// fails up front instead of producing garbage sectors.
    Image {
        /// Input disk image path (default from config)
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
        /// Output image path, overwritten on success (default from config)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Existing wrapped master key, 32 hex chars
        #[arg(long, short = 'k')]
        key: Option<String>,
        /// Stored verification value, 64 hex chars (required with --key)
        #[arg(long)]
        verify: Option<String>,
        /// Decrypt instead of encrypt; requires --key
        #[arg(long, short = 'd')]
        decrypt: bool,
        /// Do not write the EEPROM C source file
        #[arg(long, short = 'N')]
        no_eeprom: bool,
        /// EEPROM C source output path (default from config)
        #[arg(long, short = 'e')]
        eeprom_file: Option<PathBuf>,
    },

    /// Emit the EEPROM record set for the current or a fresh key
    Eeprom {
        /// Existing wrapped master key, 32 hex chars
        #[arg(long, short = 'k')]
        key: Option<String>,
        /// Stored verification value, 64 hex chars (required with --key)
        #[arg(long)]
        verify: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = EepromFormat::Hex)]
        format: EepromFormat,
        /// Print the wrapped key and verifier without writing a file
        #[arg(long, short = 'N')]
        no_eeprom: bool,
        /// Output path (default from config, per format)
        #[arg(long, short = 'e')]
        eeprom_file: Option<PathBuf>,
    },

    /// Attach a disk image to a firmware binary
    Attach {
        /// Firmware binary path (default from config)
        #[arg(long, short = 'f')]
        firmware: Option<PathBuf>,
        /// Disk image path (default from config)
        #[arg(long, short = 'i')]
        image: Option<PathBuf>,
        /// Combined output path, overwritten (default from config)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Byte offset where the image begins in the output
        #[arg(long)]
        start_address: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EepromFormat {
    /// Intel-HEX record set for EEPROM programmers
    Hex,
    /// C source array declarations for firmware builds
    C,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(&config.stretch.log_level);

    match cli.command {
        Commands::Image {
            input,
            output,
            key,
            verify,
            decrypt,
            no_eeprom,
            eeprom_file,
        } => cmd_image(
            &config,
            input.as_deref(),
            output.as_deref(),
            key.as_deref(),
            verify.as_deref(),
            decrypt,
            no_eeprom,
            eeprom_file.as_deref(),
        ),
        Commands::Eeprom {
            key,
            verify,
            format,
            no_eeprom,
            eeprom_file,
        } => cmd_eeprom(
            &config,
            key.as_deref(),
            verify.as_deref(),
            format,
            no_eeprom,
            eeprom_file.as_deref(),
        ),
        Commands::Attach {
            firmware,
            image,
            output,
            start_address,
        } => cmd_attach(
            &config,
            firmware.as_deref(),
            image.as_deref(),
            output.as_deref(),
            start_address,
        ),
    }
}

// ── Config loading / logging ──────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<KeystickConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(KeystickConfig::default())
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

// ── Passphrase prompt + provisioning ──────────────────────────────────────────

/// Prompt for the passphrase twice; the two entries must match.
fn prompt_passphrase() -> Result<SecretString> {
    let mut passphrase =
        rpassword::prompt_password("Passphrase: ").context("reading passphrase")?;
    let mut check =
        rpassword::prompt_password("Repeat passphrase: ").context("reading confirmation")?;

    let matched = passphrase == check;
    check.zeroize();
    if !matched {
        passphrase.zeroize();
        return Err(KeystickError::PassphraseMismatch.into());
    }
    Ok(SecretString::from(passphrase))
}

/// The artifacts of one provisioning run. The master key stays in memory
/// only for the lifetime of the command and is zeroized on drop.
struct Provisioned {
    master: MasterKey,
    wrapped: WrappedKey,
    verifier: Verifier,
}

/// Prompt for the passphrase and either unlock an existing wrapped key
/// (through the verification gate) or generate and wrap a fresh one.
fn provision(
    key_hex: Option<&str>,
    verify_hex: Option<&str>,
    params: &StretchParams,
) -> Result<Provisioned> {
    let passphrase = prompt_passphrase()?;

    match key_hex {
        Some(k) => {
            let wrapped = WrappedKey::from_hex(k).context("parsing --key")?;
            let verify_hex = verify_hex.context(
                "--verify is required with --key: without the stored verification value, \
                 a wrong passphrase would silently unwrap a garbage master key",
            )?;
            let expected = Verifier::from_hex(verify_hex).context("parsing --verify")?;
            let master = unlock(&wrapped, &passphrase, params, &expected)?;
            tracing::info!("passphrase verified, master key unlocked");
            Ok(Provisioned {
                master,
                wrapped,
                verifier: expected,
            })
        }
        None => {
            let (derived, verifier) = stretch(&passphrase, params);
            let master = generate_master_key();
            let wrapped = wrap(&master, &derived);
            tracing::info!("fresh master key generated and wrapped");
            Ok(Provisioned {
                master,
                wrapped,
                verifier,
            })
        }
    }
}

fn print_artifacts(p: &Provisioned) {
    println!("wrapped master key: {}", p.wrapped.to_hex());
    println!("verification value: {}", p.verifier.to_hex());
}

// ── `keystick image` ──────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn cmd_image(
    config: &KeystickConfig,
    input: Option<&Path>,
    output: Option<&Path>,
    key: Option<&str>,
    verify: Option<&str>,
    decrypt: bool,
    no_eeprom: bool,
    eeprom_file: Option<&Path>,
) -> Result<()> {
    if decrypt && key.is_none() {
        anyhow::bail!("--key is required for decrypting");
    }

    let input = input.unwrap_or(&config.image.input);
    let output = output.unwrap_or(&config.image.output);
    let params = StretchParams {
        iterations: config.stretch.iterations,
    };

    let provisioned = provision(key, verify, &params)?;
    print_artifacts(&provisioned);

    let mode = if decrypt { Mode::Decrypt } else { Mode::Encrypt };
    let len = std::fs::metadata(input)
        .with_context(|| format!("reading image: {}", input.display()))?
        .len();

    println!(
        "{} {} → {}",
        if decrypt { "Decrypting" } else { "Encrypting" },
        input.display(),
        output.display(),
    );

    let pb = make_progress_bar(len / SECTOR_SIZE as u64, "sectors");
    let report = |done: u64| pb.set_position(done);
    let sectors = process_image_file(input, output, &provisioned.master, mode, Some(&report))
        .with_context(|| format!("processing {}", input.display()))?;
    pb.finish_with_message("done");

    println!("  sectors: {sectors}");

    if !no_eeprom {
        let c_file = eeprom_file.unwrap_or(&config.eeprom.c_file);
        keystick_eeprom::write_c_source(c_file, &provisioned.verifier, &provisioned.wrapped)
            .with_context(|| format!("writing EEPROM C source: {}", c_file.display()))?;
        println!("  eeprom:  {}", c_file.display());
    }

    Ok(())
}

// ── `keystick eeprom` ─────────────────────────────────────────────────────────

fn cmd_eeprom(
    config: &KeystickConfig,
    key: Option<&str>,
    verify: Option<&str>,
    format: EepromFormat,
    no_eeprom: bool,
    eeprom_file: Option<&Path>,
) -> Result<()> {
    let params = StretchParams {
        iterations: config.stretch.iterations,
    };

    let provisioned = provision(key, verify, &params)?;
    print_artifacts(&provisioned);

    if no_eeprom {
        return Ok(());
    }

    match format {
        EepromFormat::Hex => {
            let path = eeprom_file.unwrap_or(&config.eeprom.hex_file);
            keystick_eeprom::write_intel_hex(path, &provisioned.verifier, &provisioned.wrapped)
                .with_context(|| format!("writing EEPROM hex file: {}", path.display()))?;
            println!("eeprom hex: {}", path.display());
        }
        EepromFormat::C => {
            let path = eeprom_file.unwrap_or(&config.eeprom.c_file);
            keystick_eeprom::write_c_source(path, &provisioned.verifier, &provisioned.wrapped)
                .with_context(|| format!("writing EEPROM C source: {}", path.display()))?;
            println!("eeprom C source: {}", path.display());
        }
    }

    Ok(())
}

// ── `keystick attach` ─────────────────────────────────────────────────────────

fn cmd_attach(
    config: &KeystickConfig,
    firmware: Option<&Path>,
    image: Option<&Path>,
    output: Option<&Path>,
    start_address: Option<u32>,
) -> Result<()> {
    let firmware = firmware.unwrap_or(&config.firmware.firmware);
    let image = image.unwrap_or(&config.image.output);
    let output = output.unwrap_or(&config.firmware.output);
    let start_address = start_address.unwrap_or(config.firmware.start_address) as usize;

    let bytes = keystick_eeprom::attach_image_files(firmware, image, output, start_address)
        .with_context(|| {
            format!(
                "attaching {} to {}",
                image.display(),
                firmware.display()
            )
        })?;

    println!(
        "Wrote {} ({} bytes, image at 0x{:04X})",
        output.display(),
        bytes,
        start_address
    );
    Ok(())
}

// ── Progress bar ──────────────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb
}
