//! sealstream: chunked authenticated file encryption
//!
//! Commands:
//!   run -i <file>                  - generate a key, encrypt, save the key, decrypt and verify;
//!                                    outputs land next to the input
//!   keygen <out>                   - write a fresh raw 32-byte key
//!   encrypt <in> <out> --key <k>   - encrypt a file with an existing key
//!   decrypt <in> <out> --key <k>   - authenticate and decrypt a file
//!   config show                    - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use sealstream_core::{load_key, save_key, OutputPaths, SealConfig};
use sealstream_crypto::{
    decrypt_stream_with, encrypt_stream_with, KeyMaterial, StreamOptions, StreamSummary,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealstream",
    version,
    about = "Chunked authenticated file encryption",
    long_about = "sealstream: encrypt files as a stream of XChaCha20-Poly1305 chunks that \
                  detects tampering, reordering and truncation"
)]
struct Cli {
    /// Path to sealstream.toml configuration file
    #[arg(long, short = 'c', env = "SEALSTREAM_CONFIG", default_value = "sealstream.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "SEALSTREAM_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "SEALSTREAM_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file, save its key, then decrypt it again as a check
    ///
    /// Writes `encrypted`, `key` and `decrypted` into the input's directory
    /// (names configurable under [output]).
    Run {
        /// Input file
        #[arg(long, short = 'i')]
        input: PathBuf,
    },

    /// Generate a new random key and write it as raw bytes
    Keygen {
        /// Key file to create (overwritten if present)
        output: PathBuf,
    },

    /// Encrypt a file with an existing key
    Encrypt {
        input: PathBuf,
        output: PathBuf,
        /// Raw key file
        #[arg(long, short = 'k')]
        key: PathBuf,
    },

    /// Authenticate and decrypt a file; partial output is removed on failure
    Decrypt {
        input: PathBuf,
        output: PathBuf,
        /// Raw key file
        #[arg(long, short = 'k')]
        key: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn from_config(format: &str) -> Self {
        match format {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, loaded) = load_config(&cli.config).await?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| LogFormat::from_config(&config.log.format));
    init_logging(&level, &format);

    if !loaded {
        warn!(
            "config file not found: {}  (using defaults)",
            cli.config.display()
        );
    }

    match cli.command {
        Commands::Run { input } => cmd_run(&config, &input).await,
        Commands::Keygen { output } => cmd_keygen(&output),
        Commands::Encrypt { input, output, key } => {
            cmd_encrypt(&config, &input, &output, &key).await
        }
        Commands::Decrypt { input, output, key } => {
            cmd_decrypt(&config, &input, &output, &key).await
        }
        Commands::Config { action: ConfigAction::Show } => {
            cmd_config_show(&config, &cli.config, loaded)
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Load and validate the config; the flag reports whether the file existed.
async fn load_config(path: &Path) -> Result<(SealConfig, bool)> {
    if !path.exists() {
        return Ok((SealConfig::default(), false));
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config: {}", path.display()))?;
    let config: SealConfig = toml::from_str(&content)
        .with_context(|| format!("parsing config: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating config: {}", path.display()))?;
    Ok((config, true))
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for command output
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── File pipeline ─────────────────────────────────────────────────────────────

/// Encrypt `input` into `output`, removing `output` again if the stream could
/// not be written to the end.
fn encrypt_file(
    key: &KeyMaterial,
    input: &Path,
    output: &Path,
    opts: StreamOptions,
) -> Result<StreamSummary> {
    let source =
        File::open(input).with_context(|| format!("opening input: {}", input.display()))?;
    let sink = File::create(output)
        .with_context(|| format!("creating output: {}", output.display()))?;

    match encrypt_stream_with(key, source, BufWriter::new(sink), opts) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            remove_partial(output);
            Err(e).with_context(|| format!("encrypting {}", input.display()))
        }
    }
}

/// Decrypt `input` into `output`, removing `output` again if the stream does
/// not verify to the end.
fn decrypt_file(
    key: &KeyMaterial,
    input: &Path,
    output: &Path,
    opts: StreamOptions,
) -> Result<StreamSummary> {
    let source =
        File::open(input).with_context(|| format!("opening input: {}", input.display()))?;
    let sink = File::create(output)
        .with_context(|| format!("creating output: {}", output.display()))?;

    match decrypt_stream_with(key, source, BufWriter::new(sink), opts) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            remove_partial(output);
            if e.is_integrity_failure() {
                warn!(input = %input.display(), "ciphertext rejected: {e}");
                Err(e).with_context(|| format!("{} failed verification", input.display()))
            } else {
                Err(e).with_context(|| format!("decrypting {}", input.display()))
            }
        }
    }
}

fn remove_partial(output: &Path) {
    if let Err(rm) = std::fs::remove_file(output) {
        warn!(path = %output.display(), "failed to remove partial output: {rm}");
    }
}

// ── `sealstream run` ──────────────────────────────────────────────────────────

async fn cmd_run(config: &SealConfig, input: &Path) -> Result<()> {
    let paths = OutputPaths::for_input(input, &config.output)?;
    info!(
        input = %input.display(),
        encrypted = %paths.encrypted.display(),
        decrypted = %paths.decrypted.display(),
        key = %paths.key.display(),
        "resolved output paths"
    );

    let opts = config.stream_options();
    let input_owned = input.to_path_buf();
    let task_paths = paths.clone();
    let (sealed, opened) = tokio::task::spawn_blocking(move || -> Result<_> {
        let key = KeyMaterial::generate().context("generating stream key")?;

        let sealed = encrypt_file(&key, &input_owned, &task_paths.encrypted, opts)?;
        info!(chunks = sealed.chunks, bytes = sealed.bytes, "encrypted");

        save_key(&task_paths.key, &key)?;
        info!(path = %task_paths.key.display(), "key saved");

        let opened = decrypt_file(&key, &task_paths.encrypted, &task_paths.decrypted, opts)?;
        info!(chunks = opened.chunks, bytes = opened.bytes, "decrypted");
        Ok((sealed, opened))
    })
    .await
    .context("encryption task panicked")??;

    anyhow::ensure!(
        sealed == opened,
        "round trip mismatch: encrypted {} bytes in {} chunks, decrypted {} bytes in {} chunks",
        sealed.bytes,
        sealed.chunks,
        opened.bytes,
        opened.chunks
    );

    println!(
        "  encrypted: {} ({} in {} chunks)",
        paths.encrypted.display(),
        fmt_bytes(sealed.bytes),
        sealed.chunks
    );
    println!("  decrypted: {}", paths.decrypted.display());
    println!("  key:       {}", paths.key.display());
    Ok(())
}

// ── `sealstream keygen` ───────────────────────────────────────────────────────

fn cmd_keygen(output: &Path) -> Result<()> {
    let key = KeyMaterial::generate().context("generating key")?;
    save_key(output, &key)?;
    println!("  key: {}", output.display());
    Ok(())
}

// ── `sealstream encrypt` / `sealstream decrypt` ───────────────────────────────

async fn cmd_encrypt(config: &SealConfig, input: &Path, output: &Path, key_path: &Path) -> Result<()> {
    let key = load_key(key_path)?;
    let opts = config.stream_options();
    let (input_owned, output_owned) = (input.to_path_buf(), output.to_path_buf());

    let summary = tokio::task::spawn_blocking(move || {
        encrypt_file(&key, &input_owned, &output_owned, opts)
    })
    .await
    .context("encryption task panicked")??;

    info!(chunks = summary.chunks, bytes = summary.bytes, "encrypted");
    println!(
        "  encrypted: {} ({} in {} chunks)",
        output.display(),
        fmt_bytes(summary.bytes),
        summary.chunks
    );
    Ok(())
}

async fn cmd_decrypt(config: &SealConfig, input: &Path, output: &Path, key_path: &Path) -> Result<()> {
    let key = load_key(key_path)?;
    let opts = config.stream_options();
    let (input_owned, output_owned) = (input.to_path_buf(), output.to_path_buf());

    let summary = tokio::task::spawn_blocking(move || {
        decrypt_file(&key, &input_owned, &output_owned, opts)
    })
    .await
    .context("decryption task panicked")??;

    info!(chunks = summary.chunks, bytes = summary.bytes, "decrypted");
    println!(
        "  decrypted: {} ({} in {} chunks)",
        output.display(),
        fmt_bytes(summary.bytes),
        summary.chunks
    );
    Ok(())
}

// ── `sealstream config show` ──────────────────────────────────────────────────

fn cmd_config_show(config: &SealConfig, config_path: &Path, loaded: bool) -> Result<()> {
    if loaded {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(10_000), "9.8 KB");
        assert_eq!(fmt_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["sealstream", "run", "-i", "/tmp/file.bin"]).unwrap();
        match cli.command {
            Commands::Run { input } => assert_eq!(input, PathBuf::from("/tmp/file.bin")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_requires_key_for_decrypt() {
        assert!(Cli::try_parse_from(["sealstream", "decrypt", "a", "b"]).is_err());
    }

    #[test]
    fn test_log_format_from_config() {
        assert!(matches!(LogFormat::from_config("json"), LogFormat::Json));
        assert!(matches!(LogFormat::from_config("text"), LogFormat::Text));
    }

    #[test]
    fn test_encrypt_file_removes_partial_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("sealed");
        let key = KeyMaterial::from_bytes([3u8; 32]);

        // A directory opens fine but fails on the first read.
        let err = encrypt_file(&key, tmp.path(), &output, StreamOptions::default());
        assert!(err.is_err());
        assert!(!output.exists(), "partial ciphertext must be removed");
    }

    #[tokio::test]
    async fn test_load_config_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (config, loaded) = load_config(&tmp.path().join("absent.toml")).await.unwrap();
        assert!(!loaded);
        assert_eq!(config, SealConfig::default());
    }

    #[tokio::test]
    async fn test_load_config_rejects_invalid_values() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sealstream.toml");
        std::fs::write(&path, "[stream]\nchunk_size = 0\n").unwrap();
        assert!(load_config(&path).await.is_err());
    }
}
