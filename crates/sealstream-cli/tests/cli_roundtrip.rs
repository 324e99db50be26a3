//! Drives the `sealstream` binary end to end against temporary files.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn sealstream(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sealstream"))
        .arg("--config")
        .arg(config_dir.join("absent.toml"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn sealstream")
}

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(31) ^ (i >> 5)) as u8)
        .collect()
}

#[test]
fn run_writes_sibling_outputs() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input.bin");
    let original = make_data(10_000);
    std::fs::write(&input, &original).unwrap();

    let out = sealstream(tmp.path(), &["run", "-i", input.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let encrypted = std::fs::read(tmp.path().join("encrypted")).unwrap();
    let decrypted = std::fs::read(tmp.path().join("decrypted")).unwrap();
    let key = std::fs::read(tmp.path().join("key")).unwrap();

    assert_eq!(decrypted, original);
    assert_eq!(key.len(), 32);
    // header + three chunks of overhead
    assert_eq!(encrypted.len(), 24 + 10_000 + 3 * 17);
}

#[test]
fn run_handles_empty_input() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("empty");
    std::fs::write(&input, b"").unwrap();

    let out = sealstream(tmp.path(), &["run", "-i", input.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    assert_eq!(std::fs::read(tmp.path().join("encrypted")).unwrap().len(), 24 + 17);
    assert!(std::fs::read(tmp.path().join("decrypted")).unwrap().is_empty());
}

#[test]
fn run_rejects_missing_input() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing");
    let out = sealstream(tmp.path(), &["run", "-i", missing.to_str().unwrap()]);
    assert!(!out.status.success());
}

#[test]
fn keygen_encrypt_decrypt() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let key = dir.join("k");
    let plain = dir.join("plain");
    let sealed = dir.join("sealed");
    let opened = dir.join("opened");
    std::fs::write(&plain, make_data(50_000)).unwrap();

    let (key, plain, sealed_s, opened_s) = (
        key.to_str().unwrap(),
        plain.to_str().unwrap(),
        sealed.to_str().unwrap(),
        opened.to_str().unwrap(),
    );
    assert!(sealstream(dir, &["keygen", key]).status.success());
    assert!(sealstream(dir, &["encrypt", plain, sealed_s, "--key", key])
        .status
        .success());
    assert!(sealstream(dir, &["decrypt", sealed_s, opened_s, "--key", key])
        .status
        .success());

    assert_eq!(std::fs::read(&opened).unwrap(), std::fs::read(&plain).unwrap());
}

#[test]
fn decrypt_of_tampered_file_fails_and_leaves_no_output() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let key = dir.join("k");
    let plain = dir.join("plain");
    let sealed = dir.join("sealed");
    let opened = dir.join("opened");
    std::fs::write(&plain, make_data(20_000)).unwrap();

    let (key, plain, sealed_s, opened_s) = (
        key.to_str().unwrap(),
        plain.to_str().unwrap(),
        sealed.to_str().unwrap(),
        opened.to_str().unwrap(),
    );
    assert!(sealstream(dir, &["keygen", key]).status.success());
    assert!(sealstream(dir, &["encrypt", plain, sealed_s, "--key", key])
        .status
        .success());

    let mut bytes = std::fs::read(&sealed).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    std::fs::write(&sealed, &bytes).unwrap();

    let out = sealstream(dir, &["decrypt", sealed_s, opened_s, "--key", key]);
    assert!(!out.status.success());
    assert!(!opened.exists(), "partial plaintext must be removed");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("failed verification"), "stderr: {stderr}");
}

#[test]
fn config_show_prints_defaults() {
    let tmp = TempDir::new().unwrap();
    let out = sealstream(tmp.path(), &["config", "show"]);
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("chunk_size = 4096"), "{stdout}");
    assert!(stdout.contains("encrypted_name = \"encrypted\""), "{stdout}");
}
