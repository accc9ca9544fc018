//! Concurrency tests for the trainer binary.
//!
//! These tests verify that multiple processes can safely:
//! - Record workout sessions into the same store simultaneously
//! - Read history while other processes write

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

fn cli(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("trainer"));
    cmd.arg("--data-dir")
        .arg(root.join("data"))
        .arg("--config")
        .arg(root.join("config.toml"))
        .env("TRAINER_HASH_COST", "4")
        .env_remove("RUST_LOG");
    cmd
}

fn setup_signed_in() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "[feedback]\nsound = false\nhaptics = false\n")
        .expect("Failed to write config");

    cli(temp_dir.path())
        .args(["signup", "--email", "sam@example.com", "--password", "hunter22"])
        .assert()
        .success();
    cli(temp_dir.path()).arg("seed").assert().success();
    temp_dir
}

fn history_rows(root: &Path) -> usize {
    let out = root.join("count.csv");
    cli(root)
        .args(["history", "--export"])
        .arg(&out)
        .assert()
        .success();
    let csv = std::fs::read_to_string(&out).expect("Failed to read export");
    csv.lines().count() - 1
}

#[test]
fn test_concurrent_session_recording() {
    let temp_dir = setup_signed_in();
    let root: PathBuf = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let root = root.clone();
            thread::spawn(move || {
                cli(&root)
                    .args(["run", "hiit-blast", "--auto-complete", "--duration"])
                    .arg((60 + i).to_string())
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    // Every writer held the store lock, so no session was lost
    assert_eq!(history_rows(&root), 5);
}

#[test]
fn test_concurrent_reads_and_writes() {
    let temp_dir = setup_signed_in();
    let root: PathBuf = temp_dir.path().to_path_buf();

    let writer_root = root.clone();
    let writer = thread::spawn(move || {
        for _ in 0..3 {
            cli(&writer_root)
                .args(["weight", "add", "72.5"])
                .assert()
                .success();
        }
    });

    let reader_root = root.clone();
    let reader = thread::spawn(move || {
        for _ in 0..3 {
            // Readers never see a half-written store
            cli(&reader_root).args(["weight", "list"]).assert().success();
        }
    });

    writer.join().expect("Writer panicked");
    reader.join().expect("Reader panicked");

    let out = cli(&root).args(["weight", "list"]).output().unwrap();
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout.matches("72.5 kg").count(), 3);
}
