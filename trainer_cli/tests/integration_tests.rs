//! Integration tests for the trainer binary.
//!
//! These tests verify end-to-end behavior including:
//! - Account sign-up, sign-in and sign-out
//! - Running a workout and recording it in history
//! - History sorting, export and reset
//! - Weight tracking and advice

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const EMAIL: &str = "sam@example.com";
const PASSWORD: &str = "hunter22";

/// A scratch data directory with a quiet config
struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("config.toml"), "[feedback]\nsound = false\nhaptics = false\n")
            .expect("Failed to write config");
        Self { dir }
    }

    /// Signed up, signed in and with the built-in workouts loaded
    fn signed_in() -> Self {
        let env = Self::new();
        env.cli()
            .args(["signup", "--email", EMAIL, "--password", PASSWORD])
            .assert()
            .success();
        env.cli().arg("seed").assert().success();
        env
    }

    fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn cli(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("trainer"));
        cmd.arg("--data-dir")
            .arg(self.data_dir())
            .arg("--config")
            .arg(self.dir.path().join("config.toml"))
            .env("TRAINER_HASH_COST", "4")
            .env_remove("TRAINER_PASSWORD")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run_workout(&self, workout_id: &str, seconds: u64) {
        self.cli()
            .args(["run", workout_id, "--auto-complete", "--duration"])
            .arg(seconds.to_string())
            .assert()
            .success()
            .stdout(predicate::str::contains("Session logged"));
    }

    fn store(&self) -> Value {
        let text = fs::read_to_string(self.data_dir().join("store.json")).expect("Failed to read store");
        serde_json::from_str(&text).expect("Store is not JSON")
    }
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("trainer"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Guided workouts, history and weight tracking",
        ));
}

#[test]
fn test_signup_login_logout() {
    let env = TestEnv::new();

    env.cli()
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in."));

    env.cli()
        .args(["signup", "--email", EMAIL, "--password", PASSWORD])
        .assert()
        .success()
        .stdout(predicate::str::contains("Account created for sam@example.com"));

    env.cli()
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains(EMAIL));

    env.cli().arg("logout").assert().success();
    env.cli()
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in."));

    // Password from the environment; new accounts are told to fill in a profile
    env.cli()
        .args(["login", "--email", EMAIL])
        .env("TRAINER_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as sam@example.com"))
        .stdout(predicate::str::contains("profile is incomplete"));

    // Passwords are never stored in the clear
    let accounts = fs::read_to_string(env.data_dir().join("accounts.json")).unwrap();
    assert!(!accounts.contains(PASSWORD));
}

#[test]
fn test_auth_failures() {
    let env = TestEnv::signed_in();

    env.cli()
        .args(["signup", "--email", EMAIL, "--password", PASSWORD])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    env.cli()
        .args(["login", "--email", EMAIL, "--password", "wrong-password"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Auth"));

    env.cli()
        .args(["signup", "--email", "new@example.com", "--password", "short"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 6 characters"));
}

#[test]
fn test_signed_out_commands_need_identity() {
    let env = TestEnv::new();
    env.cli().arg("seed").assert().success();

    for args in [vec!["history"], vec!["weight", "list"], vec!["run", "yoga-flow", "--auto-complete"]] {
        env.cli()
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("NoIdentity"));
    }
}

#[test]
fn test_workouts_listing() {
    let env = TestEnv::new();

    env.cli()
        .arg("workouts")
        .assert()
        .success()
        .stdout(predicate::str::contains("trainer seed"));

    env.cli()
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 5 workouts"));

    env.cli()
        .arg("workouts")
        .assert()
        .success()
        .stdout(predicate::str::contains("yoga-flow"))
        .stdout(predicate::str::contains("HIIT Blast"));
}

#[test]
fn test_run_records_history() {
    let env = TestEnv::signed_in();

    env.cli()
        .args(["run", "full-body-beginner", "--auto-complete", "--duration", "1500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Step 1/5: Jumping Jacks"))
        .stdout(predicate::str::contains("Video: https://"))
        .stdout(predicate::str::contains("No video available for this step."))
        .stdout(predicate::str::contains("Session time: 25:00"));

    env.cli()
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("Full Body Beginner"))
        .stdout(predicate::str::contains("Session: 25.0 min"))
        .stdout(predicate::str::contains("Intense"));

    let store = env.store();
    let history = store["collections"]["workout_history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["duration_seconds"], 1500);
    assert_eq!(history[0]["workout_id"], "full-body-beginner");
}

#[test]
fn test_run_unknown_workout_fails() {
    let env = TestEnv::signed_in();

    env.cli()
        .args(["run", "no-such-workout", "--auto-complete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
}

#[test]
fn test_history_export_csv() {
    let env = TestEnv::signed_in();
    env.run_workout("yoga-flow", 600);
    env.run_workout("hiit-blast", 900);

    let out = env.dir.path().join("history.csv");
    env.cli()
        .args(["history", "--export"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 entries"));

    let csv = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Title,Type,Duration (min),Calories,Session Time (min),Weight (kg),Completed At"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().any(|l| l.starts_with("HIIT Blast,HIIT,15,250,15.0,--,")));
    assert!(lines.iter().any(|l| l.starts_with("Yoga Flow,Yoga,20,120,10.0,--,")));
}

#[test]
fn test_history_sort_is_remembered() {
    let env = TestEnv::signed_in();
    env.run_workout("yoga-flow", 1200);
    env.run_workout("hiit-blast", 300);

    env.cli()
        .args(["history", "--sort", "duration"])
        .assert()
        .success();

    let prefs = fs::read_to_string(env.data_dir().join("prefs.json")).unwrap();
    assert!(prefs.contains("duration_seconds"));

    // Longest first without passing --sort again
    let out = env.cli().arg("history").output().unwrap();
    let stdout = String::from_utf8(out.stdout).unwrap();
    let yoga = stdout.find("Yoga Flow").unwrap();
    let hiit = stdout.find("HIIT Blast").unwrap();
    assert!(yoga < hiit, "expected Yoga Flow first:\n{}", stdout);
}

#[test]
fn test_history_reset_needs_confirmation() {
    let env = TestEnv::signed_in();
    env.run_workout("yoga-flow", 60);

    env.cli().args(["history", "--reset"]).assert().failure();

    env.cli()
        .args(["history", "--reset", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 history entries"));

    env.cli()
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No workouts completed yet."));
}

#[test]
fn test_weight_tracking() {
    let env = TestEnv::signed_in();

    env.cli()
        .args(["weight", "add", "82"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Intensity: High"))
        .stdout(predicate::str::contains("trainer run hiit-blast"));
    env.cli().args(["weight", "add", "80.5"]).assert().success();

    env.cli()
        .args(["weight", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("82.0 kg"))
        .stdout(predicate::str::contains("Change since last: -1.5 kg"));

    let store = env.store();
    let first = store["collections"]["weight_tracking"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    env.cli()
        .args(["weight", "edit", &first, "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Intensity: Medium"))
        .stdout(predicate::str::contains("trainer run full-body-beginner"));

    env.cli()
        .args(["weight", "delete", &first])
        .assert()
        .success();
    env.cli()
        .args(["weight", "delete", &first])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));

    env.cli()
        .args(["weight", "add", "-4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidInput"));
}

#[test]
fn test_advice_recommends_seeded_workout() {
    let env = TestEnv::new();

    // Without workouts only the message is shown
    env.cli()
        .args(["advice", "45"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Intensity: Low"))
        .stdout(predicate::str::contains("Recommended").not());

    env.cli().arg("seed").assert().success();
    env.cli()
        .args(["advice", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Intensity: Medium"))
        .stdout(predicate::str::contains("trainer run full-body-beginner"));
}

#[test]
fn test_profile_set_and_show() {
    let env = TestEnv::signed_in();

    env.cli()
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profile yet"));

    env.cli()
        .args(["profile", "set", "--name", "Sam", "--age", "31", "--weight", "68.5"])
        .assert()
        .success();

    env.cli()
        .args(["profile", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Name:   Sam"))
        .stdout(predicate::str::contains("Weight: 68.5 kg"));

    env.cli()
        .args(["profile", "set", "--name", " ", "--age", "31", "--weight", "68.5"])
        .assert()
        .failure();
}

#[test]
fn test_achievements() {
    let env = TestEnv::signed_in();

    env.cli()
        .arg("achievements")
        .assert()
        .success()
        .stdout(predicate::str::contains("[ ] First Workout"));

    env.run_workout("fat-burners", 1800);
    env.cli()
        .arg("achievements")
        .assert()
        .success()
        .stdout(predicate::str::contains("[✓] First Workout"))
        .stdout(predicate::str::contains("[ ] Burn 1000"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let env = TestEnv::new();
    fs::write(env.dir.path().join("config.toml"), "[session]\ntick_millis = 0\n").unwrap();

    env.cli()
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tick_millis"));
}
