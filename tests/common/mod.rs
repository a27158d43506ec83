#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    /// First stdout line parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        let line = self.stdout.lines().next().unwrap_or_else(|| {
            panic!("no stdout; log: {}", self.log_path.display());
        });
        serde_json::from_str(line).unwrap_or_else(|e| {
            panic!("stdout is not JSON ({e}); log: {}", self.log_path.display());
        })
    }
}

/// Isolated HOME, database and activity log for one test.
pub struct TestEnv {
    dir: tempfile::TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp test env"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("data").join("water_tracker.db")
    }

    pub fn activity_log_path(&self) -> PathBuf {
        self.dir.path().join("data").join("activity.jsonl")
    }

    pub fn run(&self, case_name: &str, args: &[&str]) -> CmdResult {
        self.run_with_env(case_name, args, &[])
    }

    pub fn run_with_env(&self, case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
        let mut cmd = Command::new(resolve_bin_path());
        cmd.args(args)
            .env("HOME", self.dir.path())
            .env("WTR_SQLITE_DB", self.db_path())
            .env("WTR_JSONL_LOG", self.activity_log_path())
            .env_remove("WTR_OUTPUT_FORMAT")
            .env_remove("WTR_DEFAULT_USER")
            .env_remove("WTR_ENTRY_CEILING_ML")
            .env_remove("WTR_DAILY_CAP_ML")
            .env_remove("WTR_DAILY_GOAL_ML")
            .env("RUST_BACKTRACE", "1");
        for (key, value) in env {
            cmd.env(key, value);
        }
        execute(case_name, args, &mut cmd)
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_wtr") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "wtr.exe" } else { "wtr" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve wtr binary path for integration test"),
    }
}

fn execute(case_name: &str, args: &[&str], cmd: &mut Command) -> CmdResult {
    let root = std::env::temp_dir().join("wtr-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = cmd.output().expect("execute wtr command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Run `wtr` once in a fresh environment.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    TestEnv::new().run(case_name, args)
}
