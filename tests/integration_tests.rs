//! Integration tests: CLI smoke tests and end-to-end logging/validation
//! scenarios against a temp database.

mod common;

use chrono::NaiveDate;
use serde_json::Value;
use water_tracker::store::intake::IntakeStore;
use water_tracker::store::schema::latest_version;

use common::TestEnv;

fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

/// Write rows directly through the library, bypassing the CLI input guard.
fn seed(env: &TestEnv, user: &str, rows: &[(f64, &str)]) {
    let store = IntakeStore::open(&env.db_path()).unwrap();
    for (amount, date) in rows {
        store.insert(user, *amount, day(date)).unwrap();
    }
}

fn amounts(entries: &Value) -> Vec<f64> {
    entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["amount_ml"].as_f64().unwrap())
        .collect()
}

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: wtr [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(result.status.success());
    assert!(
        result.stdout.contains("wtr"),
        "missing version output; log: {}",
        result.log_path.display()
    );
}

#[test]
fn subcommand_help_flags_work() {
    let subcommands = [
        "log",
        "history",
        "today",
        "dashboard",
        "clean",
        "reset",
        "doctor",
        "config",
        "completions",
    ];
    for sub in subcommands {
        let result = common::run_cli_case(&format!("help_{sub}"), &[sub, "--help"]);
        assert!(
            result.status.success(),
            "{sub} --help failed; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn log_then_history_shows_newest_entry_first() {
    let env = TestEnv::new();
    let first = env.run("log_first", &["--json", "log", "250", "--date", "2024-01-01"]);
    assert!(first.status.success(), "log: {}", first.log_path.display());
    let second = env.run("log_second", &["--json", "log", "300", "--date", "2024-01-01"]);
    assert!(second.status.success());

    let payload = second.json();
    assert_eq!(payload["command"], "log");
    assert_eq!(payload["user"], "user_123");
    assert_eq!(payload["validated_daily_total_ml"].as_f64(), Some(550.0));

    let history = env.run("history", &["--json", "history"]);
    assert!(history.status.success());
    let payload = history.json();
    assert_eq!(amounts(&payload["entries"]), vec![300.0, 250.0]);
    assert_eq!(payload["entries"][0]["date"], "2024-01-01");
    assert_eq!(payload["filtered"], 0);
}

#[test]
fn log_rejects_amount_above_ceiling() {
    let env = TestEnv::new();
    let result = env.run("log_too_much", &["--json", "log", "6000"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("too much water at once"));

    let history = env.run("history_after_reject", &["--json", "history", "--raw"]);
    assert!(history.json()["entries"].as_array().unwrap().is_empty());
}

#[test]
fn log_rejects_non_positive_amounts() {
    let env = TestEnv::new();
    for (case, amount) in [("zero", "0"), ("negative", "-250")] {
        let result = env.run(case, &["--json", "log", amount]);
        assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
        assert!(result.stderr.contains("greater than 0"));
    }
}

#[test]
fn log_accepts_ceiling_from_config_override() {
    let env = TestEnv::new();
    let result = env.run_with_env(
        "log_raised_ceiling",
        &["--json", "log", "5500"],
        &[("WTR_ENTRY_CEILING_ML", "6000")],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
}

#[test]
fn log_preset_records_fixed_amount() {
    let env = TestEnv::new();
    let result = env.run("preset_bottle", &["--json", "--user", "u9", "log", "--preset", "bottle"]);
    assert!(result.status.success());
    let payload = result.json();
    assert_eq!(payload["amount_ml"].as_f64(), Some(500.0));
    assert_eq!(payload["user"], "u9");
    assert_eq!(payload["feedback"]["status"], "available");
}

#[test]
fn log_confirms_stored_row_when_total_reread_fails() {
    let env = TestEnv::new();
    seed(&env, "u1", &[(250.0, "2024-01-01")]);
    let conn = rusqlite::Connection::open(env.db_path()).unwrap();
    conn.execute(
        "INSERT INTO water_intake (user_id, intake_ml, date) VALUES ('u1', 100.0, 'soon')",
        [],
    )
    .unwrap();

    let result = env.run("log_reread_fails", &["--json", "--user", "u1", "log", "300"]);
    assert_eq!(result.status.code(), Some(4), "log: {}", result.log_path.display());
    let payload = result.json();
    assert!(payload["id"].as_i64().is_some());
    assert_eq!(payload["storage_degraded"], true);
    assert!(payload["validated_daily_total_ml"].is_null());

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM water_intake WHERE user_id = 'u1'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(rows, 3);
}

#[test]
fn dashboard_without_last_comments_on_latest_entry() {
    let env = TestEnv::new();
    assert!(env.run("dashboard_default_log", &["--json", "log", "500"]).status.success());

    let result = env.run("dashboard_default_last", &["--json", "dashboard"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(result.json()["summary"]["feedback"]["status"], "available");
}

#[test]
fn log_rejects_malformed_date() {
    let env = TestEnv::new();
    let result = env.run("bad_date", &["--json", "log", "250", "--date", "01/02/2024"]);
    assert_eq!(result.status.code(), Some(1));
    assert!(result.stderr.contains("WTR-2002"));
}

#[test]
fn history_filters_implausible_rows_unless_raw() {
    let env = TestEnv::new();
    seed(
        &env,
        "u1",
        &[(250.0, "2024-01-01"), (6000.0, "2024-01-01"), (500.0, "2024-01-02")],
    );

    let validated = env.run("history_validated", &["--json", "--user", "u1", "history"]);
    assert!(validated.status.success());
    let payload = validated.json();
    assert_eq!(amounts(&payload["entries"]), vec![500.0, 250.0]);
    assert_eq!(payload["filtered"], 1);
    assert!(validated.stderr.contains("filtered out unrealistic entry: 6000ml"));

    let raw = env.run("history_raw", &["--json", "--user", "u1", "history", "--raw"]);
    let payload = raw.json();
    assert_eq!(amounts(&payload["entries"]), vec![500.0, 6000.0, 250.0]);
}

#[test]
fn today_reports_raw_and_validated_totals() {
    let env = TestEnv::new();
    seed(
        &env,
        "u1",
        &[(250.0, "2024-01-01"), (6000.0, "2024-01-01"), (500.0, "2024-01-02")],
    );

    let first = env.run(
        "today_first_day",
        &["--json", "--user", "u1", "today", "--date", "2024-01-01"],
    );
    assert!(first.status.success());
    let payload = first.json();
    assert_eq!(payload["report"]["validated_daily_total"].as_f64(), Some(250.0));
    assert_eq!(payload["report"]["raw_daily_total"].as_f64(), Some(6250.0));
    assert_eq!(payload["clean"], false);

    let second = env.run(
        "today_second_day",
        &["--json", "--user", "u1", "today", "--date", "2024-01-02"],
    );
    let payload = second.json();
    assert_eq!(payload["report"]["validated_daily_total"].as_f64(), Some(500.0));
}

#[test]
fn today_human_output_shows_quality_verdict() {
    let env = TestEnv::new();
    seed(&env, "u1", &[(250.0, "2024-01-01")]);
    let result = env.run_with_env(
        "today_human",
        &["--no-color", "--user", "u1", "today", "--date", "2024-01-01"],
        &[("WTR_OUTPUT_FORMAT", "human")],
    );
    assert!(result.status.success());
    assert!(result.stdout.contains("Validated total 250 ml"));
    assert!(result.stdout.contains("clean"));
}

#[test]
fn clean_dry_run_then_purge() {
    let env = TestEnv::new();
    seed(
        &env,
        "u1",
        &[(250.0, "2024-01-01"), (6000.0, "2024-01-01"), (12_000.0, "2024-01-02")],
    );
    seed(&env, "u2", &[(9000.0, "2024-01-01")]);

    let dry = env.run("clean_dry", &["--json", "--user", "u1", "clean", "--dry-run"]);
    assert!(dry.status.success());
    assert_eq!(dry.json()["matched"], 2);
    assert_eq!(dry.json()["deleted"], 0);

    let purge = env.run("clean_purge", &["--json", "--user", "u1", "clean"]);
    assert_eq!(purge.json()["deleted"], 2);

    let raw = env.run("clean_history", &["--json", "--user", "u1", "history", "--raw"]);
    assert_eq!(amounts(&raw.json()["entries"]), vec![250.0]);

    let other = env.run("clean_other_user", &["--json", "--user", "u2", "history", "--raw"]);
    assert_eq!(amounts(&other.json()["entries"]), vec![9000.0]);
}

#[test]
fn clean_honors_explicit_ceiling() {
    let env = TestEnv::new();
    seed(&env, "u1", &[(250.0, "2024-01-01"), (3000.0, "2024-01-01")]);
    let result = env.run(
        "clean_ceiling",
        &["--json", "--user", "u1", "clean", "--ceiling", "1000"],
    );
    assert_eq!(result.json()["deleted"], 1);
}

#[test]
fn reset_requires_confirmation_when_not_interactive() {
    let env = TestEnv::new();
    seed(&env, "u1", &[(250.0, "2024-01-01")]);

    let refused = env.run("reset_refused", &["--json", "--user", "u1", "reset"]);
    assert_eq!(refused.status.code(), Some(1));
    assert!(refused.stderr.contains("--yes"));

    let wiped = env.run("reset_yes", &["--json", "--user", "u1", "reset", "--yes"]);
    assert!(wiped.status.success());
    assert_eq!(wiped.json()["deleted"], 1);

    let history = env.run("reset_history", &["--json", "--user", "u1", "history", "--raw"]);
    assert!(history.json()["entries"].as_array().unwrap().is_empty());
}

#[test]
fn dashboard_json_includes_summary_and_feedback() {
    let env = TestEnv::new();
    let logged = env.run("dashboard_log", &["--json", "log", "1500"]);
    assert!(logged.status.success());

    let result = env.run("dashboard", &["--json", "dashboard", "--last", "1500"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = result.json();
    let summary = &payload["summary"];
    assert_eq!(summary["today_total_ml"].as_f64(), Some(1500.0));
    assert_eq!(summary["progress_tier"], "almost_there");
    assert_eq!(summary["tracking_days"], 1);
    assert_eq!(summary["feedback"]["status"], "available");
    assert_eq!(payload["storage_degraded"], false);
}

#[test]
fn dashboard_human_output_on_empty_history() {
    let env = TestEnv::new();
    let result = env.run_with_env(
        "dashboard_empty",
        &["--no-color", "dashboard"],
        &[("WTR_OUTPUT_FORMAT", "human")],
    );
    assert!(result.status.success());
    assert!(result.stdout.contains("No valid entries yet"));
}

#[test]
fn doctor_reports_latest_schema_version() {
    let env = TestEnv::new();
    let result = env.run("doctor", &["--json", "doctor"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = result.json();
    assert_eq!(
        payload["reconcile"]["schema_version"].as_u64(),
        Some(u64::from(latest_version()))
    );
    assert_eq!(payload["activity_log_state"], "normal");
}

#[test]
fn activity_log_records_cli_events() {
    let env = TestEnv::new();
    env.run("activity_log", &["--json", "log", "250"]);
    env.run("activity_reset", &["--json", "reset", "--yes"]);

    let contents = std::fs::read_to_string(env.activity_log_path()).unwrap();
    let events: Vec<String> = contents
        .lines()
        .map(|line| {
            let v: Value = serde_json::from_str(line).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect();
    assert!(events.contains(&"intake_logged".to_string()));
    assert!(events.contains(&"user_wiped".to_string()));
}

#[test]
fn config_show_reflects_env_overrides() {
    let env = TestEnv::new();
    let result = env.run_with_env(
        "config_show",
        &["--json", "config", "show"],
        &[("WTR_DAILY_GOAL_ML", "3000"), ("WTR_DEFAULT_USER", "alex")],
    );
    assert!(result.status.success());
    let config = &result.json()["config"];
    assert_eq!(config["goals"]["daily_goal_ml"].as_f64(), Some(3000.0));
    assert_eq!(config["user"]["default_user"], "alex");
    assert_eq!(config["limits"]["entry_ceiling_ml"].as_f64(), Some(5000.0));
}

#[test]
fn config_path_reports_missing_default_file() {
    let env = TestEnv::new();
    let result = env.run("config_path", &["--json", "config", "path"]);
    assert!(result.status.success());
    assert_eq!(result.json()["exists"], false);
}

#[test]
fn missing_explicit_config_is_user_error() {
    let env = TestEnv::new();
    let missing = env.root().join("nope.toml");
    let result = env.run(
        "missing_config",
        &["--json", "--config", missing.to_str().unwrap(), "today"],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(result.stderr.contains("WTR-1002"));
}

#[test]
fn invalid_config_file_is_rejected() {
    let env = TestEnv::new();
    let path = env.root().join("config.toml");
    std::fs::write(&path, "[limits]\nentry_ceiling_ml = 20000\ndaily_cap_ml = 10000\n").unwrap();
    let result = env.run(
        "invalid_config",
        &["--json", "--config", path.to_str().unwrap(), "today"],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(result.stderr.contains("WTR-1001"));
}

#[test]
fn completions_generate_script() {
    let result = common::run_cli_case("completions_bash", &["completions", "bash"]);
    assert!(result.status.success());
    assert!(result.stdout.contains("wtr"));
}
