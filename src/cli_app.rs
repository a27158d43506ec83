//! Top-level CLI definition and dispatch.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use clap::{ArgGroup, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use water_tracker::cli::dashboard::render;
use water_tracker::cli::{
    PROGRESS_BAR_WIDTH, format_entry, format_ml, print_storage_degraded, progress_bar,
};
use water_tracker::core::config::Config;
use water_tracker::core::dates::{format_day, parse_day, today};
use water_tracker::core::errors::WtrError;
use water_tracker::feedback::{CannedAnalyzer, Feedback, feedback_for};
use water_tracker::logger::activity::ActivityLog;
use water_tracker::logger::jsonl::JsonlConfig;
use water_tracker::store::intake::{IntakeEntry, IntakeStore};
use water_tracker::store::maintenance::{count_implausible, purge_implausible, wipe};
use water_tracker::store::schema::latest_version;
use water_tracker::validate::plausibility::{
    DataQualityReport, PlausibilityReport, data_quality, filter_plausible, validated_daily_total,
};
use water_tracker::validate::summary::{DashboardState, load_dashboard};

/// Water Tracker: log water intake and review validated hydration totals.
#[derive(Debug, Parser)]
#[command(
    name = "wtr",
    author,
    version,
    about = "Water Tracker - daily hydration log",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// User id to act on (defaults to `[user] default_user`).
    #[arg(long, global = true, value_name = "ID")]
    user: Option<String>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Record one drink.
    Log(LogArgs),
    /// List logged entries, validated by default.
    History(HistoryArgs),
    /// Raw and validated totals for one day.
    Today(TodayArgs),
    /// Goal progress, trends, achievements and feedback.
    Dashboard(DashboardArgs),
    /// Delete entries above the single-entry ceiling.
    Clean(CleanArgs),
    /// Delete every entry of the user.
    Reset(ResetArgs),
    /// Check and repair the database schema.
    Doctor,
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// 250 ml.
    Glass,
    /// 500 ml.
    Bottle,
}

impl Preset {
    const fn amount_ml(self) -> f64 {
        match self {
            Self::Glass => 250.0,
            Self::Bottle => 500.0,
        }
    }
}

#[derive(Debug, Clone, Args)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["amount", "preset"])
))]
struct LogArgs {
    /// Amount in millilitres.
    #[arg(value_name = "ML", allow_negative_numbers = true)]
    amount: Option<f64>,
    /// Quick preset instead of an explicit amount.
    #[arg(long, value_enum)]
    preset: Option<Preset>,
    /// Day to record the drink on (defaults to today).
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct HistoryArgs {
    /// Show every stored row, including implausible ones.
    #[arg(long)]
    raw: bool,
}

#[derive(Debug, Clone, Args)]
struct TodayArgs {
    /// Day to report on (defaults to today).
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct DashboardArgs {
    /// Amount the feedback panel comments on [default: most recent valid entry].
    #[arg(long, value_name = "ML")]
    last: Option<f64>,
}

#[derive(Debug, Clone, Args)]
struct CleanArgs {
    /// Ceiling to purge above (defaults to `[limits] entry_ceiling_ml`).
    #[arg(long, value_name = "ML")]
    ceiling: Option<f64>,
    /// Count what would be deleted without deleting.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Args)]
struct ResetArgs {
    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print config file path.
    Path,
    /// Print effective merged configuration.
    Show,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Output was produced from degraded (empty) data.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<WtrError> for CliError {
    fn from(err: WtrError) -> Self {
        match err {
            WtrError::InvalidConfig { .. }
            | WtrError::MissingConfig { .. }
            | WtrError::ConfigParse { .. }
            | WtrError::InvalidInput { .. }
            | WtrError::InvalidDate { .. } => Self::User(err.to_string()),
            WtrError::Serialization { .. } => Self::Internal(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Log(args) => run_log(cli, args),
        Command::History(args) => run_history(cli, args),
        Command::Today(args) => run_today(cli, args),
        Command::Dashboard(args) => run_dashboard(cli, args),
        Command::Clean(args) => run_clean(cli, args),
        Command::Reset(args) => run_reset(cli, args),
        Command::Doctor => run_doctor(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── shared setup ────────────────────

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Ok(Config::load(cli.config.as_deref())?)
}

fn open_store(config: &Config) -> Result<IntakeStore, CliError> {
    let activity = ActivityLog::open(JsonlConfig::for_path(&config.paths.jsonl_log));
    Ok(IntakeStore::open_with_log(&config.paths.sqlite_db, activity)?)
}

fn user_id(cli: &Cli, config: &Config) -> String {
    cli.user
        .clone()
        .unwrap_or_else(|| config.user.default_user.clone())
}

fn resolve_day(raw: Option<&str>) -> Result<chrono::NaiveDate, CliError> {
    raw.map_or_else(|| Ok(today()), |s| Ok(parse_day(s)?))
}

// ──────────────────── log ────────────────────

fn run_log(cli: &Cli, args: &LogArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let amount_ml = match (args.amount, args.preset) {
        (Some(amount), _) => amount,
        (None, Some(preset)) => preset.amount_ml(),
        (None, None) => {
            return Err(CliError::User(
                "provide an amount or --preset".to_string(),
            ));
        }
    };
    let ceiling = config.limits.entry_ceiling_ml;
    if !amount_ml.is_finite() || amount_ml <= 0.0 {
        return Err(CliError::User(format!(
            "amount must be greater than 0 ml (got {amount_ml})"
        )));
    }
    if amount_ml > ceiling {
        return Err(CliError::User(format!(
            "too much water at once: {} exceeds the {} single-entry limit",
            format_ml(amount_ml),
            format_ml(ceiling)
        )));
    }

    let date = resolve_day(args.date.as_deref())?;
    let user = user_id(cli, &config);
    let store = open_store(&config)?;
    let id = store.insert(&user, amount_ml, date)?;
    // The row is stored either way; a failed re-read must not invite a retry.
    let reread = validated_daily_total(&store, &user, date, &config.limits);
    let (day_total, degraded) = match reread {
        Ok(total) => (Some(total), None),
        Err(err) => (None, Some(err.to_string())),
    };
    let feedback = feedback_for(&CannedAnalyzer, amount_ml, ceiling, store.activity());

    match output_mode(cli) {
        OutputMode::Human => {
            println!(
                "{} {} for {} on {}",
                "Logged".green().bold(),
                format_ml(amount_ml),
                user,
                date
            );
            match (day_total, &degraded) {
                (Some(total), _) => println!(
                    "  Total {} / {} {}",
                    format_ml(total),
                    format_ml(config.goals.daily_goal_ml),
                    progress_bar(total / config.goals.daily_goal_ml, PROGRESS_BAR_WIDTH)
                ),
                (None, Some(reason)) => print_storage_degraded(reason),
                (None, None) => {}
            }
            if let Some(Feedback::Available(text)) = &feedback {
                println!("  {text}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "log",
                "id": id,
                "user": user,
                "amount_ml": amount_ml,
                "date": format_day(date),
                "validated_daily_total_ml": day_total,
                "feedback": feedback,
                "storage_degraded": degraded.is_some(),
            });
            write_json_line(&payload)?;
        }
    }
    degraded.map_or(Ok(()), |reason| Err(CliError::Partial(reason)))
}

// ──────────────────── history ────────────────────

fn run_history(cli: &Cli, args: &HistoryArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let user = user_id(cli, &config);
    let store = open_store(&config)?;
    let ceiling = config.limits.entry_ceiling_ml;

    let (history, degraded) = match store.history(&user) {
        Ok(history) => (history, None),
        Err(err) => (Vec::new(), Some(err.to_string())),
    };
    let report = filter_plausible(&history, ceiling);
    let shown: &[IntakeEntry] = if args.raw { &history } else { &report.kept };

    match output_mode(cli) {
        OutputMode::Human => {
            if let Some(reason) = &degraded {
                print_storage_degraded(reason);
            }
            if shown.is_empty() {
                println!("No entries for {user}.");
            }
            for entry in shown {
                println!("{}", format_entry(entry, ceiling));
            }
            if !args.raw {
                print_filter_warnings(&report);
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "history",
                "user": user,
                "raw": args.raw,
                "entries": shown,
                "filtered": report.dropped_count(),
                "ceiling_ml": ceiling,
                "storage_degraded": degraded.is_some(),
            });
            write_json_line(&payload)?;
        }
    }
    degraded.map_or(Ok(()), |reason| Err(CliError::Partial(reason)))
}

fn print_filter_warnings(report: &PlausibilityReport) {
    for warning in report.warnings() {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
}

// ──────────────────── today ────────────────────

fn run_today(cli: &Cli, args: &TodayArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let user = user_id(cli, &config);
    let date = resolve_day(args.date.as_deref())?;
    let store = open_store(&config)?;

    let (quality, degraded) = match data_quality(&store, &user, date, &config.limits) {
        Ok(report) => (report, None),
        Err(err) => (
            DataQualityReport {
                user: user.clone(),
                date,
                raw_entries: 0,
                plausible_entries: 0,
                raw_daily_total: 0.0,
                plausible_daily_sum: 0.0,
                validated_daily_total: 0.0,
                flagged: Vec::new(),
            },
            Some(err.to_string()),
        ),
    };

    match output_mode(cli) {
        OutputMode::Human => {
            if let Some(reason) = &degraded {
                print_storage_degraded(reason);
            }
            println!("{user} on {date}");
            println!("  Validated total {}", format_ml(quality.validated_daily_total));
            println!("  Raw total       {}", format_ml(quality.raw_daily_total));
            if quality.total_clamped() {
                println!(
                    "  Plausible sum {} capped at {}",
                    format_ml(quality.plausible_daily_sum),
                    format_ml(config.limits.daily_cap_ml)
                );
            }
            if quality.is_clean() {
                println!("  Data quality    {}", "clean".green());
            } else {
                println!(
                    "  Data quality    {} ({} implausible entries, run `wtr clean`)",
                    "flagged".yellow(),
                    quality.implausible_count()
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "today",
                "report": quality,
                "clean": quality.is_clean(),
                "storage_degraded": degraded.is_some(),
            });
            write_json_line(&payload)?;
        }
    }
    degraded.map_or(Ok(()), |reason| Err(CliError::Partial(reason)))
}

// ──────────────────── dashboard ────────────────────

fn run_dashboard(cli: &Cli, args: &DashboardArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let store = open_store(&config)?;
    let mut state = DashboardState::new(user_id(cli, &config));
    if let Some(last) = args.last {
        state = state.with_last_amount(last);
    }

    let summary = load_dashboard(&store, &state, &config, &CannedAnalyzer);

    match output_mode(cli) {
        OutputMode::Human => {
            print!("{}", render(&summary, config.limits.entry_ceiling_ml));
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "dashboard",
                "summary": summary,
                "storage_degraded": summary.storage_degraded(),
            });
            write_json_line(&payload)?;
        }
    }
    summary
        .storage_error
        .map_or(Ok(()), |reason| Err(CliError::Partial(reason)))
}

// ──────────────────── clean / reset ────────────────────

fn run_clean(cli: &Cli, args: &CleanArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let ceiling = args.ceiling.unwrap_or(config.limits.entry_ceiling_ml);
    if !ceiling.is_finite() || ceiling <= 0.0 {
        return Err(CliError::User(format!(
            "ceiling must be a positive number of ml (got {ceiling})"
        )));
    }
    let user = user_id(cli, &config);
    let store = open_store(&config)?;

    let affected = if args.dry_run {
        count_implausible(&store, &user, ceiling)?
    } else {
        purge_implausible(&store, &user, ceiling)?
    };

    match output_mode(cli) {
        OutputMode::Human => {
            let verb = if args.dry_run { "Would remove" } else { "Removed" };
            println!(
                "{verb} {affected} entries above {} for {user}",
                format_ml(ceiling)
            );
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "clean",
                "user": user,
                "ceiling_ml": ceiling,
                "dry_run": args.dry_run,
                "deleted": if args.dry_run { 0 } else { affected },
                "matched": affected,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_reset(cli: &Cli, args: &ResetArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let user = user_id(cli, &config);
    let store = open_store(&config)?;

    if !args.yes {
        if !io::stdin().is_terminal() {
            return Err(CliError::User(
                "refusing to delete all entries without --yes on a non-interactive terminal"
                    .to_string(),
            ));
        }
        let count = store.history(&user)?.len();
        if !confirm(&format!("Delete all {count} entries for {user}? [y/N] "))? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let deleted = wipe(&store, &user)?;
    match output_mode(cli) {
        OutputMode::Human => {
            println!("Deleted {deleted} entries for {user}. Starting fresh.");
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "reset",
                "user": user,
                "deleted": deleted,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;
    drop(stdout);

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ──────────────────── doctor ────────────────────

fn run_doctor(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let store = open_store(&config)?;
    let report = store.reconcile_report();
    let hash = config.stable_hash()?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("Database: {}", store.path().display());
            println!(
                "  Schema version {} (latest {})",
                report.schema_version,
                latest_version()
            );
            if report.is_noop() {
                println!("  Schema {}", "ok".green());
            }
            if !report.table_existed {
                println!("  Created table water_intake");
            }
            if let Some(repair) = &report.repair {
                println!(
                    "  Repaired drift (missing: {}), migrated {} of {} rows",
                    report.missing_columns.join(", "),
                    repair.rows_migrated,
                    repair.backup_rows
                );
                if repair.backup_retained {
                    println!(
                        "  {} backup table {} kept for manual recovery",
                        "warning:".yellow().bold(),
                        repair.backup_table
                    );
                }
                if let Some(err) = &repair.copy_error {
                    println!("  copy error: {err}");
                }
            }
            for version in &report.migrations_applied {
                println!("  Applied migration v{version}");
            }
            println!(
                "Activity log: {} ({})",
                config.paths.jsonl_log.display(),
                store.activity().state()
            );
            println!("Config hash: {hash}");
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "doctor",
                "database": store.path().to_string_lossy(),
                "latest_version": latest_version(),
                "reconcile": report,
                "activity_log": config.paths.jsonl_log.to_string_lossy(),
                "activity_log_state": store.activity().state(),
                "config_hash": hash,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let value = serde_json::to_value(&config)?;
                    let payload = json!({
                        "command": "config show",
                        "config": value,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("WTR_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(
    json_flag: bool,
    env_mode: Option<&str>,
    stdout_is_tty: bool,
) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
