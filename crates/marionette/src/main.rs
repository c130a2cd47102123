//! marionette - evaluate configuration expressions and check run schedules
//!
//! Subcommands:
//! - `due`: decide whether work under a named schedule should run now
//! - `eval`: evaluate a JSON-encoded expression tree
//! - `schedules`: list the schedules a configuration registers

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use marionette_config::{ScheduleBook, load_config};
use marionette_eval::{Expr, ScopeTree, Value};
use marionette_util::{
    Clock, FixedClock, SystemClock, default_config_path, format_datetime_full, format_duration,
    is_mock_time_active, parse_local_datetime,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// marionette - configuration expression and schedule tooling
#[derive(Parser, Debug)]
#[command(name = "marionette")]
#[command(about = "Evaluate configuration expressions and check run schedules", long_about = None)]
struct Args {
    /// Log level
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a schedule is due; exits 0 when due, 1 when not
    Due {
        /// Schedule file (default: ~/.config/marionette/schedules.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Schedule name
        schedule: String,

        /// Last run, "YYYY-MM-DD HH:MM:SS" local time (default: never)
        #[arg(long, value_parser = parse_local_datetime)]
        previous: Option<DateTime<Local>>,

        /// Evaluate at this local time instead of the current time
        #[arg(long, value_parser = parse_local_datetime)]
        now: Option<DateTime<Local>>,
    },

    /// Evaluate an expression tree read from a JSON file
    Eval {
        /// Path to the JSON-encoded tree
        ast: PathBuf,

        /// Bind a root-scope variable; the value is parsed as JSON, else taken as a string
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_binding)]
        vars: Vec<(String, Value)>,
    },

    /// List registered schedules
    Schedules {
        /// Schedule file (default: ~/.config/marionette/schedules.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    debug!(version = env!("CARGO_PKG_VERSION"), "marionette starting");

    match args.command {
        Command::Due {
            config,
            schedule,
            previous,
            now,
        } => {
            let due = run_due(config.as_deref(), &schedule, previous, now)?;
            Ok(if due { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Command::Eval { ast, vars } => {
            let value = run_eval(&ast, vars)?;
            println!("{}", serde_json::to_string(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Schedules { config } => {
            run_schedules(config.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load the schedule book. An explicit path must exist; a missing default
/// file means only the built-in schedules are available.
fn load_book(config: Option<&Path>) -> Result<ScheduleBook> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_path();
            if !path.exists() {
                info!(
                    config_path = %path.display(),
                    "No configuration file; using built-in schedules"
                );
                return Ok(ScheduleBook::default());
            }
            path
        }
    };

    load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
}

fn run_due(
    config: Option<&Path>,
    name: &str,
    previous: Option<DateTime<Local>>,
    now: Option<DateTime<Local>>,
) -> Result<bool> {
    let book = load_book(config)?;
    let clock: Box<dyn Clock> = match now {
        Some(now) => Box::new(FixedClock::new(now)),
        None => {
            if is_mock_time_active() {
                warn!("MARIONETTE_MOCK_TIME is set; using mock time");
            }
            Box::new(SystemClock)
        }
    };
    let now = clock.now();

    let due = book.is_due(name, previous, &*clock)?;

    match previous {
        Some(previous) => {
            let since = match (now - previous).to_std() {
                Ok(elapsed) => format!("{} ago", format_duration(elapsed)),
                Err(_) => "in the future".to_string(),
            };
            println!("last run: {} ({})", format_datetime_full(&previous), since);
        }
        None => println!("last run: never"),
    }

    if due {
        println!("{}: due", name);
        return Ok(true);
    }

    let mut blocked = Vec::new();
    if let Some(schedule) = book.get(name) {
        let report = schedule.explain(&previous.unwrap_or_default(), &now);
        for (filter, passed) in [
            ("period", report.period),
            ("range", report.range),
            ("weekday", report.weekday),
        ] {
            if !passed {
                blocked.push(filter);
            }
        }
    }
    println!("{}: not due (blocked by {})", name, blocked.join(", "));
    Ok(false)
}

fn run_eval(ast: &Path, vars: Vec<(String, Value)>) -> Result<Value> {
    let content =
        std::fs::read_to_string(ast).with_context(|| format!("Failed to read {:?}", ast))?;
    let expr: Expr = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse expression tree from {:?}", ast))?;

    let mut tree = ScopeTree::new();
    let root = tree.root();
    for (name, value) in vars {
        tree.define(root, name, value)?;
    }

    let scope = tree.scope(root);
    for name in expr.unresolved(&scope) {
        warn!(variable = %name, "Variable is not defined; it evaluates to undef");
    }

    expr.evaluate(&scope)
        .with_context(|| format!("Failed to evaluate {}", expr))
}

fn run_schedules(config: Option<&Path>) -> Result<()> {
    let book = load_book(config)?;
    if book.settings().ignore_schedules {
        println!("(ignore_schedules is set; every schedule is always due)");
    }
    for schedule in book.iter() {
        println!("{}", schedule);
    }
    Ok(())
}

/// Parse `NAME=VALUE` from the command line
fn parse_binding(s: &str) -> Result<(String, Value)> {
    let Some((name, raw)) = s.split_once('=') else {
        bail!("expected NAME=VALUE, got '{}'", s);
    };
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        bail!("variable name cannot be empty in '{}'", s);
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_values_parse_as_json_first() {
        assert_eq!(
            parse_binding("count=4").unwrap(),
            ("count".to_string(), Value::Integer(4))
        );
        assert_eq!(
            parse_binding("$enabled=false").unwrap(),
            ("enabled".to_string(), Value::Bool(false))
        );
        assert_eq!(
            parse_binding("os=Debian").unwrap(),
            ("os".to_string(), Value::from("Debian"))
        );
        assert_eq!(
            parse_binding("list=[1, \"a\"]").unwrap().1,
            Value::from(vec![Value::Integer(1), Value::from("a")])
        );
    }

    #[test]
    fn binding_requires_name_and_equals() {
        assert!(parse_binding("novalue").is_err());
        assert!(parse_binding("=5").is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "marionette",
            "due",
            "puppet",
            "--previous",
            "2011-05-23 10:00:00",
            "--now",
            "2011-05-23 11:00:00",
        ])
        .unwrap();

        match args.command {
            Command::Due {
                schedule,
                previous,
                now,
                config,
            } => {
                assert_eq!(schedule, "puppet");
                assert!(previous.is_some() && now.is_some());
                assert!(config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn eval_reads_tree_and_bindings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(
            &path,
            r#"{ "type": "binary", "op": "times", "left": { "type": "variable", "name": "n" }, "right": { "type": "literal", "value": 3 } }"#,
        )
        .unwrap();

        let value = run_eval(&path, vec![("n".to_string(), Value::Integer(2))]).unwrap();
        assert_eq!(value, Value::Integer(6));
    }

    #[test]
    fn due_with_fixed_times() {
        let now = parse_local_datetime("2011-05-23 11:00:00").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.toml");
        std::fs::write(&path, "config_version = 1\n").unwrap();

        let previous = now - chrono::Duration::minutes(31);
        assert!(run_due(Some(&path), "puppet", Some(previous), Some(now)).unwrap());

        let previous = now - chrono::Duration::minutes(29);
        assert!(!run_due(Some(&path), "puppet", Some(previous), Some(now)).unwrap());

        assert!(run_due(Some(&path), "nope", None, Some(now)).is_err());
    }
}
