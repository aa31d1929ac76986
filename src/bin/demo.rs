//! Demo CLI for paramtree
//!
//! A small greeting command wired through the full engine: an option with a
//! processing pipeline, a tag-validated parameter group, an environment
//! source, and text/JSON output. Doubles as the integration-test target.

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use paramtree::processors::{IsPositive, RequireAtLeast, Suffix, ToUppercase};
use paramtree::{App, BuildError, Command, EnvVar, Invocation, Opt, RunError, Value, ValueType};

fn build_app() -> Result<App, BuildError> {
    Command::new("paramtree-demo")
        .about("Greets someone after running their name through a pipeline")
        .option(Opt::new("name").short('n').help("Name to greet").tag("who"))
        .child(ToUppercase)
        .child(Suffix::new("!"))
        .option(
            Opt::new("nickname")
                .help("Nickname to greet instead of the name")
                .tag("who"),
        )
        .option(
            Opt::new("count")
                .short('c')
                .value_type(ValueType::Int)
                .default_value(1i64)
                .help("How many times to greet"),
        )
        .child(IsPositive)
        .option(Opt::new("json").flag().help("Emit the resolved values as JSON"))
        .env(
            EnvVar::new("lang", "PARAMTREE_LANG")
                .default_value("en")
                .help("Greeting language code"),
        )
        .tag("who")
        .tag_child(RequireAtLeast(1))
        .build()
}

/// Builds a deliberately broken tree: a per-value processor under a tag.
/// Used to demonstrate the build-time diagnostic.
fn build_bad_tree() -> Result<App, BuildError> {
    Command::new("paramtree-demo")
        .option(Opt::new("name").tag("who"))
        .tag("who")
        .child(ToUppercase)
        .build()
}

fn emit(inv: &Invocation) -> Result<()> {
    let values = &inv.values;
    if values.get("json") == Some(&Value::Bool(true)) {
        let text = serde_json::to_string_pretty(&values.to_json())
            .context("serializing resolved values")?;
        println!("{}", text);
        return Ok(());
    }

    let who = values
        .get("nickname")
        .and_then(Value::as_str)
        .or_else(|| values.get("name").and_then(Value::as_str))
        .unwrap_or("stranger");
    let lang = values.get("lang").and_then(Value::as_str).unwrap_or("en");
    let count = values.get("count").and_then(Value::as_int).unwrap_or(1);
    for _ in 0..count {
        println!("[{}] Hello, {}", lang, who);
    }
    Ok(())
}

fn main() -> ExitCode {
    if paramtree::config::debug_enabled() {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--demo-bad-tree") {
        return match build_bad_tree() {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(2)
            }
        };
    }

    let mut app = match build_app() {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    if args.iter().any(|a| a == "--visualize") {
        return match app.render() {
            Ok(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(2)
            }
        };
    }

    match app.run() {
        Ok(inv) => match emit(&inv) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Err(RunError::Parse(err)) => {
            let code = err.exit_code();
            let _ = err.print();
            ExitCode::from(code.clamp(0, u8::MAX as i32) as u8)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code().clamp(0, u8::MAX as i32) as u8)
        }
    }
}
