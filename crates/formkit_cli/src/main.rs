//! formkit CLI
//!
//! Check form definitions and replay interaction scripts against them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formkit::{BuiltForm, FormConfig, FormSnapshot};
use formkit_core::HookScope;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod script;

#[derive(Parser)]
#[command(name = "formkit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Form field state harness", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a form definition in strict mode and describe it
    Check {
        /// Form definition (TOML)
        form: PathBuf,
    },

    /// Replay an interaction script, printing the form after every step
    Replay {
        /// Form definition (TOML)
        form: PathBuf,

        /// Script with one event per line
        script: PathBuf,

        /// Print one JSON object per step
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Check { form } => cmd_check(&form),
        Commands::Replay { form, script, json } => cmd_replay(&form, &script, json),
    }
}

fn cmd_check(path: &Path) -> Result<()> {
    let mut config = FormConfig::load(path)?;
    config.form.strict = true;
    let built = config
        .build(&HookScope::new())
        .with_context(|| format!("{} is not a valid form definition", path.display()))?;

    let options = built.form.options();
    println!("form `{}`", built.name);
    for (name, field) in &built.fields {
        println!("  field {name:<16} default={:?}", field.value());
    }
    println!(
        "  blur handlers: {}, reset handlers: {}, validity: {:?}",
        options.blur_handlers.len(),
        options.reset_handlers.len(),
        config.form.validity
    );
    info!("{} is valid", path.display());
    Ok(())
}

fn cmd_replay(form: &Path, script_path: &Path, json: bool) -> Result<()> {
    let config = FormConfig::load(form)?;
    let built = config.build(&HookScope::new())?;

    let source = fs::read_to_string(script_path)
        .with_context(|| format!("Failed to read {}", script_path.display()))?;
    let steps = script::parse_script(&source)
        .with_context(|| format!("Failed to parse {}", script_path.display()))?;
    debug!(steps = steps.len(), form = %built.name, "replaying script");

    for (index, step) in steps.iter().enumerate() {
        script::apply(step, &built).with_context(|| format!("step {}: {step}", index + 1))?;
        let snapshot = built.snapshot();
        if json {
            let line = serde_json::json!({
                "step": index + 1,
                "event": step.to_string(),
                "state": snapshot,
            });
            println!("{line}");
        } else {
            print_snapshot(index + 1, step, &snapshot);
        }
    }

    report_final(&built);
    Ok(())
}

fn print_snapshot(number: usize, step: &script::Step, snapshot: &FormSnapshot) {
    println!("step {number}: {step}");
    println!("  form valid: {}", snapshot.form_is_valid);
    for field in &snapshot.fields {
        println!(
            "  {:<16} value={:?} touched={} valid={} error={}",
            field.name,
            field.state.value,
            field.state.touched,
            field.state.is_valid,
            field.state.input_is_invalid
        );
    }
}

fn report_final(built: &BuiltForm) {
    let invalid: Vec<&str> = built
        .fields
        .iter()
        .filter(|(_, field)| !field.is_valid())
        .map(|(name, _)| name.as_str())
        .collect();
    if invalid.is_empty() {
        info!(form = %built.name, valid = built.form.form_is_valid(), "replay finished");
    } else {
        info!(form = %built.name, ?invalid, "replay finished with invalid fields");
    }
}
