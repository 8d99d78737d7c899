//! # Policy checker
//!
//! Compiles one or more policy files and prints what they secure.
//!
//! ```text
//! rolegate-check [--json] <policy-file>...
//! ```
//!
//! Several files are read in order as if concatenated. Exits non-zero with
//! the compiler error when a policy is malformed.
//!
//! Environment variables:
//! - `RUST_LOG` - Log level (default: info)

use anyhow::Context;
use clap::Parser;
use rolegate::reader::Reader;
use rolegate::rules::RuleSet;
use rolegate::types::Action;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Policy checker CLI
#[derive(Parser)]
#[command(name = "rolegate-check")]
#[command(about = "Compile rolegate policy files and summarize what they secure")]
#[command(version)]
struct Args {
    /// Print the compiled rule set as JSON
    #[arg(long)]
    json: bool,

    /// Policy files, compiled in order as if concatenated
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn print_summary(rules: &RuleSet) {
    for action in [Action::Create, Action::Update, Action::Delete] {
        if let Some(table) = rules.universal(action) {
            if !table.is_empty() {
                let roles: Vec<&str> = table.roles().map(|r| r.as_str()).collect();
                println!("universal {action}: {}", roles.join(", "));
            }
        }
    }

    for (name, rule) in &rules.resources {
        println!("{name}");
        for action in Action::ALL {
            let table = rule.table(action);
            if table.is_empty() {
                continue;
            }
            let roles: Vec<&str> = table.roles().map(|r| r.as_str()).collect();
            println!("  {action}: {}", roles.join(", "));
        }
        if !rule.exclusive_roles.is_empty() {
            let roles: Vec<&str> = rule.exclusive_roles.iter().map(|r| r.as_str()).collect();
            println!("  exclusive: {}", roles.join(", "));
        }
        for dependency in &rule.dependencies {
            println!("  destroyed with: {dependency}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("rolegate-check v{}", rolegate::VERSION);

    let mut reader = Reader::new();
    for file in &args.files {
        reader
            .parse_file(file)
            .with_context(|| format!("failed to compile {}", file.display()))?;
    }
    let rules = reader.into_rules();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
    } else {
        print_summary(&rules);
    }
    Ok(())
}
