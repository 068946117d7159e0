//! memctl command-line entry point.
//!
//! Runs named memory operations against the host allocator and the board's
//! memory sources, printing one result per operation.
//!
//! ```text
//! memctl [--config FILE] [--json] [--heap] OP [ARG] [OP [ARG] ...]
//! ```

use anyhow::{Result, bail};
use clap::Parser;
use memctl::{GcModule, MallocReclaimer, MemctlConfig, Operation, Reclaimer, Value};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Heap and system memory control
#[derive(Parser, Debug)]
#[command(name = "memctl")]
#[command(about = "Run heap and system memory operations")]
#[command(allow_negative_numbers = true)]
struct MemctlArgs {
    /// TOML file with source locations
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print results as one JSON object
    #[arg(long)]
    json: bool,

    /// Print a heap summary after the results
    #[arg(long)]
    heap: bool,

    /// Operation names, each followed by its integer arguments
    #[arg(value_name = "OP [ARG]")]
    calls: Vec<String>,
}

/// Group `OP [ARG]...` tokens into calls. Integers attach to the operation
/// before them.
fn group_calls(tokens: &[String]) -> Result<Vec<(Operation, Vec<i64>)>> {
    let mut calls: Vec<(Operation, Vec<i64>)> = Vec::new();

    for token in tokens {
        if let Ok(n) = token.parse::<i64>() {
            match calls.last_mut() {
                Some((_, args)) => args.push(n),
                None => bail!("argument {n} given before any operation"),
            }
            continue;
        }
        calls.push((token.parse()?, Vec::new()));
    }

    Ok(calls)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = MemctlArgs::parse();
    let calls = group_calls(&args.calls)?;

    if calls.is_empty() && !args.heap {
        for name in GcModule::<MallocReclaimer>::operations() {
            println!("{name}");
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => MemctlConfig::from_toml_file(path)?,
        None => MemctlConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;
    debug!(?config, "Configuration loaded");

    let mut module = GcModule::with_config(MallocReclaimer::new(), &config);
    let mut results: Vec<(&'static str, Value)> = Vec::with_capacity(calls.len());
    for (op, op_args) in &calls {
        let value = module
            .call(*op, op_args)
            .map_err(|e| anyhow::anyhow!("{op} failed: {e}"))?;
        results.push((op.name(), value));
    }

    if args.json {
        let mut map = serde_json::Map::new();
        for (name, value) in &results {
            map.insert(name.to_string(), serde_json::to_value(value)?);
        }
        if args.heap {
            map.insert("heap".to_string(), serde_json::to_value(module.reclaimer().info())?);
        }
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        for (name, value) in &results {
            println!("{name}: {value}");
        }
        if args.heap {
            println!("heap: {}", module.reclaimer().info());
        }
    }

    info!(operations = results.len(), "memctl done");
    Ok(())
}
