//! ztable CLI - Standard-normal Z-table spreadsheet generator
//!
//! Command-line interface for generating the Z-table workbook, exporting the
//! raw table, validating a configuration and evaluating the calculators.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use ztable_core::{Config, Renderer, SheetPlan};
use ztable_render::{write_atomic, ExcelRenderer, TableFormat, TableRenderer};

#[derive(Parser)]
#[command(name = "ztable")]
#[command(author, version, about = "Standard-normal Z-table spreadsheet generator", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Configuration source shared by every command
#[derive(Args)]
struct ConfigArgs {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", env = "ZTABLE_CONFIG")]
    config: Option<PathBuf>,

    /// Lower bound of the z interval
    #[arg(long, allow_hyphen_values = true)]
    lo: Option<Decimal>,

    /// Upper bound of the z interval
    #[arg(long, allow_hyphen_values = true)]
    hi: Option<Decimal>,

    /// Increment between table rows
    #[arg(long)]
    step: Option<Decimal>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the Z-table workbook
    Generate {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output file (overrides the configured path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sheet protection passphrase
        #[arg(long, env = "ZTABLE_PASSWORD")]
        password: Option<String>,

        /// Leave the sheet unprotected
        #[arg(long)]
        no_protect: bool,
    },

    /// Export the raw table (csv, json, text)
    Table {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output format
        #[arg(short, long, default_value = "csv")]
        format: TableFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration and report wiring warnings
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Evaluate the calculator formulas for the given inputs
    Calc {
        #[command(flatten)]
        config: ConfigArgs,

        /// Input value, e.g. --set ZLow=-1.96 (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, f64)>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            config,
            output,
            password,
            no_protect,
        } => {
            let mut config = load_config(&config)?;
            if let Some(output) = output {
                config.output.path = output;
            }
            if password.is_some() {
                config.protection.password = password;
            }
            if no_protect {
                config.protection.enabled = false;
            }
            cmd_generate(&config)
        }
        Commands::Table {
            config,
            format,
            output,
        } => cmd_table(&load_config(&config)?, format, output.as_deref()),
        Commands::Check { config } => cmd_check(&load_config(&config)?),
        Commands::Calc { config, set, json } => cmd_calc(&load_config(&config)?, &set, json),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Read the configuration file, if any, and apply command-line overrides
fn load_config(args: &ConfigArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Config::from_toml_str(&text)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(lo) = args.lo {
        config.table.lo = lo;
    }
    if let Some(hi) = args.hi {
        config.table.hi = hi;
    }
    if let Some(step) = args.step {
        config.table.step = step;
    }
    Ok(config)
}

fn parse_assignment(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {}: {e}", name.trim()))?;
    Ok((name.trim().to_string(), value))
}

fn build_plan(config: &Config) -> Result<SheetPlan> {
    SheetPlan::build(config).context("Failed to build the Z-table sheet")
}

fn cmd_generate(config: &Config) -> Result<()> {
    let plan = build_plan(config)?;
    let path = &config.output.path;

    ExcelRenderer::new()
        .write_to_path(&plan, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "Wrote {} ({} rows, {} named ranges, {} formulas)",
        path.display(),
        plan.series.len(),
        plan.names.len(),
        plan.formula_order.len()
    );
    Ok(())
}

fn cmd_table(config: &Config, format: TableFormat, output: Option<&Path>) -> Result<()> {
    let plan = build_plan(config)?;
    let rendered = TableRenderer::new()
        .format(format)
        .decimals(config.table.probability_decimals)
        .render(&plan)?;

    match output {
        Some(path) => {
            write_atomic(path, rendered.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} ({} rows)", path.display(), plan.series.len());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn cmd_check(config: &Config) -> Result<()> {
    let plan = build_plan(config)?;
    let (first, last) = match (plan.series.first(), plan.series.last()) {
        (Some(first), Some(last)) => (first.z, last.z),
        _ => return Err(anyhow!("the table is empty")),
    };
    let places = plan.series.precision() as usize;

    println!("Sheet:    {}", plan.sheet_name);
    println!(
        "Table:    {} rows, z from {first:.places$} to {last:.places$}",
        plan.series.len()
    );
    println!("Names:    {}", plan.names.len());
    println!("Formulas: {}", plan.formula_order.len());
    println!(
        "Protect:  {}",
        if plan.protection.enabled { "on" } else { "off" }
    );

    if plan.warnings.is_empty() {
        println!("OK");
    } else {
        println!("{} warning(s):", plan.warnings.len());
        for warning in &plan.warnings {
            println!("  {warning}");
        }
    }
    Ok(())
}

fn cmd_calc(config: &Config, inputs: &[(String, f64)], json: bool) -> Result<()> {
    let plan = build_plan(config)?;
    let outputs = plan.evaluate(inputs.iter().map(|(name, value)| (name.as_str(), *value)))?;

    if json {
        let map: serde_json::Map<String, serde_json::Value> = outputs
            .iter()
            .map(|out| {
                let value = match out.value.as_number() {
                    Some(n) => serde_json::json!(n),
                    None if out.value.is_blank() => serde_json::Value::Null,
                    None => serde_json::json!(out.value.to_string()),
                };
                (out.name.clone(), value)
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        let width = outputs.iter().map(|out| out.name.len()).max().unwrap_or(0);
        for out in &outputs {
            println!("{:<width$}  {:>5}  {}", out.name, out.cell.to_string(), out.display());
        }
    }
    Ok(())
}
