mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::asset::AssetArgs;
use commands::rules::{FiscalYearArgs, RulesArgs};
use commands::sip::SipArgs;

/// Capital-gains tax computation
#[derive(Parser)]
#[command(
    name = "cgt",
    version,
    about = "Capital-gains classification, indexation and tax computation",
    long_about = "A CLI for computing capital-gains tax on asset disposals and periodic \
                  fund investments with decimal precision. Supports holding-period \
                  classification, cost indexation, slab and flat-rate tax, FIFO lot \
                  matching, exit simulation and filing-schedule mapping."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Rule set file (JSON or YAML) replacing the built-in rules
    #[arg(long, global = true, env = "CAPGAINS_RULES_PATH")]
    rules: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single asset disposal
    Asset(AssetArgs),
    /// Analyze a periodic or lump-sum fund investment
    Sip(SipArgs),
    /// Print the active rule set
    Rules(RulesArgs),
    /// Fiscal year containing a date
    FiscalYear(FiscalYearArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(path) = cli.rules.as_deref() {
        if let Err(e) = commands::rules::install_rules(path) {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Asset(args) => commands::asset::run_asset(args),
        Commands::Sip(args) => commands::sip::run_sip(args),
        Commands::Rules(args) => commands::rules::run_rules(args),
        Commands::FiscalYear(args) => commands::rules::run_fiscal_year(args),
        Commands::Version => {
            println!("cgt {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
