use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use capgains_core::asset::{AssetCategory, AssetInput, FrequencyTier, HoldingIntent, Jurisdiction};
use capgains_core::compliance::ReportedEntry;
use capgains_core::pipeline;
use capgains_core::rules::get_active_rules;

use crate::input;

/// Arguments for a single asset disposal
#[derive(Args)]
pub struct AssetArgs {
    /// Path to a JSON/YAML asset input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Third-party reported entries (JSON/YAML list) to reconcile against
    #[arg(long)]
    pub reports: Option<String>,

    /// Asset category, e.g. listed_equity, real_property, digital_asset
    #[arg(long)]
    pub category: Option<String>,

    /// Acquisition date (YYYY-MM-DD)
    #[arg(long)]
    pub acquired: Option<NaiveDate>,

    /// Disposal date (YYYY-MM-DD)
    #[arg(long)]
    pub disposed: Option<NaiveDate>,

    /// Hypothetical disposal date overriding --disposed
    #[arg(long)]
    pub simulate_disposal: Option<NaiveDate>,

    /// Acquisition cost
    #[arg(long)]
    pub cost: Option<Decimal>,

    /// Disposal proceeds
    #[arg(long)]
    pub proceeds: Option<Decimal>,

    /// Brokerage, stamp duty and other transfer expenses
    #[arg(long)]
    pub transfer_expenses: Option<Decimal>,

    /// Held for trading rather than investment
    #[arg(long)]
    pub trading: bool,

    /// Transaction frequency tier: low, medium or high
    #[arg(long)]
    pub frequency: Option<String>,

    /// Asset held outside the home jurisdiction
    #[arg(long)]
    pub foreign: bool,
}

pub fn run_asset(args: AssetArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let asset_input: AssetInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        asset_from_flags(&args)?
    };

    let rules = get_active_rules();
    let result = match args.reports {
        Some(ref path) => {
            let reported: Vec<ReportedEntry> = input::file::read_input(path)?;
            pipeline::analyze_asset_with_reports(&asset_input, &reported, &rules)?
        }
        None => pipeline::analyze_asset(&asset_input, &rules)?,
    };
    Ok(serde_json::to_value(result)?)
}

fn asset_from_flags(args: &AssetArgs) -> Result<AssetInput, Box<dyn std::error::Error>> {
    let category: AssetCategory = parse_enum(
        args.category
            .as_deref()
            .ok_or("--category is required (or provide --input)")?,
        "category",
    )?;
    let frequency_tier: FrequencyTier = match args.frequency.as_deref() {
        Some(tier) => parse_enum(tier, "frequency")?,
        None => FrequencyTier::default(),
    };

    Ok(AssetInput {
        category,
        acquisition_date: args
            .acquired
            .ok_or("--acquired is required (or provide --input)")?,
        acquisition_cost: args.cost.ok_or("--cost is required (or provide --input)")?,
        disposal_date: args
            .disposed
            .ok_or("--disposed is required (or provide --input)")?,
        simulated_disposal_date: args.simulate_disposal,
        disposal_proceeds: args
            .proceeds
            .ok_or("--proceeds is required (or provide --input)")?,
        jurisdiction: if args.foreign {
            Jurisdiction::Foreign
        } else {
            Jurisdiction::Domestic
        },
        holding_intent: if args.trading {
            HoldingIntent::Trading
        } else {
            HoldingIntent::Investment
        },
        frequency_tier,
        improvements: vec![],
        transfer_expenses: args.transfer_expenses.unwrap_or(Decimal::ZERO),
    })
}

/// Parse a snake_case flag value through the type's serde representation.
pub(crate) fn parse_enum<T: serde::de::DeserializeOwned>(
    raw: &str,
    flag: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    let normalized = raw.trim().to_lowercase().replace('-', "_");
    serde_json::from_value(Value::String(normalized))
        .map_err(|_| format!("Unrecognised --{flag} value '{raw}'").into())
}
