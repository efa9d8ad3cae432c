use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use capgains_core::pipeline;
use capgains_core::rules::get_active_rules;
use capgains_core::sip::SipInput;

use crate::input;

/// Arguments for a periodic or lump-sum fund investment
#[derive(Args)]
pub struct SipArgs {
    /// Path to a JSON/YAML investment input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the intended exit date (YYYY-MM-DD)
    #[arg(long)]
    pub exit_date: Option<NaiveDate>,

    /// Override the unit price at the intended exit
    #[arg(long)]
    pub exit_price: Option<Decimal>,

    /// Print only the exit simulations
    #[arg(long)]
    pub simulations_only: bool,
}

pub fn run_sip(args: SipArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sip_input: SipInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for SIP analysis".into());
    };

    if let Some(date) = args.exit_date {
        sip_input.intended_exit_date = date;
    }
    if args.exit_price.is_some() {
        sip_input.exit_price = args.exit_price;
    }

    let rules = get_active_rules();
    let result = pipeline::analyze_sip(&sip_input, &rules)?;

    if args.simulations_only {
        return Ok(serde_json::json!({
            "results": serde_json::to_value(&result.result.simulations)?,
            "warnings": result.warnings,
        }));
    }
    Ok(serde_json::to_value(result)?)
}
