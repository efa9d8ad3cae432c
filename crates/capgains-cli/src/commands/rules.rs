use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;

use capgains_core::rules::{
    fiscal_year_for_date, get_active_rules, set_active_rules, FiscalYear, TaxRulesConfig,
};

use crate::input;

/// Arguments for printing the active rule set
#[derive(Args)]
pub struct RulesArgs {
    /// Print only the cost-inflation index for this fiscal year (e.g. 2024-25)
    #[arg(long)]
    pub index_for: Option<String>,
}

/// Arguments for fiscal-year lookup
#[derive(Args)]
pub struct FiscalYearArgs {
    /// Date to look up (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,
}

/// Load a rule set file and make it the active rules for this process.
pub fn install_rules(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config: TaxRulesConfig = input::file::read_input(path)?;
    set_active_rules(config)?;
    tracing::debug!(%path, "rules installed from file");
    Ok(())
}

pub fn run_rules(args: RulesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rules = get_active_rules();
    match args.index_for {
        Some(label) => {
            let fiscal_year: FiscalYear = label.parse()?;
            let index = rules
                .index_for(fiscal_year)
                .ok_or_else(|| format!("No cost inflation index for {label}"))?;
            Ok(serde_json::json!({
                "result": {
                    "fiscal_year": fiscal_year,
                    "cost_inflation_index": index.to_string(),
                }
            }))
        }
        None => Ok(serde_json::json!({ "result": serde_json::to_value(rules.as_ref())? })),
    }
}

pub fn run_fiscal_year(args: FiscalYearArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let fiscal_year = fiscal_year_for_date(args.date);
    Ok(serde_json::json!({
        "result": {
            "date": args.date.to_string(),
            "fiscal_year": fiscal_year,
            "start_date": fiscal_year.start_date().map(|d| d.to_string()),
        }
    }))
}
