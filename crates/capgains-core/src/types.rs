use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rupee amounts: costs, proceeds, gains and tax.
pub type Money = Decimal;

/// Tax, surcharge and growth rates as decimals (0.125 = 12.5%).
pub type Rate = Decimal;

/// Fund units held in a lot or redeemed from it.
pub type Units = Decimal;

/// Envelope returned by every top-level analysis.
///
/// Two runs over the same input and rules agree on everything except
/// `metadata.computation_time_us`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
    /// Fiscal year of the disposal or valuation date, e.g. `"2024-25"`.
    pub fiscal_year: String,
}

/// Wrap an analysis result with its methodology, assumptions and warnings.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    fiscal_year: &str,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
            fiscal_year: fiscal_year.to_string(),
        },
    }
}
