use chrono::NaiveDate;
use napi::Result as NapiResult;
use napi_derive::napi;

use capgains_core::asset::AssetInput;
use capgains_core::compliance::ReportedEntry;
use capgains_core::pipeline;
use capgains_core::rules::{self, FiscalYear, TaxRulesConfig};
use capgains_core::sip::SipInput;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// `reported_json`, when given, is a JSON list of third-party reported
/// entries to reconcile the disposal against.
#[napi]
pub fn analyze_asset(input_json: String, reported_json: Option<String>) -> NapiResult<String> {
    let input: AssetInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let active = rules::get_active_rules();
    let output = match reported_json {
        Some(json) => {
            let reported: Vec<ReportedEntry> =
                serde_json::from_str(&json).map_err(to_napi_error)?;
            pipeline::analyze_asset_with_reports(&input, &reported, &active)
        }
        None => pipeline::analyze_asset(&input, &active),
    }
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_sip(input_json: String) -> NapiResult<String> {
    let input: SipInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pipeline::analyze_sip_with_active_rules(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[napi]
pub fn active_rules() -> NapiResult<String> {
    let active = rules::get_active_rules();
    serde_json::to_string(active.as_ref()).map_err(to_napi_error)
}

#[napi]
pub fn set_active_rules(rules_json: String) -> NapiResult<()> {
    let config = TaxRulesConfig::from_json_str(&rules_json).map_err(to_napi_error)?;
    rules::set_active_rules(config).map_err(to_napi_error)
}

#[napi]
pub fn index_for_fiscal_year(label: String) -> NapiResult<Option<String>> {
    Ok(rules::index_for_fiscal_year(&label).map(|v| v.to_string()))
}

#[napi]
pub fn fiscal_year_for_date(date: String) -> NapiResult<String> {
    let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(to_napi_error)?;
    Ok(FiscalYear::for_date(parsed).label())
}
