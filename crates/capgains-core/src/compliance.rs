use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::asset::{AssetCategory, AssetInput};
use crate::classification::{Classification, GainType};
use crate::tax::TaxComputation;
use crate::types::Money;

/// Property sales at or above this consideration carry buyer-side TDS.
const PROPERTY_TDS_THRESHOLD: Money = dec!(5_000_000);

/// Relative difference between reported and declared consideration tolerated
/// before a mismatch is flagged.
const REPORTED_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum ItrForm {
    Itr2,
    Itr3,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleFlags {
    pub schedule_cg: bool,
    pub schedule_bp: bool,
    pub schedule_112a: bool,
    pub schedule_vda: bool,
    pub schedule_fa: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSeverity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationFlag {
    pub code: String,
    pub severity: FlagSeverity,
    pub message: String,
}

/// Autofill payload: schedule name -> statutory field name -> value.
pub type AutofillPayload = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceMapping {
    pub itr_form: ItrForm,
    pub schedules: ScheduleFlags,
    pub reconciliation_flags: Vec<ReconciliationFlag>,
    pub autofill: AutofillPayload,
}

/// One line of third-party reported income (annual information statement,
/// tax credit statement), already parsed by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedEntry {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub amount: Money,
}

/// Outcome of looking up a reported line by its codes.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    Found(&'a ReportedEntry),
    NotFound { searched: Vec<String> },
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// First entry matching any of `codes`, tried in the order given.
pub fn resolve_reported<'a>(entries: &'a [ReportedEntry], codes: &[&str]) -> Resolution<'a> {
    codes
        .iter()
        .find_map(|code| {
            entries
                .iter()
                .find(|entry| entry.code.eq_ignore_ascii_case(code))
        })
        .map(Resolution::Found)
        .unwrap_or_else(|| Resolution::NotFound {
            searched: codes.iter().map(|c| c.to_string()).collect(),
        })
}

/// Reporting codes under which a disposal of `category` shows up in the
/// third-party statements, most specific first.
pub fn reported_codes_for(category: AssetCategory) -> &'static [&'static str] {
    match category {
        AssetCategory::ListedEquity | AssetCategory::EquityFund | AssetCategory::DebtFund => {
            &["SFT-017", "SFT-018"]
        }
        AssetCategory::RealProperty => &["SFT-012", "TDS-194IA"],
        AssetCategory::DigitalAsset => &["TDS-194S"],
        AssetCategory::PreciousMetal
        | AssetCategory::Commodity
        | AssetCategory::ForeignEquity
        | AssetCategory::ForeignProperty => &[],
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

pub fn build_compliance_mapping(
    input: &AssetInput,
    classification: &Classification,
    tax: Option<&TaxComputation>,
) -> ComplianceMapping {
    let business = classification.is_business_income();
    let category = input.category;

    let schedules = ScheduleFlags {
        schedule_cg: !business,
        schedule_bp: business,
        schedule_112a: !business
            && category.is_equity_like()
            && classification.gain_type == GainType::LongTerm,
        schedule_vda: category.is_digital(),
        schedule_fa: input.is_foreign(),
    };
    let itr_form = if business { ItrForm::Itr3 } else { ItrForm::Itr2 };

    let mut flags: Vec<ReconciliationFlag> = Vec::new();
    if category.is_equity_like() || category.is_debt_fund() {
        flags.push(flag(
            "AIS_SECURITIES",
            FlagSeverity::Info,
            "Cross-check the sale consideration with securities transactions in the annual information statement",
        ));
    }
    if category.is_digital() {
        flags.push(flag(
            "TDS_194S",
            FlagSeverity::Info,
            "Confirm TDS deducted on transfer of the virtual digital asset appears in the tax credit statement",
        ));
    }
    if category == AssetCategory::RealProperty && input.disposal_proceeds >= PROPERTY_TDS_THRESHOLD {
        flags.push(flag(
            "TDS_194IA",
            FlagSeverity::Info,
            "Buyer must deduct TDS on this property sale; confirm the credit is reflected",
        ));
    }
    if input.is_foreign() {
        flags.push(flag(
            "FOREIGN_TAX_CREDIT",
            FlagSeverity::Warning,
            "Disclose the foreign asset in Schedule FA and claim any foreign tax credit separately",
        ));
    }
    if classification.gain_type == GainType::Business {
        flags.push(flag(
            "BUSINESS_BOOKS",
            FlagSeverity::Info,
            "Trading disposals are business income; maintain books of account for the turnover",
        ));
    }
    if tax.is_some_and(|t| t.ancillary_registration_required) {
        flags.push(flag(
            "TURNOVER_REGISTRATION",
            FlagSeverity::Warning,
            "Turnover crosses the indirect-tax registration threshold",
        ));
    }

    let autofill = build_autofill(input, classification, tax, &schedules);

    tracing::debug!(
        ?itr_form,
        flags = flags.len(),
        "compliance mapping built"
    );

    ComplianceMapping {
        itr_form,
        schedules,
        reconciliation_flags: flags,
        autofill,
    }
}

/// Mapping plus cross-checks against third-party reported entries.
pub fn build_compliance_mapping_with_reports(
    input: &AssetInput,
    classification: &Classification,
    tax: Option<&TaxComputation>,
    reported: &[ReportedEntry],
) -> ComplianceMapping {
    let mut mapping = build_compliance_mapping(input, classification, tax);
    let codes = reported_codes_for(input.category);
    if codes.is_empty() {
        return mapping;
    }

    match resolve_reported(reported, codes) {
        Resolution::Found(entry) => {
            let declared = input.disposal_proceeds;
            let mismatch = if declared.is_zero() {
                !entry.amount.is_zero()
            } else {
                ((entry.amount - declared) / declared).abs() > REPORTED_TOLERANCE
            };
            if mismatch {
                mapping.reconciliation_flags.push(flag(
                    "REPORTED_MISMATCH",
                    FlagSeverity::Warning,
                    &format!(
                        "{} reports {} against declared consideration of {}",
                        entry.code,
                        entry.amount.round_dp(2),
                        declared.round_dp(2)
                    ),
                ));
            }
        }
        Resolution::NotFound { searched } => {
            mapping.reconciliation_flags.push(flag(
                "NOT_REPORTED",
                FlagSeverity::Warning,
                &format!(
                    "No third-party reported entry found (searched {})",
                    searched.join(", ")
                ),
            ));
        }
    }
    mapping
}

fn build_autofill(
    input: &AssetInput,
    classification: &Classification,
    tax: Option<&TaxComputation>,
    schedules: &ScheduleFlags,
) -> AutofillPayload {
    let mut payload = AutofillPayload::new();
    let gain = input.unindexed_gain();
    let taxable = tax.map_or(Decimal::ZERO, |t| t.taxable_amount);
    let liability = tax.map_or(Decimal::ZERO, |t| t.total_liability);

    if schedules.schedule_cg {
        let mut cg = BTreeMap::new();
        cg.insert("asset_category".into(), json!(input.category.display_name()));
        cg.insert("gain_type".into(), serde_json::to_value(classification.gain_type).unwrap_or(Value::Null));
        cg.insert("date_of_acquisition".into(), json!(input.acquisition_date.to_string()));
        cg.insert("date_of_transfer".into(), json!(input.effective_disposal_date().to_string()));
        cg.insert("full_value_of_consideration".into(), money(input.disposal_proceeds));
        cg.insert("cost_of_acquisition".into(), money(input.acquisition_cost));
        cg.insert("cost_of_improvement".into(), money(input.total_improvement_cost()));
        cg.insert("expenditure_on_transfer".into(), money(input.transfer_expenses));
        cg.insert("capital_gain".into(), money(tax.map_or(gain, |t| t.realized_gain)));
        cg.insert("taxable_amount".into(), money(taxable));
        cg.insert("tax_payable".into(), money(liability));
        payload.insert("schedule_cg".into(), cg);
    }

    if schedules.schedule_bp {
        let mut bp = BTreeMap::new();
        bp.insert("turnover".into(), money(input.disposal_proceeds));
        bp.insert("profit_from_trading".into(), money(gain));
        bp.insert(
            "registration_required".into(),
            json!(tax.is_some_and(|t| t.ancillary_registration_required)),
        );
        bp.insert("tax_payable".into(), money(liability));
        payload.insert("schedule_bp".into(), bp);
    }

    if schedules.schedule_112a {
        let mut ltcg = BTreeMap::new();
        ltcg.insert("sale_consideration".into(), money(input.disposal_proceeds));
        ltcg.insert("cost_of_acquisition".into(), money(input.acquisition_cost));
        ltcg.insert(
            "exemption_claimed".into(),
            money(tax.map_or(Decimal::ZERO, |t| t.exemption_consumed)),
        );
        ltcg.insert("ltcg_after_exemption".into(), money(taxable));
        payload.insert("schedule_112a".into(), ltcg);
    }

    if schedules.schedule_vda {
        let mut vda = BTreeMap::new();
        vda.insert("date_of_acquisition".into(), json!(input.acquisition_date.to_string()));
        vda.insert("date_of_transfer".into(), json!(input.effective_disposal_date().to_string()));
        vda.insert("cost_of_acquisition".into(), money(input.acquisition_cost));
        vda.insert("consideration_received".into(), money(input.disposal_proceeds));
        vda.insert("income".into(), money(gain));
        payload.insert("schedule_vda".into(), vda);
    }

    if schedules.schedule_fa {
        let mut fa = BTreeMap::new();
        fa.insert("asset_category".into(), json!(input.category.display_name()));
        fa.insert("date_of_acquisition".into(), json!(input.acquisition_date.to_string()));
        fa.insert("initial_value".into(), money(input.acquisition_cost));
        fa.insert("sale_proceeds".into(), money(input.disposal_proceeds));
        payload.insert("schedule_fa".into(), fa);
    }

    payload
}

fn money(amount: Money) -> Value {
    Value::String(amount.round_dp(2).normalize().to_string())
}

fn flag(code: &str, severity: FlagSeverity, message: &str) -> ReconciliationFlag {
    ReconciliationFlag {
        code: code.into(),
        severity,
        message: message.into(),
    }
}
