use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetInput, FrequencyTier};
use crate::classification::{classify_holding_period, classify_income, Classification, HoldingPeriodDetail};
use crate::indexation::{compute_indexation, IndexationResult};
use crate::optimization::{asset_insights, OptimizationInsight};
use crate::rules::{get_active_rules, FiscalYear, TaxRulesConfig};
use crate::tax::{compute_tax, TaxComputation};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::CapGainsResult;

#[cfg(feature = "compliance")]
use crate::compliance::{build_compliance_mapping_with_reports, ComplianceMapping, ReportedEntry};

#[cfg(feature = "sip")]
use crate::optimization::{simulate_exits, ExitSimulation};
#[cfg(feature = "sip")]
use crate::sip::{
    build_lots, compute_redemption_tax, snapshot_lots, LotBook, LotSnapshot, RedemptionLot,
    RedemptionTaxSummary, SipInput,
};
#[cfg(feature = "sip")]
use crate::types::Units;

// ---------------------------------------------------------------------------
// Single asset
// ---------------------------------------------------------------------------

/// Every stage's output for one disposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalGainsReport {
    pub fiscal_year: FiscalYear,
    pub classification: Classification,
    pub holding_period: HoldingPeriodDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexation: Option<IndexationResult>,
    /// Absent for a loss: only gains are taxed here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<TaxComputation>,
    pub unindexed_gain: Money,
    pub is_loss: bool,
    pub insights: Vec<OptimizationInsight>,
    #[cfg(feature = "compliance")]
    pub compliance: ComplianceMapping,
}

pub fn analyze_asset(
    input: &AssetInput,
    rules: &TaxRulesConfig,
) -> CapGainsResult<ComputationOutput<CapitalGainsReport>> {
    run_asset(input, rules, None)
}

/// As [`analyze_asset`], cross-checking the disposal against third-party
/// reported entries.
#[cfg(feature = "compliance")]
pub fn analyze_asset_with_reports(
    input: &AssetInput,
    reported: &[ReportedEntry],
    rules: &TaxRulesConfig,
) -> CapGainsResult<ComputationOutput<CapitalGainsReport>> {
    run_asset(input, rules, Some(reported))
}

pub fn analyze_asset_with_active_rules(
    input: &AssetInput,
) -> CapGainsResult<ComputationOutput<CapitalGainsReport>> {
    let rules = get_active_rules();
    analyze_asset(input, &rules)
}

#[cfg(feature = "compliance")]
type Reports<'a> = Option<&'a [ReportedEntry]>;
#[cfg(not(feature = "compliance"))]
type Reports<'a> = Option<&'a [()]>;

fn run_asset(
    input: &AssetInput,
    rules: &TaxRulesConfig,
    reported: Reports<'_>,
) -> CapGainsResult<ComputationOutput<CapitalGainsReport>> {
    let start = Instant::now();
    input.validate()?;
    let mut warnings: Vec<String> = Vec::new();

    let fiscal_year = FiscalYear::for_date(input.effective_disposal_date());
    let classification = classify_income(input, rules);
    let holding_period = classify_holding_period(input, rules);
    let indexation = compute_indexation(input, rules);

    let unindexed_gain = input.unindexed_gain();
    let is_loss = unindexed_gain < Decimal::ZERO;
    let tax = if is_loss {
        warnings.push(format!(
            "Disposal results in a loss of {}; tax is computed only for gains and loss carry-forward is not modelled",
            unindexed_gain.abs().round_dp(2)
        ));
        None
    } else {
        Some(compute_tax(
            input,
            &classification,
            &holding_period,
            indexation.as_ref(),
            rules,
        )?)
    };

    if let Some(reason) = indexation.as_ref().and_then(|ix| ix.not_applied_reason.as_ref()) {
        warnings.push(format!("Indexation not applied: {reason}"));
    }
    if classification.is_business_income() && input.frequency_tier == FrequencyTier::Medium {
        warnings.push(
            "Business-income classification rests on the medium-frequency heuristic; review with a tax professional"
                .into(),
        );
    }
    if let Some(computed) = &tax {
        if computed.ancillary_registration_required {
            warnings.push(format!(
                "Turnover of {} meets the registration threshold of {}; indirect-tax registration may be required",
                input.disposal_proceeds.round_dp(2),
                rules.registration_turnover_threshold.round_dp(2)
            ));
        }
        push_surcharge_warning(&mut warnings, computed.taxable_amount, rules);
    }

    let insights = asset_insights(
        input,
        &classification,
        &holding_period,
        tax.as_ref(),
        indexation.as_ref(),
        rules,
    );

    #[cfg(feature = "compliance")]
    let compliance = compliance_stage(input, &classification, tax.as_ref(), reported);
    #[cfg(not(feature = "compliance"))]
    let _ = reported;

    tracing::info!(
        category = ?input.category,
        %fiscal_year,
        is_loss,
        "asset analysis complete"
    );

    let report = CapitalGainsReport {
        fiscal_year,
        classification,
        holding_period,
        indexation,
        tax,
        unindexed_gain,
        is_loss,
        insights,
        #[cfg(feature = "compliance")]
        compliance,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Capital gains: classification, holding period, indexation, tax, optimization",
        &serde_json::json!({
            "rules_fiscal_year": rules.fiscal_year.to_string(),
            "disposal_fiscal_year": fiscal_year.to_string(),
            "category": input.category,
            "holding_threshold_months": report.holding_period.threshold_months,
            "cess_rate": rules.cess_rate.to_string(),
        }),
        warnings,
        elapsed,
        &fiscal_year.to_string(),
        report,
    ))
}

#[cfg(feature = "compliance")]
fn compliance_stage(
    input: &AssetInput,
    classification: &Classification,
    tax: Option<&TaxComputation>,
    reported: Reports<'_>,
) -> ComplianceMapping {
    match reported {
        Some(entries) => build_compliance_mapping_with_reports(input, classification, tax, entries),
        None => crate::compliance::build_compliance_mapping(input, classification, tax),
    }
}

fn push_surcharge_warning(warnings: &mut Vec<String>, taxable: Money, rules: &TaxRulesConfig) {
    if let Some(first) = rules.surcharge_bands.first() {
        if taxable >= first.floor {
            warnings.push(format!(
                "Taxable amount {} reaches the first surcharge band ({}); surcharge on total income may apply beyond this disposal",
                taxable.round_dp(2),
                first.floor.round_dp(2)
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Periodic investments
// ---------------------------------------------------------------------------

#[cfg(feature = "sip")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipTotals {
    pub total_invested: Money,
    pub total_units: Units,
    pub current_value: Money,
    pub unrealized_gain: Money,
    pub long_term_units: Units,
    pub short_term_units: Units,
}

#[cfg(feature = "sip")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipReport {
    pub fiscal_year: FiscalYear,
    /// Lots valued at the valuation date.
    pub lots: Vec<LotSnapshot>,
    pub totals: SipTotals,
    /// Lots consumed by the redemption at the intended exit.
    pub redemption: Vec<RedemptionLot>,
    pub redemption_tax: RedemptionTaxSummary,
    pub simulations: Vec<ExitSimulation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_exit: Option<ExitSimulation>,
}

#[cfg(feature = "sip")]
pub fn analyze_sip(
    input: &SipInput,
    rules: &TaxRulesConfig,
) -> CapGainsResult<ComputationOutput<SipReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let lots = build_lots(input)?;
    let fiscal_year = FiscalYear::for_date(input.intended_exit_date);

    let valuation_price = input.price_at(input.valuation_date)?;
    let snapshots = snapshot_lots(&lots, input.category, input.valuation_date, valuation_price, rules);
    let totals = SipTotals {
        total_invested: snapshots.iter().map(|s| s.lot.invested_amount).sum(),
        total_units: snapshots.iter().map(|s| s.lot.units).sum(),
        current_value: snapshots.iter().map(|s| s.current_value).sum(),
        unrealized_gain: snapshots.iter().map(|s| s.unrealized_gain).sum(),
        long_term_units: snapshots.iter().filter(|s| s.is_long_term).map(|s| s.lot.units).sum(),
        short_term_units: snapshots.iter().filter(|s| s.is_short_term).map(|s| s.lot.units).sum(),
    };

    let exit_price = input.intended_exit_price()?;
    let mut book = LotBook::new(lots.clone());
    let outcome = book.redeem(
        &input.redemption,
        input.intended_exit_date,
        exit_price,
        input.category,
        rules,
    )?;
    if outcome.capped {
        warnings.push(format!(
            "Redemption of {} units exceeds the {} available; capped at the available balance",
            outcome.requested_units.round_dp(4),
            outcome.redeemed_units.round_dp(4)
        ));
    }

    let redemption_tax = compute_redemption_tax(&outcome.lots, input.category, rules);
    if redemption_tax.losses_carried_forward > Decimal::ZERO {
        warnings.push(format!(
            "Redemption realizes a net loss of {}; loss carry-forward is not modelled",
            redemption_tax.losses_carried_forward.round_dp(2)
        ));
    }
    push_surcharge_warning(
        &mut warnings,
        redemption_tax.short_term_gain + redemption_tax.long_term_gain,
        rules,
    );

    let simulations = simulate_exits(input, &lots, rules)?;
    let optimal_exit = simulations.iter().find(|s| s.is_optimal).cloned();

    tracing::info!(
        lots = lots.len(),
        redeemed = outcome.lots.len(),
        simulations = simulations.len(),
        "SIP analysis complete"
    );

    let report = SipReport {
        fiscal_year,
        lots: snapshots,
        totals,
        redemption: outcome.lots,
        redemption_tax,
        simulations,
        optimal_exit,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Periodic investment: FIFO lots, redemption tax, exit simulation",
        &serde_json::json!({
            "rules_fiscal_year": rules.fiscal_year.to_string(),
            "category": input.category,
            "mode": input.mode,
            "frequency": input.frequency,
            "exit_price": exit_price.to_string(),
            "lookahead_days": rules.exit_lookahead_days,
        }),
        warnings,
        elapsed,
        &fiscal_year.to_string(),
        report,
    ))
}

#[cfg(feature = "sip")]
pub fn analyze_sip_with_active_rules(input: &SipInput) -> CapGainsResult<ComputationOutput<SipReport>> {
    let rules = get_active_rules();
    analyze_sip(input, &rules)
}
