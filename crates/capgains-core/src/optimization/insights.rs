use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::AssetInput;
use crate::classification::{classify_holding_period, classify_income, Classification, HoldingPeriodDetail};
use crate::indexation::{compute_indexation, IndexationResult};
use crate::rules::TaxRulesConfig;
use crate::tax::{compute_cess, compute_tax, TaxComputation, TaxRegime};
use crate::types::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// Waiting until the holding turns long-term lowers the tax.
    DeferForLongTerm,
    IndexationBenefit,
    /// Unused equity LTCG exemption that further gains could absorb tax-free.
    ExemptionHeadroom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationInsight {
    pub kind: InsightKind,
    pub title: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_disposal_date: Option<NaiveDate>,
    pub estimated_tax_saving: Money,
}

/// Insights for a single disposal, derived from the already-computed stages.
///
/// The deferral insight re-runs classification, indexation and tax with the
/// disposal moved to the long-term eligibility date. Proceeds are assumed
/// unchanged at the later date.
pub fn asset_insights(
    input: &AssetInput,
    classification: &Classification,
    holding: &HoldingPeriodDetail,
    tax: Option<&TaxComputation>,
    indexation: Option<&IndexationResult>,
    rules: &TaxRulesConfig,
) -> Vec<OptimizationInsight> {
    let mut insights: Vec<OptimizationInsight> = Vec::new();

    if let Some(current) = tax {
        if let Some(insight) = deferral_insight(input, classification, holding, current, rules) {
            insights.push(insight);
        }
    }

    if let Some(ix) = indexation.filter(|ix| ix.applies && ix.indexation_saving > Decimal::ZERO) {
        insights.push(OptimizationInsight {
            kind: InsightKind::IndexationBenefit,
            title: "Indexation reduces the taxable gain".into(),
            detail: format!(
                "Indexing cost from {} (index {}) to {} (index {}) lifts the cost base to {} and saves {} in tax",
                ix.source_fiscal_year,
                fmt_index(ix.source_index),
                ix.target_fiscal_year,
                fmt_index(ix.target_index),
                ix.final_indexed_cost.round_dp(2),
                ix.indexation_saving.round_dp(2),
            ),
            suggested_disposal_date: None,
            estimated_tax_saving: ix.indexation_saving,
        });
    }

    if let Some(current) = tax.filter(|t| t.regime == TaxRegime::EquityLongTermFlat) {
        let headroom = rules.equity_ltcg_exemption - current.exemption_consumed;
        if headroom > Decimal::ZERO {
            let base = headroom * rules.flat_rates.equity_long_term;
            let saving = base + compute_cess(base, rules);
            insights.push(OptimizationInsight {
                kind: InsightKind::ExemptionHeadroom,
                title: "Unused long-term exemption".into(),
                detail: format!(
                    "A further {} of long-term equity gains can be realized this year without tax",
                    headroom.round_dp(2)
                ),
                suggested_disposal_date: None,
                estimated_tax_saving: saving,
            });
        }
    }

    tracing::debug!(count = insights.len(), "optimization insights derived");
    insights
}

fn deferral_insight(
    input: &AssetInput,
    classification: &Classification,
    holding: &HoldingPeriodDetail,
    current: &TaxComputation,
    rules: &TaxRulesConfig,
) -> Option<OptimizationInsight> {
    if !holding.is_short_term
        || classification.is_business_income()
        || input.category.is_debt_fund()
    {
        return None;
    }
    let eligible = holding.long_term_eligible_from?;
    let horizon = input.effective_disposal_date() + Duration::days(rules.exit_lookahead_days);
    if eligible > horizon {
        return None;
    }

    let deferred = input.with_simulated_disposal(eligible);
    let deferred_classification = classify_income(&deferred, rules);
    let deferred_holding = classify_holding_period(&deferred, rules);
    let deferred_indexation = compute_indexation(&deferred, rules);
    let deferred_tax = compute_tax(
        &deferred,
        &deferred_classification,
        &deferred_holding,
        deferred_indexation.as_ref(),
        rules,
    )
    .ok()?;

    let saving = current.total_liability - deferred_tax.total_liability;
    if saving <= Decimal::ZERO {
        return None;
    }

    let wait_days = (eligible - input.effective_disposal_date()).num_days();
    Some(OptimizationInsight {
        kind: InsightKind::DeferForLongTerm,
        title: "Defer disposal until long-term".into(),
        detail: format!(
            "Disposing on {eligible} ({wait_days} days later) makes the gain long-term; tax falls from {} to {}",
            current.total_liability.round_dp(2),
            deferred_tax.total_liability.round_dp(2),
        ),
        suggested_disposal_date: Some(eligible),
        estimated_tax_saving: saving,
    })
}

fn fmt_index(index: Option<Decimal>) -> String {
    index.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}
