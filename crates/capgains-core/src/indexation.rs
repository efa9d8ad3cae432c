use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::AssetInput;
use crate::classification::classify_holding_period;
use crate::rules::{FiscalYear, TaxRulesConfig};
use crate::tax::flat_tax_with_cess;
use crate::types::Money;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedImprovement {
    pub date: NaiveDate,
    /// Fiscal year whose index was used (floored to the base year).
    pub fiscal_year: FiscalYear,
    pub index_value: Option<Decimal>,
    pub amount: Money,
    pub indexed_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Inflation-adjusted cost base for a long-term, indexable disposal.
///
/// When `applies` is false every cost field carries the un-indexed amount
/// and `tax_with_indexation == tax_without_indexation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexationResult {
    pub applies: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_applied_reason: Option<String>,
    pub source_fiscal_year: FiscalYear,
    pub target_fiscal_year: FiscalYear,
    pub source_index: Option<Decimal>,
    pub target_index: Option<Decimal>,
    pub acquisition_cost: Money,
    pub indexed_acquisition_cost: Money,
    pub improvements: Vec<IndexedImprovement>,
    /// Indexed acquisition cost + indexed improvements + transfer expenses.
    pub total_indexed_cost: Money,
    pub transfer_expenses: Money,
    /// Cost base actually deducted from proceeds.
    pub final_indexed_cost: Money,
    /// Proceeds less the final cost base; negative when indexation wipes out the gain.
    pub indexed_gain: Money,
    pub unindexed_gain: Money,
    pub tax_with_indexation: Money,
    pub tax_without_indexation: Money,
    pub indexation_saving: Money,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Indexed cost base for `input`, or `None` when indexation is not relevant
/// (short-term holding, or a category that is never indexed).
///
/// Missing or non-positive index values never fail the computation: the
/// result comes back with `applies = false` and un-indexed figures.
pub fn compute_indexation(input: &AssetInput, rules: &TaxRulesConfig) -> Option<IndexationResult> {
    if !input.category.is_indexable() {
        return None;
    }
    let holding = classify_holding_period(input, rules);
    if !holding.is_long_term {
        return None;
    }

    let target_fiscal_year = FiscalYear::for_date(input.effective_disposal_date());
    let target_index = rules
        .index_for(target_fiscal_year)
        .filter(|index| *index > Decimal::ZERO);
    let (source_fiscal_year, source_index) =
        rules.source_index_for(FiscalYear::for_date(input.acquisition_date));

    let improvement_sources: Vec<(FiscalYear, Option<Decimal>)> = input
        .improvements
        .iter()
        .map(|i| rules.source_index_for(FiscalYear::for_date(i.date)))
        .collect();

    let not_applied_reason = if target_index.is_none() {
        Some(format!(
            "No cost inflation index published for disposal year {target_fiscal_year}"
        ))
    } else if source_index.is_none() {
        Some(format!(
            "No cost inflation index published for acquisition year {source_fiscal_year}"
        ))
    } else {
        improvement_sources
            .iter()
            .find(|(_, index)| index.is_none())
            .map(|(fy, _)| format!("No cost inflation index published for improvement year {fy}"))
    };
    let applies = not_applied_reason.is_none();

    if let Some(reason) = &not_applied_reason {
        tracing::warn!(%reason, "indexation degraded to un-indexed cost");
    }

    let index_amount = |amount: Money, source: Option<Decimal>| -> Money {
        match (applies, source, target_index) {
            (true, Some(source), Some(target)) if source > Decimal::ZERO => amount * target / source,
            _ => amount,
        }
    };

    let indexed_acquisition_cost = index_amount(input.acquisition_cost, source_index);
    let improvements: Vec<IndexedImprovement> = input
        .improvements
        .iter()
        .zip(improvement_sources)
        .map(|(improvement, (fiscal_year, index_value))| IndexedImprovement {
            date: improvement.date,
            fiscal_year,
            index_value,
            amount: improvement.amount,
            indexed_amount: index_amount(improvement.amount, index_value),
            description: improvement.description.clone(),
        })
        .collect();

    let indexed_improvements: Money = improvements.iter().map(|i| i.indexed_amount).sum();
    let total_indexed_cost =
        indexed_acquisition_cost + indexed_improvements + input.transfer_expenses;
    let final_indexed_cost = total_indexed_cost;

    let indexed_gain = input.disposal_proceeds - final_indexed_cost;
    let unindexed_gain = input.unindexed_gain();

    let rate = rules.flat_rates.non_equity_long_term;
    let tax_with_indexation = flat_tax_with_cess(indexed_gain, rate, rules);
    let tax_without_indexation = flat_tax_with_cess(unindexed_gain, rate, rules);

    tracing::debug!(
        applies,
        %source_fiscal_year,
        %target_fiscal_year,
        %final_indexed_cost,
        "indexation computed"
    );

    Some(IndexationResult {
        applies,
        not_applied_reason,
        source_fiscal_year,
        target_fiscal_year,
        source_index,
        target_index,
        acquisition_cost: input.acquisition_cost,
        indexed_acquisition_cost,
        improvements,
        total_indexed_cost,
        transfer_expenses: input.transfer_expenses,
        final_indexed_cost,
        indexed_gain,
        unindexed_gain,
        tax_with_indexation,
        tax_without_indexation,
        indexation_saving: tax_without_indexation - tax_with_indexation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetCategory, FrequencyTier, HoldingIntent, ImprovementCost, Jurisdiction};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn gold_input() -> AssetInput {
        AssetInput {
            category: AssetCategory::PreciousMetal,
            acquisition_date: date(2017, 8, 1),
            acquisition_cost: dec!(272_000),
            disposal_date: date(2024, 10, 1),
            simulated_disposal_date: None,
            disposal_proceeds: dec!(600_000),
            jurisdiction: Jurisdiction::Domestic,
            holding_intent: HoldingIntent::Investment,
            frequency_tier: FrequencyTier::Low,
            improvements: vec![],
            transfer_expenses: dec!(0),
        }
    }

    #[test]
    fn test_acquisition_cost_scaled_by_index_ratio() {
        let rules = TaxRulesConfig::fy_2024_25();
        let result = compute_indexation(&gold_input(), &rules).unwrap();
        assert!(result.applies);
        assert_eq!(result.source_fiscal_year.to_string(), "2017-18");
        assert_eq!(result.target_fiscal_year.to_string(), "2024-25");
        // 272,000 * 363 / 272
        assert_eq!(result.indexed_acquisition_cost, dec!(363_000));
        assert_eq!(result.indexed_gain, dec!(237_000));
        // 20% + 4% cess on each basis
        assert_eq!(result.tax_with_indexation, dec!(49_296));
        assert_eq!(result.tax_without_indexation, dec!(68_224));
        assert_eq!(result.indexation_saving, dec!(18_928));
    }

    #[test]
    fn test_each_improvement_uses_its_own_year() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut input = gold_input();
        input.category = AssetCategory::RealProperty;
        input.acquisition_date = date(1998, 5, 1);
        input.acquisition_cost = dec!(100_000);
        input.disposal_proceeds = dec!(2_000_000);
        input.improvements = vec![
            ImprovementCost { date: date(1999, 1, 1), amount: dec!(10_000), description: None },
            ImprovementCost { date: date(2020, 6, 1), amount: dec!(301_000), description: None },
        ];
        input.transfer_expenses = dec!(5_000);

        let result = compute_indexation(&input, &rules).unwrap();
        assert!(result.applies);
        // Pre-base-year costs are floored to 2001-02 (index 100).
        assert_eq!(result.source_fiscal_year.to_string(), "2001-02");
        assert_eq!(result.indexed_acquisition_cost, dec!(363_000));
        assert_eq!(result.improvements[0].fiscal_year.to_string(), "2001-02");
        assert_eq!(result.improvements[0].indexed_amount, dec!(36_300));
        assert_eq!(result.improvements[1].index_value, Some(dec!(301)));
        assert_eq!(result.improvements[1].indexed_amount, dec!(363_000));
        assert_eq!(result.total_indexed_cost, dec!(767_300));
    }

    #[test]
    fn test_missing_target_index_degrades_gracefully() {
        let mut rules = TaxRulesConfig::fy_2024_25();
        rules.cost_inflation_index.remove(&FiscalYear::starting(2024));
        let result = compute_indexation(&gold_input(), &rules).unwrap();
        assert!(!result.applies);
        assert!(result.not_applied_reason.is_some());
        assert_eq!(result.indexed_acquisition_cost, dec!(272_000));
        assert_eq!(result.final_indexed_cost, dec!(272_000));
        assert_eq!(result.tax_with_indexation, result.tax_without_indexation);
        assert_eq!(result.indexation_saving, Decimal::ZERO);
    }

    #[test]
    fn test_not_computed_for_short_term_or_excluded_categories() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut short = gold_input();
        short.acquisition_date = date(2024, 1, 1);
        assert!(compute_indexation(&short, &rules).is_none());

        for category in [
            AssetCategory::ListedEquity,
            AssetCategory::EquityFund,
            AssetCategory::DebtFund,
            AssetCategory::DigitalAsset,
        ] {
            let mut input = gold_input();
            input.category = category;
            assert!(compute_indexation(&input, &rules).is_none(), "{category:?}");
        }
    }
}
