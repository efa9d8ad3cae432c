use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::AssetInput;
use crate::classification::{Classification, GainType, HoldingPeriodDetail};
use crate::error::CapGainsError;
use crate::indexation::IndexationResult;
use crate::rules::TaxRulesConfig;
use crate::tax::rates::{compute_cess, compute_slab_tax, compute_surcharge, SlabTaxLine};
use crate::types::{Money, Rate};
use crate::CapGainsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    /// Trading disposals taxed as business income at slab rates.
    BusinessIncomeSlab,
    EquityShortTermFlat,
    /// Flat rate after the annual LTCG exemption.
    EquityLongTermFlat,
    /// Debt funds: slab rates whatever the holding period.
    DebtFundSlab,
    NonEquityShortTermSlab,
    NonEquityLongTermIndexed,
    NonEquityLongTermUnindexed,
}

impl TaxRegime {
    pub fn uses_slabs(&self) -> bool {
        match self {
            TaxRegime::BusinessIncomeSlab
            | TaxRegime::DebtFundSlab
            | TaxRegime::NonEquityShortTermSlab => true,
            TaxRegime::EquityShortTermFlat
            | TaxRegime::EquityLongTermFlat
            | TaxRegime::NonEquityLongTermIndexed
            | TaxRegime::NonEquityLongTermUnindexed => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxComputation {
    pub regime: TaxRegime,
    /// Gain on the basis the regime taxes (indexed where indexation applied), floored at zero.
    pub realized_gain: Money,
    pub exemption_consumed: Money,
    pub taxable_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_rate: Option<Rate>,
    pub base_tax: Money,
    pub surcharge: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge_rate: Option<Rate>,
    pub cess: Money,
    pub total_liability: Money,
    /// Total liability as a fraction of the realized gain.
    pub effective_rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slab_breakdown: Option<Vec<SlabTaxLine>>,
    /// Business-income turnover crosses the indirect-tax registration threshold.
    pub ancillary_registration_required: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Tax liability on a single disposal.
///
/// The un-indexed gain must be non-negative: loss scenarios are detected and
/// reported by the caller before this stage runs.
pub fn compute_tax(
    input: &AssetInput,
    classification: &Classification,
    holding: &HoldingPeriodDetail,
    indexation: Option<&IndexationResult>,
    rules: &TaxRulesConfig,
) -> CapGainsResult<TaxComputation> {
    let unindexed_gain = input.unindexed_gain();
    if unindexed_gain < Decimal::ZERO {
        return Err(CapGainsError::FinancialImpossibility(format!(
            "Tax requested on a loss of {}; losses are handled before tax computation",
            unindexed_gain.abs()
        )));
    }

    let category = input.category;
    let flat = &rules.flat_rates;

    let computation = if classification.gain_type == GainType::Business {
        slab_computation(TaxRegime::BusinessIncomeSlab, unindexed_gain, rules)
    } else if category.is_equity_like() {
        if holding.is_short_term {
            flat_computation(
                TaxRegime::EquityShortTermFlat,
                unindexed_gain,
                Decimal::ZERO,
                flat.equity_short_term,
                rules,
            )
        } else {
            let exemption = unindexed_gain.min(rules.equity_ltcg_exemption);
            flat_computation(
                TaxRegime::EquityLongTermFlat,
                unindexed_gain,
                exemption,
                flat.equity_long_term,
                rules,
            )
        }
    } else if category.is_debt_fund() {
        slab_computation(TaxRegime::DebtFundSlab, unindexed_gain, rules)
    } else if holding.is_short_term {
        slab_computation(TaxRegime::NonEquityShortTermSlab, unindexed_gain, rules)
    } else {
        match indexation.filter(|ix| ix.applies) {
            Some(ix) => flat_computation(
                TaxRegime::NonEquityLongTermIndexed,
                ix.indexed_gain.max(Decimal::ZERO),
                Decimal::ZERO,
                flat.non_equity_long_term,
                rules,
            ),
            None => flat_computation(
                TaxRegime::NonEquityLongTermUnindexed,
                unindexed_gain,
                Decimal::ZERO,
                flat.non_equity_long_term,
                rules,
            ),
        }
    };

    let ancillary_registration_required = classification.is_business_income()
        && input.disposal_proceeds >= rules.registration_turnover_threshold;

    tracing::debug!(
        regime = ?computation.regime,
        taxable = %computation.taxable_amount,
        total = %computation.total_liability,
        "tax computed"
    );

    Ok(TaxComputation {
        ancillary_registration_required,
        ..computation
    })
}

fn flat_computation(
    regime: TaxRegime,
    gain: Money,
    exemption: Money,
    rate: Rate,
    rules: &TaxRulesConfig,
) -> TaxComputation {
    let taxable_amount = (gain - exemption).max(Decimal::ZERO);
    let base_tax = taxable_amount * rate;
    let cess = compute_cess(base_tax, rules);
    finish(
        regime,
        gain,
        exemption,
        taxable_amount,
        Some(rate),
        base_tax,
        None,
        cess,
        None,
    )
}

fn slab_computation(regime: TaxRegime, gain: Money, rules: &TaxRulesConfig) -> TaxComputation {
    let taxable_amount = gain.max(Decimal::ZERO);
    let (base_tax, lines) = compute_slab_tax(taxable_amount, &rules.slabs);
    let surcharge = compute_surcharge(taxable_amount, base_tax, rules);
    let surcharge_amount = surcharge.as_ref().map_or(Decimal::ZERO, |s| s.amount);
    let cess = compute_cess(base_tax + surcharge_amount, rules);
    finish(
        regime,
        gain,
        Decimal::ZERO,
        taxable_amount,
        None,
        base_tax,
        surcharge.map(|s| (s.rate, s.amount)),
        cess,
        Some(lines),
    )
}

#[allow(clippy::too_many_arguments)]
fn finish(
    regime: TaxRegime,
    gain: Money,
    exemption: Money,
    taxable_amount: Money,
    flat_rate: Option<Rate>,
    base_tax: Money,
    surcharge: Option<(Rate, Money)>,
    cess: Money,
    slab_breakdown: Option<Vec<SlabTaxLine>>,
) -> TaxComputation {
    let surcharge_amount = surcharge.map_or(Decimal::ZERO, |(_, amount)| amount);
    let total_liability = base_tax + surcharge_amount + cess;
    let effective_rate = if gain > Decimal::ZERO {
        total_liability / gain
    } else {
        Decimal::ZERO
    };
    TaxComputation {
        regime,
        realized_gain: gain.max(Decimal::ZERO),
        exemption_consumed: exemption,
        taxable_amount,
        flat_rate,
        base_tax,
        surcharge: surcharge_amount,
        surcharge_rate: surcharge.map(|(rate, _)| rate),
        cess,
        total_liability,
        effective_rate,
        slab_breakdown,
        ancillary_registration_required: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetCategory, FrequencyTier, HoldingIntent, Jurisdiction};
    use crate::classification::{classify_holding_period, classify_income};
    use crate::indexation::compute_indexation;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn asset(category: AssetCategory, acquired: NaiveDate, disposed: NaiveDate, cost: Money, proceeds: Money) -> AssetInput {
        AssetInput {
            category,
            acquisition_date: acquired,
            acquisition_cost: cost,
            disposal_date: disposed,
            simulated_disposal_date: None,
            disposal_proceeds: proceeds,
            jurisdiction: Jurisdiction::Domestic,
            holding_intent: HoldingIntent::Investment,
            frequency_tier: FrequencyTier::Low,
            improvements: vec![],
            transfer_expenses: dec!(0),
        }
    }

    fn run(input: &AssetInput, rules: &TaxRulesConfig) -> CapGainsResult<TaxComputation> {
        let classification = classify_income(input, rules);
        let holding = classify_holding_period(input, rules);
        let indexation = compute_indexation(input, rules);
        compute_tax(input, &classification, &holding, indexation.as_ref(), rules)
    }

    #[test]
    fn test_equity_short_term_flat_rate() {
        let rules = TaxRulesConfig::fy_2024_25();
        let input = asset(AssetCategory::ListedEquity, date(2024, 1, 1), date(2024, 6, 1), dec!(100_000), dec!(150_000));
        let tax = run(&input, &rules).unwrap();
        assert_eq!(tax.regime, TaxRegime::EquityShortTermFlat);
        assert_eq!(tax.base_tax, dec!(10_000));
        assert_eq!(tax.cess, dec!(400));
        assert_eq!(tax.total_liability, dec!(10_400));
        assert!(tax.slab_breakdown.is_none());
    }

    #[test]
    fn test_equity_long_term_exemption_capped_at_gain() {
        let rules = TaxRulesConfig::fy_2024_25();
        let small = asset(AssetCategory::EquityFund, date(2022, 1, 1), date(2024, 6, 1), dec!(100_000), dec!(160_000));
        let tax = run(&small, &rules).unwrap();
        assert_eq!(tax.regime, TaxRegime::EquityLongTermFlat);
        assert_eq!(tax.exemption_consumed, dec!(60_000));
        assert_eq!(tax.taxable_amount, Decimal::ZERO);
        assert_eq!(tax.total_liability, Decimal::ZERO);

        let large = asset(AssetCategory::EquityFund, date(2022, 1, 1), date(2024, 6, 1), dec!(100_000), dec!(425_000));
        let tax = run(&large, &rules).unwrap();
        assert_eq!(tax.exemption_consumed, dec!(125_000));
        // (325,000 - 125,000) * 12.5% = 25,000 + 4% cess
        assert_eq!(tax.total_liability, dec!(26_000));
    }

    #[test]
    fn test_debt_fund_uses_slabs_even_when_long_term() {
        let rules = TaxRulesConfig::fy_2024_25();
        let input = asset(AssetCategory::DebtFund, date(2019, 1, 1), date(2024, 6, 1), dec!(500_000), dec!(1_600_000));
        let tax = run(&input, &rules).unwrap();
        assert_eq!(tax.regime, TaxRegime::DebtFundSlab);
        // Slab tax on a 1,100,000 gain
        assert_eq!(tax.base_tax, dec!(65_000));
        assert!(tax.slab_breakdown.is_some());
        assert_eq!(tax.surcharge, Decimal::ZERO);
    }

    #[test]
    fn test_non_equity_short_term_slab_with_surcharge() {
        let rules = TaxRulesConfig::fy_2024_25();
        let input = asset(AssetCategory::Commodity, date(2024, 1, 1), date(2024, 8, 1), dec!(1_000_000), dec!(7_000_000));
        let tax = run(&input, &rules).unwrap();
        assert_eq!(tax.regime, TaxRegime::NonEquityShortTermSlab);
        // Slab tax on 6,000,000 = 140,000 + 0.30 * 4,500,000 = 1,490,000
        assert_eq!(tax.base_tax, dec!(1_490_000));
        assert_eq!(tax.surcharge_rate, Some(dec!(0.10)));
        assert_eq!(tax.surcharge, dec!(149_000));
        assert_eq!(tax.cess, dec!(65_560));
        assert_eq!(tax.total_liability, dec!(1_704_560));
    }

    #[test]
    fn test_non_equity_long_term_uses_indexed_gain() {
        let rules = TaxRulesConfig::fy_2024_25();
        let input = asset(AssetCategory::PreciousMetal, date(2017, 8, 1), date(2024, 10, 1), dec!(272_000), dec!(600_000));
        let tax = run(&input, &rules).unwrap();
        assert_eq!(tax.regime, TaxRegime::NonEquityLongTermIndexed);
        assert_eq!(tax.realized_gain, dec!(237_000));
        assert_eq!(tax.total_liability, dec!(49_296));
    }

    #[test]
    fn test_digital_asset_long_term_is_unindexed() {
        let rules = TaxRulesConfig::fy_2024_25();
        let input = asset(AssetCategory::DigitalAsset, date(2020, 1, 1), date(2024, 6, 1), dec!(100_000), dec!(300_000));
        let tax = run(&input, &rules).unwrap();
        assert_eq!(tax.regime, TaxRegime::NonEquityLongTermUnindexed);
        assert_eq!(tax.total_liability, dec!(41_600));
    }

    #[test]
    fn test_business_income_flags_registration() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut input = asset(AssetCategory::ListedEquity, date(2024, 1, 1), date(2024, 2, 1), dec!(2_000_000), dec!(2_500_000));
        input.holding_intent = HoldingIntent::Trading;
        input.frequency_tier = FrequencyTier::High;
        let tax = run(&input, &rules).unwrap();
        assert_eq!(tax.regime, TaxRegime::BusinessIncomeSlab);
        assert!(tax.ancillary_registration_required);
        // Slab tax on 500,000 = 10,000
        assert_eq!(tax.base_tax, dec!(10_000));
    }

    #[test]
    fn test_loss_is_rejected() {
        let rules = TaxRulesConfig::fy_2024_25();
        let input = asset(AssetCategory::ListedEquity, date(2024, 1, 1), date(2024, 6, 1), dec!(100_000), dec!(90_000));
        assert!(matches!(
            run(&input, &rules),
            Err(CapGainsError::FinancialImpossibility(_))
        ));
    }
}
