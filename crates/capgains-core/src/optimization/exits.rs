use std::collections::BTreeMap;

use chrono::{Duration, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::classification::{long_term_eligible_from, threshold_months_for, GainType};
use crate::rules::TaxRulesConfig;
use crate::sip::fifo::LotBook;
use crate::sip::lots::{SipInput, SipLot};
use crate::sip::tax::compute_redemption_tax;
use crate::time_value::annualized_return;
use crate::types::{Money, Rate, Units};
use crate::CapGainsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitCandidate {
    pub date: NaiveDate,
    pub label: String,
}

/// Outcome of redeeming at one candidate date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSimulation {
    pub exit_date: NaiveDate,
    pub label: String,
    /// Holding period of the oldest redeemed lot.
    pub holding_days: i64,
    pub holding_months: u32,
    /// Share of redeemed units that are long-term.
    pub long_term_fraction: Rate,
    pub exit_price: Money,
    pub units_redeemed: Units,
    pub invested_amount: Money,
    pub market_value: Money,
    pub gain: Money,
    pub tax_liability: Money,
    pub post_tax_value: Money,
    pub pre_tax_annualized_return: Rate,
    pub post_tax_annualized_return: Rate,
    /// Relative shortfall of the post-tax return against the pre-tax return.
    pub tax_drag: Rate,
    pub is_optimal: bool,
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

const OFFSETS_MONTHS: [(i32, &str); 4] = [
    (-6, "intended - 6 months"),
    (-3, "intended - 3 months"),
    (3, "intended + 3 months"),
    (6, "intended + 6 months"),
];

/// Candidate exit dates in ascending order, deduplicated.
///
/// Offsets around the intended exit are clipped to the investment start. The
/// oldest lot's long-term eligibility date is included only when it lies
/// between the valuation date and the end of the look-ahead window.
pub fn candidate_exit_dates(
    input: &SipInput,
    lots: &[SipLot],
    rules: &TaxRulesConfig,
) -> Vec<ExitCandidate> {
    let mut dates: BTreeMap<NaiveDate, String> = BTreeMap::new();
    let intended = input.intended_exit_date;

    dates.entry(intended).or_insert_with(|| "intended exit".into());
    dates
        .entry(input.valuation_date)
        .or_insert_with(|| "exit today".into());

    for (offset, label) in OFFSETS_MONTHS {
        let months = Months::new(offset.unsigned_abs());
        let shifted = if offset < 0 {
            intended.checked_sub_months(months)
        } else {
            intended.checked_add_months(months)
        };
        if let Some(date) = shifted {
            dates
                .entry(date.max(input.start_date))
                .or_insert_with(|| label.to_string());
        }
    }

    if let Some(oldest) = lots.iter().map(|l| l.contribution_date).min() {
        let threshold = threshold_months_for(input.category, rules);
        let horizon = input.valuation_date + Duration::days(rules.exit_lookahead_days);
        if let Some(eligible) = long_term_eligible_from(oldest, threshold) {
            if eligible >= input.valuation_date && eligible <= horizon {
                dates
                    .entry(eligible)
                    .or_insert_with(|| "oldest lot turns long-term".into());
            }
        }
    }

    dates
        .into_iter()
        .map(|(date, label)| ExitCandidate { date, label })
        .collect()
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Redeem at every candidate date and mark the highest post-tax value.
///
/// Every candidate redeems from a fresh [`LotBook`], so simulations are
/// independent of each other and of their order. Candidates at which no lot
/// has yet been contributed are skipped.
pub fn simulate_exits(
    input: &SipInput,
    lots: &[SipLot],
    rules: &TaxRulesConfig,
) -> CapGainsResult<Vec<ExitSimulation>> {
    let mut simulations: Vec<ExitSimulation> = Vec::new();

    for candidate in candidate_exit_dates(input, lots, rules) {
        let exit_price = if candidate.date == input.intended_exit_date {
            input.intended_exit_price()?
        } else {
            input.price_at(candidate.date)?
        };

        let mut book = LotBook::new(lots.to_vec());
        let outcome = book.redeem(
            &input.redemption,
            candidate.date,
            exit_price,
            input.category,
            rules,
        )?;
        let Some(oldest) = outcome.lots.first() else {
            tracing::debug!(date = %candidate.date, "no units available; candidate skipped");
            continue;
        };

        let invested_amount: Money = outcome.lots.iter().map(|l| l.invested_amount).sum();
        let market_value: Money = outcome.lots.iter().map(|l| l.proceeds).sum();
        let long_term_units: Units = outcome
            .lots
            .iter()
            .filter(|l| l.gain_type == GainType::LongTerm)
            .map(|l| l.units_redeemed)
            .sum();
        let long_term_fraction = if outcome.redeemed_units > Decimal::ZERO {
            long_term_units / outcome.redeemed_units
        } else {
            Decimal::ZERO
        };

        let tax = compute_redemption_tax(&outcome.lots, input.category, rules);
        let post_tax_value = market_value - tax.total_tax;

        let contributions: Vec<(NaiveDate, Money)> = outcome
            .lots
            .iter()
            .map(|l| (l.contribution_date, l.invested_amount))
            .collect();
        let pre_tax_annualized_return =
            annualized_return(&contributions, candidate.date, market_value).unwrap_or(Decimal::ZERO);
        let post_tax_annualized_return =
            annualized_return(&contributions, candidate.date, post_tax_value).unwrap_or(Decimal::ZERO);
        let tax_drag = if pre_tax_annualized_return > Decimal::ZERO {
            (pre_tax_annualized_return - post_tax_annualized_return) / pre_tax_annualized_return
        } else {
            Decimal::ZERO
        };

        simulations.push(ExitSimulation {
            exit_date: candidate.date,
            label: candidate.label,
            holding_days: oldest.holding_days,
            holding_months: oldest.holding_months,
            long_term_fraction,
            exit_price,
            units_redeemed: outcome.redeemed_units,
            invested_amount,
            market_value,
            gain: market_value - invested_amount,
            tax_liability: tax.total_tax,
            post_tax_value,
            pre_tax_annualized_return,
            post_tax_annualized_return,
            tax_drag,
            is_optimal: false,
        });
    }

    mark_optimal(&mut simulations);
    Ok(simulations)
}

/// Flag the first simulation with the highest post-tax value.
fn mark_optimal(simulations: &mut [ExitSimulation]) {
    let mut best: Option<usize> = None;
    for (i, sim) in simulations.iter().enumerate() {
        match best {
            Some(b) if simulations[b].post_tax_value >= sim.post_tax_value => {}
            _ => best = Some(i),
        }
    }
    if let Some(i) = best {
        simulations[i].is_optimal = true;
        tracing::debug!(date = %simulations[i].exit_date, "optimal exit selected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetCategory;
    use crate::sip::lots::{build_lots, ContributionFrequency, InvestmentMode, PriceSource, RedemptionRequest};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sip() -> SipInput {
        SipInput {
            category: AssetCategory::EquityFund,
            mode: InvestmentMode::Periodic,
            start_date: date(2024, 1, 1),
            contribution: dec!(10_000),
            frequency: ContributionFrequency::Monthly,
            installments: 12,
            price_source: PriceSource::Growth {
                initial_price: dec!(100),
                annual_growth_rate: dec!(0.15),
            },
            intended_exit_date: date(2024, 12, 15),
            valuation_date: date(2024, 12, 15),
            redemption: RedemptionRequest::Full,
            exit_price: None,
        }
    }

    #[test]
    fn test_candidates_include_offsets_and_eligibility() {
        let rules = TaxRulesConfig::fy_2024_25();
        let input = sip();
        let lots = build_lots(&input).unwrap();
        let dates: Vec<NaiveDate> = candidate_exit_dates(&input, &lots, &rules)
            .into_iter()
            .map(|c| c.date)
            .collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 6, 15),
                date(2024, 9, 15),
                date(2024, 12, 15),
                date(2025, 2, 1),
                date(2025, 3, 15),
                date(2025, 6, 15),
            ]
        );
    }

    #[test]
    fn test_offsets_clipped_to_start() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut input = sip();
        input.intended_exit_date = date(2024, 3, 1);
        input.valuation_date = date(2024, 3, 1);
        let lots = build_lots(&input).unwrap();
        let candidates = candidate_exit_dates(&input, &lots, &rules);
        assert!(candidates.iter().all(|c| c.date >= input.start_date));
        assert_eq!(candidates[0].date, input.start_date);
    }

    #[test]
    fn test_exactly_one_optimal_with_highest_post_tax_value() {
        let rules = TaxRulesConfig::fy_2024_25();
        let input = sip();
        let lots = build_lots(&input).unwrap();
        let sims = simulate_exits(&input, &lots, &rules).unwrap();
        assert!(!sims.is_empty());
        let optimal: Vec<&ExitSimulation> = sims.iter().filter(|s| s.is_optimal).collect();
        assert_eq!(optimal.len(), 1);
        assert!(sims.iter().all(|s| s.post_tax_value <= optimal[0].post_tax_value));
    }

    #[test]
    fn test_simulation_metrics_are_consistent() {
        let rules = TaxRulesConfig::fy_2024_25();
        let input = sip();
        let lots = build_lots(&input).unwrap();
        for sim in simulate_exits(&input, &lots, &rules).unwrap() {
            assert_eq!(sim.gain, sim.market_value - sim.invested_amount);
            assert_eq!(sim.post_tax_value, sim.market_value - sim.tax_liability);
            assert!(sim.tax_liability >= Decimal::ZERO);
            assert!(sim.long_term_fraction >= Decimal::ZERO && sim.long_term_fraction <= Decimal::ONE);
        }
    }

    #[test]
    fn test_ties_mark_the_earliest() {
        let mut sims = vec![
            sample(date(2024, 1, 1), dec!(100)),
            sample(date(2024, 2, 1), dec!(120)),
            sample(date(2024, 3, 1), dec!(120)),
        ];
        mark_optimal(&mut sims);
        assert!(!sims[0].is_optimal);
        assert!(sims[1].is_optimal);
        assert!(!sims[2].is_optimal);
    }

    fn sample(exit_date: NaiveDate, post_tax_value: Money) -> ExitSimulation {
        ExitSimulation {
            exit_date,
            label: String::new(),
            holding_days: 0,
            holding_months: 0,
            long_term_fraction: Decimal::ZERO,
            exit_price: Decimal::ONE,
            units_redeemed: Decimal::ONE,
            invested_amount: Decimal::ZERO,
            market_value: post_tax_value,
            gain: post_tax_value,
            tax_liability: Decimal::ZERO,
            post_tax_value,
            pre_tax_annualized_return: Decimal::ZERO,
            post_tax_annualized_return: Decimal::ZERO,
            tax_drag: Decimal::ZERO,
            is_optimal: false,
        }
    }
}
