use serde::{Deserialize, Serialize};

use crate::asset::{AssetCategory, AssetInput, FrequencyTier, HoldingIntent};
use crate::classification::holding::{classify_holding_period, HoldingPeriodDetail};
use crate::rules::TaxRulesConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeType {
    CapitalGain,
    BusinessIncome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainType {
    ShortTerm,
    LongTerm,
    Business,
}

/// One factor weighed during classification, in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionFactor {
    pub rank: u8,
    pub factor: String,
    pub observed: String,
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub income_type: IncomeType,
    pub gain_type: GainType,
    pub factors: Vec<DecisionFactor>,
    pub rationale: String,
}

impl Classification {
    pub fn is_business_income(&self) -> bool {
        self.income_type == IncomeType::BusinessIncome
    }
}

/// Classify a disposal as capital gain or business income.
///
/// Factors are evaluated in a fixed order (intent, frequency, category,
/// holding period) and every one of them is recorded, whether or not it
/// decided the outcome.
pub fn classify_income(input: &AssetInput, rules: &TaxRulesConfig) -> Classification {
    let holding = classify_holding_period(input, rules);
    let policy = &rules.business_policy;
    let mut factors: Vec<DecisionFactor> = Vec::with_capacity(4);

    // 1. Holding intent
    let trading = input.holding_intent == HoldingIntent::Trading;
    factors.push(factor(
        1,
        "Holding intent",
        match input.holding_intent {
            HoldingIntent::Investment => "investment",
            HoldingIntent::Trading => "trading",
        },
        if trading {
            "Held as stock-in-trade; points to business income"
        } else {
            "Held as an investment; points to a capital asset"
        },
    ));

    // 2. Transaction frequency
    factors.push(factor(
        2,
        "Transaction frequency",
        match input.frequency_tier {
            FrequencyTier::Low => "low",
            FrequencyTier::Medium => "medium",
            FrequencyTier::High => "high",
        },
        match input.frequency_tier {
            FrequencyTier::Low => "Occasional transactions support capital treatment",
            FrequencyTier::Medium => "Moderate activity; not conclusive on its own",
            FrequencyTier::High => "Frequent, systematic transactions indicate a trading business",
        },
    ));

    // 3. Category-specific note
    let digital_needs_high = input.category.is_digital() && policy.digital_assets_require_high_frequency;
    factors.push(factor(
        3,
        "Asset category",
        input.category.display_name(),
        category_note(input.category, digital_needs_high),
    ));

    // 4. Holding period (and the medium-tier tie-break)
    let short_holding = policy
        .medium_tier_max_holding_days
        .is_some_and(|max_days| holding.holding_days < max_days);

    let business = trading
        && match input.frequency_tier {
            FrequencyTier::High => true,
            FrequencyTier::Medium => !digital_needs_high && short_holding,
            FrequencyTier::Low => false,
        };

    factors.push(factor(
        4,
        "Holding period",
        &format!(
            "{} days ({} whole months) against a {}-month threshold",
            holding.holding_days, holding.holding_months, holding.threshold_months
        ),
        &holding_outcome(&holding, input.frequency_tier, trading, short_holding, policy.medium_tier_max_holding_days),
    ));

    let (income_type, gain_type) = if business {
        (IncomeType::BusinessIncome, GainType::Business)
    } else if holding.is_long_term {
        (IncomeType::CapitalGain, GainType::LongTerm)
    } else {
        (IncomeType::CapitalGain, GainType::ShortTerm)
    };

    let conclusion = match gain_type {
        GainType::Business => "business income taxed at slab rates",
        GainType::LongTerm => "long-term capital gain",
        GainType::ShortTerm => "short-term capital gain",
    };
    let rationale = format!(
        "{}. Conclusion: {}.",
        factors
            .iter()
            .map(|f| format!("{}. {}: {} ({})", f.rank, f.factor, f.observed, f.outcome))
            .collect::<Vec<_>>()
            .join("; "),
        conclusion
    );

    tracing::debug!(
        category = ?input.category,
        ?income_type,
        ?gain_type,
        holding_days = holding.holding_days,
        "income classified"
    );

    Classification {
        income_type,
        gain_type,
        factors,
        rationale,
    }
}

fn factor(rank: u8, name: &str, observed: &str, outcome: &str) -> DecisionFactor {
    DecisionFactor {
        rank,
        factor: name.to_string(),
        observed: observed.to_string(),
        outcome: outcome.to_string(),
    }
}

fn category_note(category: AssetCategory, digital_needs_high: bool) -> &'static str {
    match category {
        AssetCategory::DigitalAsset if digital_needs_high => {
            "Digital assets stay capital assets even when traded often, unless trading signals are strong"
        }
        AssetCategory::DigitalAsset => "Digital assets follow the general trading tests",
        AssetCategory::ListedEquity | AssetCategory::EquityFund => {
            "Equity-oriented; flat STCG/LTCG rates apply when held as a capital asset"
        }
        AssetCategory::DebtFund => "Debt fund; gains are taxed at slab rates whatever the holding period",
        AssetCategory::PreciousMetal
        | AssetCategory::Commodity
        | AssetCategory::RealProperty
        | AssetCategory::ForeignEquity
        | AssetCategory::ForeignProperty => {
            "Non-equity capital asset; long-term gains are eligible for cost indexation"
        }
    }
}

fn holding_outcome(
    holding: &HoldingPeriodDetail,
    tier: FrequencyTier,
    trading: bool,
    short_holding: bool,
    max_days: Option<i64>,
) -> String {
    let term = if holding.is_long_term {
        "long-term"
    } else {
        "short-term"
    };
    match (trading, tier, max_days) {
        (true, FrequencyTier::Medium, Some(days)) if short_holding => format!(
            "{term}; held under {days} days at medium frequency reinforces business treatment"
        ),
        (true, FrequencyTier::Medium, Some(days)) => format!(
            "{term}; held at least {days} days so medium frequency does not make it business income"
        ),
        _ => format!("{term} under the applicable threshold"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Jurisdiction;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(
        category: AssetCategory,
        intent: HoldingIntent,
        tier: FrequencyTier,
        held_days: i64,
    ) -> AssetInput {
        let acquired = date(2023, 1, 1);
        AssetInput {
            category,
            acquisition_date: acquired,
            acquisition_cost: dec!(100_000),
            disposal_date: acquired + chrono::Duration::days(held_days),
            simulated_disposal_date: None,
            disposal_proceeds: dec!(150_000),
            jurisdiction: Jurisdiction::Domestic,
            holding_intent: intent,
            frequency_tier: tier,
            improvements: vec![],
            transfer_expenses: dec!(0),
        }
    }

    #[test]
    fn test_investment_intent_is_always_capital() {
        let rules = TaxRulesConfig::fy_2024_25();
        let c = classify_income(
            &input(AssetCategory::ListedEquity, HoldingIntent::Investment, FrequencyTier::High, 30),
            &rules,
        );
        assert_eq!(c.income_type, IncomeType::CapitalGain);
        assert_eq!(c.gain_type, GainType::ShortTerm);
    }

    #[test]
    fn test_trading_at_high_frequency_is_business() {
        let rules = TaxRulesConfig::fy_2024_25();
        let c = classify_income(
            &input(AssetCategory::ListedEquity, HoldingIntent::Trading, FrequencyTier::High, 500),
            &rules,
        );
        assert!(c.is_business_income());
        assert_eq!(c.gain_type, GainType::Business);
    }

    #[test]
    fn test_medium_tier_tie_break_on_short_holding() {
        let rules = TaxRulesConfig::fy_2024_25();
        let quick = classify_income(
            &input(AssetCategory::Commodity, HoldingIntent::Trading, FrequencyTier::Medium, 45),
            &rules,
        );
        assert!(quick.is_business_income());

        let patient = classify_income(
            &input(AssetCategory::Commodity, HoldingIntent::Trading, FrequencyTier::Medium, 120),
            &rules,
        );
        assert_eq!(patient.income_type, IncomeType::CapitalGain);
    }

    #[test]
    fn test_tie_break_can_be_disabled() {
        let mut rules = TaxRulesConfig::fy_2024_25();
        rules.business_policy.medium_tier_max_holding_days = None;
        let c = classify_income(
            &input(AssetCategory::Commodity, HoldingIntent::Trading, FrequencyTier::Medium, 10),
            &rules,
        );
        assert_eq!(c.income_type, IncomeType::CapitalGain);
    }

    #[test]
    fn test_digital_asset_stays_capital_at_medium_frequency() {
        let rules = TaxRulesConfig::fy_2024_25();
        let c = classify_income(
            &input(AssetCategory::DigitalAsset, HoldingIntent::Trading, FrequencyTier::Medium, 20),
            &rules,
        );
        assert_eq!(c.income_type, IncomeType::CapitalGain);

        let high = classify_income(
            &input(AssetCategory::DigitalAsset, HoldingIntent::Trading, FrequencyTier::High, 20),
            &rules,
        );
        assert!(high.is_business_income());
    }

    #[test]
    fn test_rationale_lists_every_factor_in_order() {
        let rules = TaxRulesConfig::fy_2024_25();
        let c = classify_income(
            &input(AssetCategory::RealProperty, HoldingIntent::Investment, FrequencyTier::Low, 900),
            &rules,
        );
        assert_eq!(c.factors.len(), 4);
        let ranks: Vec<u8> = c.factors.iter().map(|f| f.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);

        let positions: Vec<usize> = ["Holding intent", "Transaction frequency", "Asset category", "Holding period"]
            .iter()
            .map(|name| c.rationale.find(name).expect("factor missing from rationale"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(c.rationale.ends_with("Conclusion: long-term capital gain."));
    }
}
