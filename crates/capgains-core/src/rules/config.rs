use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;

use crate::error::CapGainsError;
use crate::rules::fiscal_year::FiscalYear;
use crate::types::{Money, Rate};
use crate::CapGainsResult;

/// Environment variable naming a JSON rules file.
pub const RULES_PATH_ENV: &str = "CAPGAINS_RULES_PATH";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One progressive income-tax bracket. `upper = None` marks the open-ended top bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabBracket {
    pub lower: Money,
    pub upper: Option<Money>,
    pub rate: Rate,
}

/// Surcharge applies to the pre-surcharge tax once taxable income reaches `floor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurchargeBand {
    pub floor: Money,
    pub rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRates {
    pub equity_short_term: Rate,
    pub equity_long_term: Rate,
    pub non_equity_long_term: Rate,
}

/// Holding periods (in whole months) up to and including which a holding is short-term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingThresholds {
    pub equity_like_months: u32,
    pub other_months: u32,
}

/// Heuristics deciding when a disposal is business income rather than a capital gain.
///
/// These thresholds are policy, not statute; they should be reviewed by a
/// domain expert before being relied on for filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessIncomePolicy {
    /// At the medium frequency tier a trading-intent disposal is business
    /// income only when held for fewer than this many days. `None` disables
    /// the tie-break, leaving medium-tier disposals as capital gains.
    pub medium_tier_max_holding_days: Option<i64>,
    /// Digital assets stay capital assets unless the frequency tier is high.
    pub digital_assets_require_high_frequency: bool,
}

/// Complete rule set for one fiscal year. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRulesConfig {
    pub fiscal_year: FiscalYear,
    /// Costs incurred before this year are indexed from its index value.
    pub base_fiscal_year: FiscalYear,
    pub cost_inflation_index: BTreeMap<FiscalYear, Decimal>,
    pub slabs: Vec<SlabBracket>,
    pub flat_rates: FlatRates,
    pub equity_ltcg_exemption: Money,
    pub surcharge_bands: Vec<SurchargeBand>,
    pub cess_rate: Rate,
    pub holding_thresholds: HoldingThresholds,
    pub business_policy: BusinessIncomePolicy,
    /// Aggregate turnover above which business-income sellers face
    /// indirect-tax registration.
    pub registration_turnover_threshold: Money,
    /// How far past the valuation date exit simulations may look for a
    /// long-term eligibility date.
    pub exit_lookahead_days: i64,
}

impl Default for TaxRulesConfig {
    fn default() -> Self {
        Self::fy_2024_25()
    }
}

impl std::str::FromStr for TaxRulesConfig {
    type Err = CapGainsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json_str(s)
    }
}

// ---------------------------------------------------------------------------
// Built-in rule sets
// ---------------------------------------------------------------------------

const COST_INFLATION_INDEX: [(i32, i64); 25] = [
    (2001, 100),
    (2002, 105),
    (2003, 109),
    (2004, 113),
    (2005, 117),
    (2006, 122),
    (2007, 129),
    (2008, 137),
    (2009, 148),
    (2010, 167),
    (2011, 184),
    (2012, 200),
    (2013, 220),
    (2014, 240),
    (2015, 254),
    (2016, 264),
    (2017, 272),
    (2018, 280),
    (2019, 289),
    (2020, 301),
    (2021, 317),
    (2022, 331),
    (2023, 348),
    (2024, 363),
    (2025, 376),
];

impl TaxRulesConfig {
    /// Rule set published for fiscal year 2024-25.
    pub fn fy_2024_25() -> Self {
        let cost_inflation_index = COST_INFLATION_INDEX
            .iter()
            .map(|&(year, index)| (FiscalYear::starting(year), Decimal::from(index)))
            .collect();

        TaxRulesConfig {
            fiscal_year: FiscalYear::starting(2024),
            base_fiscal_year: FiscalYear::starting(2001),
            cost_inflation_index,
            slabs: vec![
                slab(dec!(0), Some(dec!(300_000)), dec!(0)),
                slab(dec!(300_000), Some(dec!(700_000)), dec!(0.05)),
                slab(dec!(700_000), Some(dec!(1_000_000)), dec!(0.10)),
                slab(dec!(1_000_000), Some(dec!(1_200_000)), dec!(0.15)),
                slab(dec!(1_200_000), Some(dec!(1_500_000)), dec!(0.20)),
                slab(dec!(1_500_000), None, dec!(0.30)),
            ],
            flat_rates: FlatRates {
                equity_short_term: dec!(0.20),
                equity_long_term: dec!(0.125),
                non_equity_long_term: dec!(0.20),
            },
            equity_ltcg_exemption: dec!(125_000),
            surcharge_bands: vec![
                SurchargeBand { floor: dec!(5_000_000), rate: dec!(0.10) },
                SurchargeBand { floor: dec!(10_000_000), rate: dec!(0.15) },
                SurchargeBand { floor: dec!(20_000_000), rate: dec!(0.25) },
                SurchargeBand { floor: dec!(50_000_000), rate: dec!(0.37) },
            ],
            cess_rate: dec!(0.04),
            holding_thresholds: HoldingThresholds {
                equity_like_months: 12,
                other_months: 24,
            },
            business_policy: BusinessIncomePolicy {
                medium_tier_max_holding_days: Some(90),
                digital_assets_require_high_frequency: true,
            },
            registration_turnover_threshold: dec!(2_000_000),
            exit_lookahead_days: 365,
        }
    }
}

fn slab(lower: Money, upper: Option<Money>, rate: Rate) -> SlabBracket {
    SlabBracket { lower, upper, rate }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

impl TaxRulesConfig {
    /// Published cost-inflation index for `fiscal_year`, if any.
    pub fn index_for(&self, fiscal_year: FiscalYear) -> Option<Decimal> {
        self.cost_inflation_index.get(&fiscal_year).copied()
    }

    /// Index used as the source of an indexation ratio. Costs incurred before
    /// the base year are floored to the base year's index.
    pub fn source_index_for(&self, fiscal_year: FiscalYear) -> (FiscalYear, Option<Decimal>) {
        let effective = fiscal_year.max(self.base_fiscal_year);
        (effective, self.index_for(effective))
    }

    /// Highest surcharge band whose floor `taxable` meets or exceeds.
    pub fn surcharge_band_for(&self, taxable: Money) -> Option<&SurchargeBand> {
        self.surcharge_bands
            .iter()
            .rev()
            .find(|band| taxable >= band.floor)
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl TaxRulesConfig {
    pub fn from_json_str(json: &str) -> CapGainsResult<Self> {
        let config: TaxRulesConfig = serde_json::from_str(json).map_err(|e| {
            CapGainsError::RulesConfiguration(format!("Failed to parse rules JSON: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a rule set from a JSON file.
    pub fn try_from_json(path: &str) -> CapGainsResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CapGainsError::RulesConfiguration(format!("Failed to read rules file '{path}': {e}"))
        })?;
        Self::from_json_str(&content)
    }

    /// Load the rule set named by `CAPGAINS_RULES_PATH`.
    pub fn from_env() -> CapGainsResult<Self> {
        let path = env::var(RULES_PATH_ENV).map_err(|_| {
            CapGainsError::RulesConfiguration(format!("{RULES_PATH_ENV} env var not set"))
        })?;
        Self::try_from_json(&path)
    }

    /// Checks structural invariants: contiguous slabs, ascending surcharge
    /// bands, rates within [0, 1] and a usable base-year index.
    pub fn validate(&self) -> CapGainsResult<()> {
        self.validate_slabs()?;
        self.validate_surcharge_bands()?;

        let rates = [
            ("flat_rates.equity_short_term", self.flat_rates.equity_short_term),
            ("flat_rates.equity_long_term", self.flat_rates.equity_long_term),
            ("flat_rates.non_equity_long_term", self.flat_rates.non_equity_long_term),
            ("cess_rate", self.cess_rate),
        ];
        for (name, rate) in rates {
            check_rate(name, rate)?;
        }

        if self.equity_ltcg_exemption < Decimal::ZERO {
            return Err(config_error("equity_ltcg_exemption cannot be negative"));
        }
        if self.registration_turnover_threshold < Decimal::ZERO {
            return Err(config_error("registration_turnover_threshold cannot be negative"));
        }
        if self.exit_lookahead_days < 0 {
            return Err(config_error("exit_lookahead_days cannot be negative"));
        }
        if let Some((fy, _)) = self
            .cost_inflation_index
            .iter()
            .find(|(_, index)| **index <= Decimal::ZERO)
        {
            return Err(config_error(&format!(
                "cost inflation index for {fy} must be positive"
            )));
        }
        if self.index_for(self.base_fiscal_year).is_none() {
            return Err(config_error(&format!(
                "base fiscal year {} has no cost inflation index",
                self.base_fiscal_year
            )));
        }
        Ok(())
    }

    fn validate_slabs(&self) -> CapGainsResult<()> {
        let Some(first) = self.slabs.first() else {
            return Err(config_error("at least one slab bracket is required"));
        };
        if first.lower != Decimal::ZERO {
            return Err(config_error("first slab bracket must start at zero"));
        }

        for (i, bracket) in self.slabs.iter().enumerate() {
            check_rate(&format!("slabs[{i}].rate"), bracket.rate)?;
            let is_last = i + 1 == self.slabs.len();
            match bracket.upper {
                Some(upper) => {
                    if upper <= bracket.lower {
                        return Err(config_error(&format!(
                            "slabs[{i}] upper bound must exceed its lower bound"
                        )));
                    }
                    if let Some(next) = self.slabs.get(i + 1) {
                        if next.lower != upper {
                            return Err(config_error(&format!(
                                "slabs[{}] must start where slabs[{i}] ends",
                                i + 1
                            )));
                        }
                    }
                }
                None if !is_last => {
                    return Err(config_error(&format!(
                        "slabs[{i}] is open-ended but is not the last bracket"
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }

    fn validate_surcharge_bands(&self) -> CapGainsResult<()> {
        for (i, band) in self.surcharge_bands.iter().enumerate() {
            check_rate(&format!("surcharge_bands[{i}].rate"), band.rate)?;
            if band.floor < Decimal::ZERO {
                return Err(config_error(&format!(
                    "surcharge_bands[{i}].floor cannot be negative"
                )));
            }
        }
        let ascending = self
            .surcharge_bands
            .windows(2)
            .all(|pair| pair[0].floor < pair[1].floor);
        if !ascending {
            return Err(config_error(
                "surcharge bands must be sorted ascending by floor",
            ));
        }
        Ok(())
    }
}

fn check_rate(name: &str, rate: Rate) -> CapGainsResult<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(config_error(&format!("{name} must be between 0 and 1")));
    }
    Ok(())
}

fn config_error(reason: &str) -> CapGainsError {
    CapGainsError::RulesConfiguration(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_are_valid() {
        let rules = TaxRulesConfig::fy_2024_25();
        rules.validate().unwrap();
        assert_eq!(rules.fiscal_year.to_string(), "2024-25");
        assert_eq!(rules.index_for(FiscalYear::starting(2024)), Some(dec!(363)));
    }

    #[test]
    fn test_pre_base_year_floors_to_base_index() {
        let rules = TaxRulesConfig::fy_2024_25();
        let (effective, index) = rules.source_index_for(FiscalYear::starting(1995));
        assert_eq!(effective, FiscalYear::starting(2001));
        assert_eq!(index, Some(dec!(100)));
    }

    #[test]
    fn test_surcharge_band_picks_highest_floor_met() {
        let rules = TaxRulesConfig::fy_2024_25();
        assert!(rules.surcharge_band_for(dec!(4_999_999)).is_none());
        assert_eq!(rules.surcharge_band_for(dec!(5_000_000)).unwrap().rate, dec!(0.10));
        assert_eq!(rules.surcharge_band_for(dec!(30_000_000)).unwrap().rate, dec!(0.25));
    }

    #[test]
    fn test_gap_between_slabs_rejected() {
        let mut rules = TaxRulesConfig::fy_2024_25();
        rules.slabs[1].lower = dec!(350_000);
        assert!(matches!(
            rules.validate(),
            Err(CapGainsError::RulesConfiguration(_))
        ));
    }

    #[test]
    fn test_open_ended_slab_must_be_last() {
        let mut rules = TaxRulesConfig::fy_2024_25();
        rules.slabs[2].upper = None;
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_unsorted_surcharge_bands_rejected() {
        let mut rules = TaxRulesConfig::fy_2024_25();
        rules.surcharge_bands.swap(0, 1);
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_rules_json_round_trip() {
        let rules = TaxRulesConfig::fy_2024_25();
        let json = serde_json::to_string(&rules).unwrap();
        assert!(json.contains("\"2001-02\""));
        let parsed: TaxRulesConfig = json.parse().unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_from_env_without_variable_is_configuration_error() {
        if env::var(RULES_PATH_ENV).is_ok() {
            return;
        }
        assert!(matches!(
            TaxRulesConfig::from_env(),
            Err(CapGainsError::RulesConfiguration(_))
        ));
    }
}
