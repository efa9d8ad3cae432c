use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::asset::AssetCategory;
use crate::classification::classify_holding;
use crate::error::CapGainsError;
use crate::rules::TaxRulesConfig;
use crate::time_value::years_between;
use crate::types::{Money, Rate, Units};
use crate::CapGainsResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentMode {
    LumpSum,
    Periodic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionFrequency {
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

impl ContributionFrequency {
    pub fn months(&self) -> u32 {
        match self {
            ContributionFrequency::Monthly => 1,
            ContributionFrequency::Quarterly => 3,
            ContributionFrequency::Annual => 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Money,
}

/// Where unit prices come from: a supplied series, or extrapolation from a
/// starting price at a constant annual growth rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSource {
    History { points: Vec<PricePoint> },
    Growth { initial_price: Money, annual_growth_rate: Rate },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RedemptionRequest {
    #[default]
    Full,
    Amount { amount: Money },
    Units { units: Units },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipInput {
    pub category: AssetCategory,
    pub mode: InvestmentMode,
    pub start_date: NaiveDate,
    /// Per-installment amount, or the whole amount for a lump sum.
    pub contribution: Money,
    #[serde(default)]
    pub frequency: ContributionFrequency,
    /// Number of installments; ignored for a lump sum.
    #[serde(default = "default_installments")]
    pub installments: u32,
    pub price_source: PriceSource,
    pub intended_exit_date: NaiveDate,
    /// "Today" for the purposes of valuation and exit simulation.
    pub valuation_date: NaiveDate,
    #[serde(default)]
    pub redemption: RedemptionRequest,
    /// Unit price at the intended exit, overriding the price source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<Money>,
}

fn default_installments() -> u32 {
    1
}

impl SipInput {
    pub fn validate(&self) -> CapGainsResult<()> {
        if self.contribution <= Decimal::ZERO {
            return Err(invalid("contribution", "Contribution must be positive"));
        }
        if self.mode == InvestmentMode::Periodic && self.installments == 0 {
            return Err(invalid("installments", "At least one installment is required"));
        }
        if self.intended_exit_date < self.start_date {
            return Err(invalid(
                "intended_exit_date",
                "Exit date cannot precede the investment start",
            ));
        }
        if self.valuation_date < self.start_date {
            return Err(invalid(
                "valuation_date",
                "Valuation date cannot precede the investment start",
            ));
        }
        if let Some(price) = self.exit_price {
            if price <= Decimal::ZERO {
                return Err(invalid("exit_price", "Exit price must be positive"));
            }
        }
        match &self.price_source {
            PriceSource::History { points } => {
                if points.is_empty() {
                    return Err(invalid("price_source.points", "Price history is empty"));
                }
                if points.iter().any(|p| p.price <= Decimal::ZERO) {
                    return Err(invalid(
                        "price_source.points",
                        "Historical prices must be positive",
                    ));
                }
            }
            PriceSource::Growth {
                initial_price,
                annual_growth_rate,
            } => {
                if *initial_price <= Decimal::ZERO {
                    return Err(invalid(
                        "price_source.initial_price",
                        "Initial price must be positive",
                    ));
                }
                if *annual_growth_rate <= -Decimal::ONE {
                    return Err(invalid(
                        "price_source.annual_growth_rate",
                        "Growth rate must be greater than -100%",
                    ));
                }
            }
        }
        match &self.redemption {
            RedemptionRequest::Full => {}
            RedemptionRequest::Amount { amount } if *amount <= Decimal::ZERO => {
                return Err(invalid("redemption.amount", "Redemption amount must be positive"));
            }
            RedemptionRequest::Units { units } if *units <= Decimal::ZERO => {
                return Err(invalid("redemption.units", "Redemption units must be positive"));
            }
            RedemptionRequest::Amount { .. } | RedemptionRequest::Units { .. } => {}
        }
        Ok(())
    }

    /// Contribution dates at the configured cadence.
    pub fn contribution_dates(&self) -> CapGainsResult<Vec<NaiveDate>> {
        let count = match self.mode {
            InvestmentMode::LumpSum => 1,
            InvestmentMode::Periodic => self.installments,
        };
        let step = self.frequency.months();
        (0..count)
            .map(|k| {
                self.start_date
                    .checked_add_months(Months::new(k * step))
                    .ok_or_else(|| {
                        CapGainsError::DateError(format!("Installment {} is out of range", k + 1))
                    })
            })
            .collect()
    }

    /// Unit price on `date`: the most recent point at or before it, or the
    /// growth-extrapolated price.
    pub fn price_at(&self, date: NaiveDate) -> CapGainsResult<Money> {
        match &self.price_source {
            PriceSource::History { points } => points
                .iter()
                .filter(|p| p.date <= date)
                .max_by_key(|p| p.date)
                .map(|p| p.price)
                .ok_or_else(|| {
                    CapGainsError::InsufficientData(format!("No price on or before {date}"))
                }),
            PriceSource::Growth {
                initial_price,
                annual_growth_rate,
            } => {
                let years = years_between(self.start_date, date);
                (Decimal::ONE + *annual_growth_rate)
                    .checked_powd(years)
                    .and_then(|growth| initial_price.checked_mul(growth))
                    .ok_or_else(|| {
                        invalid(
                            "annual_growth_rate",
                            "Compounded price on the requested date exceeds the representable range",
                        )
                    })
            }
        }
    }

    /// Price used for the redemption at the intended exit.
    pub fn intended_exit_price(&self) -> CapGainsResult<Money> {
        match self.exit_price {
            Some(price) => Ok(price),
            None => self.price_at(self.intended_exit_date),
        }
    }
}

fn invalid(field: &str, reason: &str) -> CapGainsError {
    CapGainsError::invalid_input(field, reason)
}

// ---------------------------------------------------------------------------
// Lots
// ---------------------------------------------------------------------------

/// One contribution. Created once and never modified; redemptions track
/// consumption separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SipLot {
    pub lot_id: u32,
    pub contribution_date: NaiveDate,
    pub invested_amount: Money,
    pub unit_price: Money,
    pub units: Units,
}

/// A lot valued on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotSnapshot {
    #[serde(flatten)]
    pub lot: SipLot,
    pub as_of: NaiveDate,
    pub current_price: Money,
    pub current_value: Money,
    pub unrealized_gain: Money,
    pub holding_days: i64,
    pub holding_months: u32,
    pub is_short_term: bool,
    pub is_long_term: bool,
}

pub fn build_lots(input: &SipInput) -> CapGainsResult<Vec<SipLot>> {
    input.validate()?;
    input
        .contribution_dates()?
        .into_iter()
        .enumerate()
        .map(|(i, contribution_date)| {
            let unit_price = input.price_at(contribution_date)?;
            Ok(SipLot {
                lot_id: i as u32 + 1,
                contribution_date,
                invested_amount: input.contribution,
                unit_price,
                units: input.contribution / unit_price,
            })
        })
        .collect()
}

/// Value every lot contributed on or before `as_of` at `price`.
pub fn snapshot_lots(
    lots: &[SipLot],
    category: AssetCategory,
    as_of: NaiveDate,
    price: Money,
    rules: &TaxRulesConfig,
) -> Vec<LotSnapshot> {
    lots.iter()
        .filter(|lot| lot.contribution_date <= as_of)
        .map(|lot| {
            let holding = classify_holding(category, lot.contribution_date, as_of, rules);
            let current_value = lot.units * price;
            LotSnapshot {
                lot: lot.clone(),
                as_of,
                current_price: price,
                current_value,
                unrealized_gain: current_value - lot.invested_amount,
                holding_days: holding.holding_days,
                holding_months: holding.holding_months,
                is_short_term: holding.is_short_term,
                is_long_term: holding.is_long_term,
            }
        })
        .collect()
}
