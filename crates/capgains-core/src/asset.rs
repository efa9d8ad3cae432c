use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CapGainsError;
use crate::types::Money;
use crate::CapGainsResult;

// ---------------------------------------------------------------------------
// Category & behaviour discriminants
// ---------------------------------------------------------------------------

/// Closed set of asset categories the engine knows how to tax.
///
/// Every category-dependent decision goes through one of the predicates
/// below, each an exhaustive `match`, so a new variant fails to compile until
/// each decision point has been considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    ListedEquity,
    EquityFund,
    DebtFund,
    PreciousMetal,
    Commodity,
    RealProperty,
    ForeignEquity,
    ForeignProperty,
    DigitalAsset,
}

impl AssetCategory {
    /// Taxed at the flat equity STCG/LTCG rates with the LTCG exemption.
    pub fn is_equity_like(&self) -> bool {
        match self {
            AssetCategory::ListedEquity | AssetCategory::EquityFund => true,
            AssetCategory::DebtFund
            | AssetCategory::PreciousMetal
            | AssetCategory::Commodity
            | AssetCategory::RealProperty
            | AssetCategory::ForeignEquity
            | AssetCategory::ForeignProperty
            | AssetCategory::DigitalAsset => false,
        }
    }

    /// Always taxed at slab rates regardless of holding period.
    pub fn is_debt_fund(&self) -> bool {
        match self {
            AssetCategory::DebtFund => true,
            AssetCategory::ListedEquity
            | AssetCategory::EquityFund
            | AssetCategory::PreciousMetal
            | AssetCategory::Commodity
            | AssetCategory::RealProperty
            | AssetCategory::ForeignEquity
            | AssetCategory::ForeignProperty
            | AssetCategory::DigitalAsset => false,
        }
    }

    /// Eligible for cost indexation when held long-term.
    pub fn is_indexable(&self) -> bool {
        match self {
            AssetCategory::PreciousMetal
            | AssetCategory::Commodity
            | AssetCategory::RealProperty
            | AssetCategory::ForeignEquity
            | AssetCategory::ForeignProperty => true,
            AssetCategory::ListedEquity
            | AssetCategory::EquityFund
            | AssetCategory::DebtFund
            | AssetCategory::DigitalAsset => false,
        }
    }

    pub fn is_foreign(&self) -> bool {
        match self {
            AssetCategory::ForeignEquity | AssetCategory::ForeignProperty => true,
            AssetCategory::ListedEquity
            | AssetCategory::EquityFund
            | AssetCategory::DebtFund
            | AssetCategory::PreciousMetal
            | AssetCategory::Commodity
            | AssetCategory::RealProperty
            | AssetCategory::DigitalAsset => false,
        }
    }

    pub fn is_digital(&self) -> bool {
        matches!(self, AssetCategory::DigitalAsset)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AssetCategory::ListedEquity => "Listed equity share",
            AssetCategory::EquityFund => "Equity-oriented fund",
            AssetCategory::DebtFund => "Debt fund",
            AssetCategory::PreciousMetal => "Precious metal",
            AssetCategory::Commodity => "Commodity",
            AssetCategory::RealProperty => "Real property",
            AssetCategory::ForeignEquity => "Foreign equity",
            AssetCategory::ForeignProperty => "Foreign property",
            AssetCategory::DigitalAsset => "Virtual digital asset",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    #[default]
    Domestic,
    Foreign,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldingIntent {
    #[default]
    Investment,
    Trading,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyTier {
    #[default]
    Low,
    Medium,
    High,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A separately-dated capital expenditure on the asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementCost {
    pub date: NaiveDate,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One disposal of one asset, as collected by the calling application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInput {
    pub category: AssetCategory,
    pub acquisition_date: NaiveDate,
    pub acquisition_cost: Money,
    pub disposal_date: NaiveDate,
    /// Hypothetical disposal date used instead of `disposal_date` by every stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated_disposal_date: Option<NaiveDate>,
    pub disposal_proceeds: Money,
    #[serde(default)]
    pub jurisdiction: Jurisdiction,
    #[serde(default)]
    pub holding_intent: HoldingIntent,
    #[serde(default)]
    pub frequency_tier: FrequencyTier,
    #[serde(default)]
    pub improvements: Vec<ImprovementCost>,
    #[serde(default)]
    pub transfer_expenses: Money,
}

impl AssetInput {
    pub fn effective_disposal_date(&self) -> NaiveDate {
        self.simulated_disposal_date.unwrap_or(self.disposal_date)
    }

    /// Copy of this input disposed on `date` instead.
    pub fn with_simulated_disposal(&self, date: NaiveDate) -> AssetInput {
        AssetInput {
            simulated_disposal_date: Some(date),
            ..self.clone()
        }
    }

    pub fn total_improvement_cost(&self) -> Money {
        self.improvements.iter().map(|i| i.amount).sum()
    }

    /// Proceeds net of transfer expenses minus acquisition and improvement
    /// cost, without any indexation. Negative for a loss.
    pub fn unindexed_gain(&self) -> Money {
        self.disposal_proceeds
            - self.transfer_expenses
            - self.acquisition_cost
            - self.total_improvement_cost()
    }

    pub fn is_foreign(&self) -> bool {
        self.jurisdiction == Jurisdiction::Foreign || self.category.is_foreign()
    }

    /// Enforces the data-model invariants. Violations are fatal to the
    /// computation; nothing is silently corrected.
    pub fn validate(&self) -> CapGainsResult<()> {
        let monetary = [
            ("acquisition_cost", self.acquisition_cost),
            ("disposal_proceeds", self.disposal_proceeds),
            ("transfer_expenses", self.transfer_expenses),
        ];
        for (field, value) in monetary {
            if value < Decimal::ZERO {
                return Err(CapGainsError::invalid_input(
                    field,
                    "Monetary amounts cannot be negative",
                ));
            }
        }

        if self.disposal_date < self.acquisition_date {
            return Err(CapGainsError::DisposalBeforeAcquisition {
                field: "disposal_date",
                acquired: self.acquisition_date,
                disposed: self.disposal_date,
            });
        }
        if let Some(simulated) = self.simulated_disposal_date {
            if simulated < self.acquisition_date {
                return Err(CapGainsError::DisposalBeforeAcquisition {
                    field: "simulated_disposal_date",
                    acquired: self.acquisition_date,
                    disposed: simulated,
                });
            }
        }

        for (i, improvement) in self.improvements.iter().enumerate() {
            if improvement.amount < Decimal::ZERO {
                return Err(CapGainsError::InvalidInput {
                    field: format!("improvements[{i}].amount"),
                    reason: "Improvement cost cannot be negative".into(),
                });
            }
            if improvement.date < self.acquisition_date
                || improvement.date > self.effective_disposal_date()
            {
                return Err(CapGainsError::InvalidInput {
                    field: format!("improvements[{i}].date"),
                    reason: "Improvement must fall between acquisition and disposal".into(),
                });
            }
        }
        Ok(())
    }
}
