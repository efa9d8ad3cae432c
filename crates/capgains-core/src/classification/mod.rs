pub mod holding;
pub mod income;

pub use holding::{
    classify_holding, classify_holding_period, compute_holding_days, compute_holding_months,
    long_term_eligible_from, threshold_months_for, HoldingPeriodDetail,
};
pub use income::{classify_income, Classification, DecisionFactor, GainType, IncomeType};
