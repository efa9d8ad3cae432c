//! Versioned, immutable tax rule sets and the process-wide active-rules store.
//!
//! Every engine function takes `&TaxRulesConfig` explicitly. The store in
//! [`store`] only exists so hosts that want a single swappable default can
//! have one without passing configs around themselves.

pub mod config;
pub mod fiscal_year;
pub mod store;

pub use config::{
    BusinessIncomePolicy, FlatRates, HoldingThresholds, SlabBracket, SurchargeBand,
    TaxRulesConfig, RULES_PATH_ENV,
};
pub use fiscal_year::{fiscal_year_for_date, FiscalYear};
pub use store::{get_active_rules, index_for_fiscal_year, set_active_rules, RulesStore};
