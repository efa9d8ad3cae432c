use arc_swap::ArcSwap;
use rust_decimal::Decimal;
use std::sync::{Arc, OnceLock};

use crate::rules::config::TaxRulesConfig;
use crate::rules::fiscal_year::FiscalYear;
use crate::CapGainsResult;

/// Holder of the currently active rule set.
///
/// Replacement is a single pointer swap: readers holding an `Arc` from
/// [`RulesStore::get_active_rules`] keep the snapshot they loaded, later
/// readers see the new config, nobody sees a mix.
pub struct RulesStore {
    active: ArcSwap<TaxRulesConfig>,
}

impl RulesStore {
    pub fn new(config: TaxRulesConfig) -> Self {
        RulesStore {
            active: ArcSwap::from_pointee(config),
        }
    }

    pub fn get_active_rules(&self) -> Arc<TaxRulesConfig> {
        self.active.load_full()
    }

    /// Validate and publish `config` as the active rule set.
    pub fn set_active_rules(&self, config: TaxRulesConfig) -> CapGainsResult<()> {
        config.validate()?;
        let fiscal_year = config.fiscal_year;
        self.active.store(Arc::new(config));
        tracing::info!(%fiscal_year, "active tax rules replaced");
        Ok(())
    }

    /// Cost-inflation index for a fiscal-year label such as `"2023-24"`.
    pub fn index_for_fiscal_year(&self, label: &str) -> Option<Decimal> {
        let fiscal_year: FiscalYear = label.parse().ok()?;
        self.active.load().index_for(fiscal_year)
    }
}

impl Default for RulesStore {
    fn default() -> Self {
        RulesStore::new(TaxRulesConfig::default())
    }
}

static GLOBAL_STORE: OnceLock<RulesStore> = OnceLock::new();

/// Process-wide store, seeded with the built-in rule set on first use.
pub fn global() -> &'static RulesStore {
    GLOBAL_STORE.get_or_init(RulesStore::default)
}

pub fn get_active_rules() -> Arc<TaxRulesConfig> {
    global().get_active_rules()
}

pub fn set_active_rules(config: TaxRulesConfig) -> CapGainsResult<()> {
    global().set_active_rules(config)
}

pub fn index_for_fiscal_year(label: &str) -> Option<Decimal> {
    global().index_for_fiscal_year(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::thread;

    #[test]
    fn test_index_lookup_by_label() {
        let store = RulesStore::default();
        assert_eq!(store.index_for_fiscal_year("2017-18"), Some(dec!(272)));
        assert_eq!(store.index_for_fiscal_year("1990-91"), None);
        assert_eq!(store.index_for_fiscal_year("not-a-year"), None);
    }

    #[test]
    fn test_swap_replaces_whole_config() {
        let store = RulesStore::default();
        let before = store.get_active_rules();

        let mut next = TaxRulesConfig::fy_2024_25();
        next.fiscal_year = FiscalYear::starting(2025);
        next.cess_rate = dec!(0.05);
        store.set_active_rules(next).unwrap();

        // The earlier snapshot is untouched.
        assert_eq!(before.cess_rate, dec!(0.04));
        let after = store.get_active_rules();
        assert_eq!(after.cess_rate, dec!(0.05));
        assert_eq!(after.fiscal_year, FiscalYear::starting(2025));
    }

    #[test]
    fn test_invalid_config_is_not_published() {
        let store = RulesStore::default();
        let mut broken = TaxRulesConfig::fy_2024_25();
        broken.cess_rate = dec!(1.5);
        assert!(store.set_active_rules(broken).is_err());
        assert_eq!(store.get_active_rules().cess_rate, dec!(0.04));
    }

    #[test]
    fn test_concurrent_readers_see_consistent_snapshots() {
        let store = Arc::new(RulesStore::default());
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let rules = store.get_active_rules();
                        // Each published config pairs cess 4% with FY 2024-25
                        // and cess 5% with FY 2025-26.
                        let consistent = (rules.cess_rate == dec!(0.04)
                            && rules.fiscal_year == FiscalYear::starting(2024))
                            || (rules.cess_rate == dec!(0.05)
                                && rules.fiscal_year == FiscalYear::starting(2025));
                        assert!(consistent);
                    }
                })
            })
            .collect();

        for i in 0..50 {
            let mut next = TaxRulesConfig::fy_2024_25();
            if i % 2 == 0 {
                next.fiscal_year = FiscalYear::starting(2025);
                next.cess_rate = dec!(0.05);
            }
            store.set_active_rules(next).unwrap();
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
