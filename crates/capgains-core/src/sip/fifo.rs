use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::AssetCategory;
use crate::classification::{classify_holding, GainType};
use crate::error::CapGainsError;
use crate::rules::TaxRulesConfig;
use crate::sip::lots::{RedemptionRequest, SipInput, SipLot};
use crate::types::{Money, Rate, Units};
use crate::CapGainsResult;

/// A lot, or a slice of one, consumed by a redemption event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionLot {
    pub lot_id: u32,
    pub contribution_date: NaiveDate,
    pub redemption_date: NaiveDate,
    pub units_redeemed: Units,
    /// Share of the original lot's units consumed by this slice.
    pub fraction_of_lot: Rate,
    pub invested_amount: Money,
    pub purchase_price: Money,
    pub exit_price: Money,
    pub proceeds: Money,
    pub gain: Money,
    pub holding_days: i64,
    pub holding_months: u32,
    pub gain_type: GainType,
    pub taxable_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionOutcome {
    pub lots: Vec<RedemptionLot>,
    pub requested_units: Units,
    pub redeemed_units: Units,
    /// The request exceeded the units available and was cut down to them.
    pub capped: bool,
}

/// Immutable lots plus the units still open in each.
///
/// Successive calls to [`LotBook::redeem`] keep consuming oldest-first, so a
/// lot partly drained by one event is drained further by the next.
#[derive(Debug, Clone)]
pub struct LotBook {
    lots: Vec<SipLot>,
    remaining: Vec<Units>,
}

impl LotBook {
    pub fn new(mut lots: Vec<SipLot>) -> Self {
        lots.sort_by(|a, b| {
            a.contribution_date
                .cmp(&b.contribution_date)
                .then(a.lot_id.cmp(&b.lot_id))
        });
        let remaining = lots.iter().map(|lot| lot.units).collect();
        LotBook { lots, remaining }
    }

    pub fn lots(&self) -> &[SipLot] {
        &self.lots
    }

    /// Open units per lot, in FIFO order.
    pub fn open_units(&self) -> impl Iterator<Item = (&SipLot, Units)> + '_ {
        self.lots.iter().zip(self.remaining.iter().copied())
    }

    /// Units available for redemption on `date` (lots contributed after it are excluded).
    pub fn available_units(&self, date: NaiveDate) -> Units {
        self.open_units()
            .filter(|(lot, _)| lot.contribution_date <= date)
            .map(|(_, units)| units)
            .sum()
    }

    /// Consume units oldest-first for one redemption event.
    pub fn redeem(
        &mut self,
        request: &RedemptionRequest,
        redemption_date: NaiveDate,
        exit_price: Money,
        category: AssetCategory,
        rules: &TaxRulesConfig,
    ) -> CapGainsResult<RedemptionOutcome> {
        if exit_price <= Decimal::ZERO {
            return Err(CapGainsError::InvalidInput {
                field: "exit_price".into(),
                reason: "Exit price must be positive".into(),
            });
        }

        let available = self.available_units(redemption_date);
        let requested_units = match request {
            RedemptionRequest::Full => available,
            RedemptionRequest::Amount { amount } => *amount / exit_price,
            RedemptionRequest::Units { units } => *units,
        };
        if requested_units < Decimal::ZERO {
            return Err(CapGainsError::InvalidInput {
                field: "redemption".into(),
                reason: "Redemption quantity cannot be negative".into(),
            });
        }

        let capped = requested_units > available;
        if capped {
            tracing::warn!(%requested_units, %available, "redemption capped at available units");
        }
        let mut left = requested_units.min(available);
        let mut consumed: Vec<RedemptionLot> = Vec::new();

        for (lot, remaining) in self.lots.iter().zip(self.remaining.iter_mut()) {
            if left <= Decimal::ZERO {
                break;
            }
            if lot.contribution_date > redemption_date || remaining.is_zero() {
                continue;
            }

            let take = left.min(*remaining);
            *remaining -= take;
            left -= take;

            let invested_amount = lot.invested_amount * take / lot.units;
            let proceeds = take * exit_price;
            let gain = proceeds - invested_amount;
            let holding = classify_holding(category, lot.contribution_date, redemption_date, rules);
            let gain_type = if holding.is_long_term {
                GainType::LongTerm
            } else {
                GainType::ShortTerm
            };

            consumed.push(RedemptionLot {
                lot_id: lot.lot_id,
                contribution_date: lot.contribution_date,
                redemption_date,
                units_redeemed: take,
                fraction_of_lot: take / lot.units,
                invested_amount,
                purchase_price: lot.unit_price,
                exit_price,
                proceeds,
                gain,
                holding_days: holding.holding_days,
                holding_months: holding.holding_months,
                gain_type,
                taxable_amount: gain.max(Decimal::ZERO),
            });
        }

        let redeemed_units: Units = consumed.iter().map(|l| l.units_redeemed).sum();
        tracing::debug!(
            lots_touched = consumed.len(),
            %redeemed_units,
            %redemption_date,
            "FIFO redemption applied"
        );

        Ok(RedemptionOutcome {
            lots: consumed,
            requested_units,
            redeemed_units,
            capped,
        })
    }
}

/// Single redemption event at the input's intended exit date.
pub fn apply_fifo_redemption(
    lots: &[SipLot],
    input: &SipInput,
    exit_price: Money,
    rules: &TaxRulesConfig,
) -> CapGainsResult<Vec<RedemptionLot>> {
    let mut book = LotBook::new(lots.to_vec());
    let outcome = book.redeem(
        &input.redemption,
        input.intended_exit_date,
        exit_price,
        input.category,
        rules,
    )?;
    Ok(outcome.lots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(lot_id: u32, contribution_date: NaiveDate, price: Money, units: Units) -> SipLot {
        SipLot {
            lot_id,
            contribution_date,
            invested_amount: price * units,
            unit_price: price,
            units,
        }
    }

    fn three_lots() -> Vec<SipLot> {
        // Deliberately out of order: FIFO must sort by contribution date.
        vec![
            lot(3, date(2024, 3, 1), dec!(30), dec!(100)),
            lot(1, date(2023, 1, 1), dec!(10), dec!(100)),
            lot(2, date(2023, 9, 1), dec!(20), dec!(100)),
        ]
    }

    #[test]
    fn test_full_redemption_consumes_everything_oldest_first() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut book = LotBook::new(three_lots());
        let out = book
            .redeem(&RedemptionRequest::Full, date(2024, 6, 1), dec!(40), AssetCategory::EquityFund, &rules)
            .unwrap();
        let ids: Vec<u32> = out.lots.iter().map(|l| l.lot_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(out.redeemed_units, dec!(300));
        assert!(!out.capped);
        assert_eq!(out.lots[0].gain_type, GainType::LongTerm);
        assert_eq!(out.lots[1].gain_type, GainType::ShortTerm);
        assert_eq!(book.available_units(date(2024, 6, 1)), Decimal::ZERO);
    }

    #[test]
    fn test_partial_lot_scales_invested_and_gain() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut book = LotBook::new(three_lots());
        let out = book
            .redeem(&RedemptionRequest::Units { units: dec!(150) }, date(2024, 6, 1), dec!(40), AssetCategory::EquityFund, &rules)
            .unwrap();
        assert_eq!(out.lots.len(), 2);
        let partial = &out.lots[1];
        assert_eq!(partial.units_redeemed, dec!(50));
        assert_eq!(partial.fraction_of_lot, dec!(0.5));
        assert_eq!(partial.invested_amount, dec!(1_000));
        assert_eq!(partial.proceeds, dec!(2_000));
        assert_eq!(partial.gain, dec!(1_000));
    }

    #[test]
    fn test_successive_events_continue_from_partial_lot() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut book = LotBook::new(three_lots());
        let first = book
            .redeem(&RedemptionRequest::Units { units: dec!(150) }, date(2024, 6, 1), dec!(40), AssetCategory::EquityFund, &rules)
            .unwrap();
        let second = book
            .redeem(&RedemptionRequest::Units { units: dec!(100) }, date(2024, 7, 1), dec!(42), AssetCategory::EquityFund, &rules)
            .unwrap();

        assert_eq!(first.lots[1].contribution_date, second.lots[0].contribution_date);
        assert_eq!(second.lots[0].units_redeemed, dec!(50));
        assert_eq!(second.lots[1].lot_id, 3);
        assert_eq!(second.lots[1].units_redeemed, dec!(50));
        assert_eq!(book.available_units(date(2024, 7, 1)), dec!(50));
    }

    #[test]
    fn test_amount_request_converted_at_exit_price() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut book = LotBook::new(three_lots());
        let out = book
            .redeem(&RedemptionRequest::Amount { amount: dec!(2_000) }, date(2024, 6, 1), dec!(40), AssetCategory::EquityFund, &rules)
            .unwrap();
        assert_eq!(out.requested_units, dec!(50));
        assert_eq!(out.redeemed_units, dec!(50));
        assert_eq!(out.lots[0].proceeds, dec!(2_000));
    }

    #[test]
    fn test_oversized_request_capped_at_available() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut book = LotBook::new(three_lots());
        let out = book
            .redeem(&RedemptionRequest::Units { units: dec!(1_000) }, date(2024, 6, 1), dec!(40), AssetCategory::EquityFund, &rules)
            .unwrap();
        assert!(out.capped);
        assert_eq!(out.redeemed_units, dec!(300));
        assert!(out.redeemed_units <= out.requested_units);
    }

    #[test]
    fn test_lots_after_redemption_date_are_untouched() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut book = LotBook::new(three_lots());
        let out = book
            .redeem(&RedemptionRequest::Full, date(2023, 12, 1), dec!(25), AssetCategory::EquityFund, &rules)
            .unwrap();
        assert_eq!(out.redeemed_units, dec!(200));
        assert_eq!(book.available_units(date(2024, 6, 1)), dec!(100));
    }

    #[test]
    fn test_loss_lot_has_zero_taxable_amount() {
        let rules = TaxRulesConfig::fy_2024_25();
        let mut book = LotBook::new(three_lots());
        let out = book
            .redeem(&RedemptionRequest::Full, date(2024, 6, 1), dec!(15), AssetCategory::EquityFund, &rules)
            .unwrap();
        let loss = out.lots.iter().find(|l| l.lot_id == 3).unwrap();
        assert_eq!(loss.gain, dec!(-1_500));
        assert_eq!(loss.taxable_amount, Decimal::ZERO);
    }
}
