use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::AssetCategory;
use crate::classification::GainType;
use crate::rules::TaxRulesConfig;
use crate::sip::fifo::RedemptionLot;
use crate::tax::{compute_cess, compute_slab_tax, compute_surcharge, SlabTaxLine};
use crate::types::Money;

/// Aggregate tax on one redemption event after intra-event loss set-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionTaxSummary {
    /// Net short-term gain after set-off, never negative.
    pub short_term_gain: Money,
    /// Net long-term gain after set-off, never negative.
    pub long_term_gain: Money,
    pub losses_carried_forward: Money,
    pub exemption_consumed: Money,
    pub base_tax: Money,
    pub surcharge: Money,
    pub cess: Money,
    pub total_tax: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slab_breakdown: Option<Vec<SlabTaxLine>>,
}

struct NettedGains {
    short_term: Money,
    long_term: Money,
    carried_forward: Money,
}

/// Short-term losses may absorb short-term then long-term gains; long-term
/// losses may only absorb long-term gains.
fn net_gains(lots: &[RedemptionLot]) -> NettedGains {
    let sum = |gain_type: GainType| -> Money {
        lots.iter()
            .filter(|l| l.gain_type == gain_type)
            .map(|l| l.gain)
            .sum()
    };

    let mut short_term = sum(GainType::ShortTerm);
    let mut long_term = sum(GainType::LongTerm);
    let mut carried_forward = Decimal::ZERO;

    if long_term < Decimal::ZERO {
        carried_forward += -long_term;
        long_term = Decimal::ZERO;
    }
    if short_term < Decimal::ZERO {
        let residual = -short_term;
        let absorbed = residual.min(long_term);
        long_term -= absorbed;
        carried_forward += residual - absorbed;
        short_term = Decimal::ZERO;
    }

    NettedGains {
        short_term,
        long_term,
        carried_forward,
    }
}

/// Tax on the lots consumed by a single redemption event.
pub fn compute_redemption_tax(
    lots: &[RedemptionLot],
    category: AssetCategory,
    rules: &TaxRulesConfig,
) -> RedemptionTaxSummary {
    let netted = net_gains(lots);
    let flat = &rules.flat_rates;

    let mut exemption_consumed = Decimal::ZERO;
    let mut surcharge = Decimal::ZERO;
    let mut slab_breakdown = None;

    let base_tax = if category.is_equity_like() {
        exemption_consumed = netted.long_term.min(rules.equity_ltcg_exemption);
        netted.short_term * flat.equity_short_term
            + (netted.long_term - exemption_consumed) * flat.equity_long_term
    } else if category.is_debt_fund() {
        let taxable = netted.short_term + netted.long_term;
        let (slab_tax, lines) = compute_slab_tax(taxable, &rules.slabs);
        surcharge = compute_surcharge(taxable, slab_tax, rules).map_or(Decimal::ZERO, |s| s.amount);
        slab_breakdown = Some(lines);
        slab_tax
    } else {
        let (slab_tax, lines) = compute_slab_tax(netted.short_term, &rules.slabs);
        surcharge = compute_surcharge(netted.short_term, slab_tax, rules)
            .map_or(Decimal::ZERO, |s| s.amount);
        slab_breakdown = Some(lines);
        slab_tax + netted.long_term * flat.non_equity_long_term
    };

    let cess = compute_cess(base_tax + surcharge, rules);

    tracing::debug!(
        short_term = %netted.short_term,
        long_term = %netted.long_term,
        carried = %netted.carried_forward,
        "redemption tax computed"
    );

    RedemptionTaxSummary {
        short_term_gain: netted.short_term,
        long_term_gain: netted.long_term,
        losses_carried_forward: netted.carried_forward,
        exemption_consumed,
        base_tax,
        surcharge,
        cess,
        total_tax: base_tax + surcharge + cess,
        slab_breakdown,
    }
}
