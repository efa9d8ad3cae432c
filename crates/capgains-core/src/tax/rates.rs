use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rules::{SlabBracket, TaxRulesConfig};
use crate::types::{Money, Rate};

/// Tax attributed to one slab bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabTaxLine {
    pub lower: Money,
    pub upper: Option<Money>,
    pub rate: Rate,
    pub taxable_in_slab: Money,
    pub tax: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurchargeApplied {
    pub band_floor: Money,
    pub rate: Rate,
    pub amount: Money,
}

/// Progressive slab tax on `amount`.
///
/// Brackets are walked in ascending order; each contributes its width (capped
/// at `amount`) times its rate. The walk ends once `amount` is exhausted or
/// the open-ended bracket has been taxed.
pub fn compute_slab_tax(amount: Money, slabs: &[SlabBracket]) -> (Money, Vec<SlabTaxLine>) {
    let mut total = Decimal::ZERO;
    let mut lines: Vec<SlabTaxLine> = Vec::new();

    if amount <= Decimal::ZERO {
        return (total, lines);
    }

    for bracket in slabs {
        if amount <= bracket.lower {
            break;
        }
        let ceiling = match bracket.upper {
            Some(upper) => amount.min(upper),
            None => amount,
        };
        let taxable_in_slab = ceiling - bracket.lower;
        let tax = taxable_in_slab * bracket.rate;
        total += tax;
        lines.push(SlabTaxLine {
            lower: bracket.lower,
            upper: bracket.upper,
            rate: bracket.rate,
            taxable_in_slab,
            tax,
        });
        if bracket.upper.is_none() {
            break;
        }
    }

    (total, lines)
}

/// Surcharge on `tax` for the highest band whose floor `taxable` meets.
pub fn compute_surcharge(
    taxable: Money,
    tax: Money,
    rules: &TaxRulesConfig,
) -> Option<SurchargeApplied> {
    rules
        .surcharge_band_for(taxable)
        .map(|band| SurchargeApplied {
            band_floor: band.floor,
            rate: band.rate,
            amount: tax * band.rate,
        })
}

/// Cess on tax plus surcharge.
pub fn compute_cess(tax_and_surcharge: Money, rules: &TaxRulesConfig) -> Money {
    tax_and_surcharge * rules.cess_rate
}

/// Flat-rate tax on a non-negative `amount`, including cess.
pub fn flat_tax_with_cess(amount: Money, rate: Rate, rules: &TaxRulesConfig) -> Money {
    let base = amount.max(Decimal::ZERO) * rate;
    base + compute_cess(base, rules)
}
