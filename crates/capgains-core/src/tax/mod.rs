//! Rate application: progressive slabs, surcharge, cess and the regime
//! dispatch that decides which of them a disposal attracts.

pub mod computation;
pub mod rates;

pub use computation::{compute_tax, TaxComputation, TaxRegime};
pub use rates::{
    compute_cess, compute_slab_tax, compute_surcharge, flat_tax_with_cess, SlabTaxLine,
    SurchargeApplied,
};
