//! Periodic (SIP-style) and lump-sum fund investments: lot construction,
//! FIFO redemption and the aggregate tax on a redemption event.

pub mod fifo;
pub mod lots;
pub mod tax;

pub use fifo::{apply_fifo_redemption, LotBook, RedemptionLot, RedemptionOutcome};
pub use lots::{
    build_lots, snapshot_lots, ContributionFrequency, InvestmentMode, LotSnapshot, PricePoint,
    PriceSource, RedemptionRequest, SipInput, SipLot,
};
pub use tax::{compute_redemption_tax, RedemptionTaxSummary};
