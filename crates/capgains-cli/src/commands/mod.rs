pub mod asset;
pub mod rules;
pub mod sip;
