pub mod asset;
pub mod classification;
pub mod error;
pub mod indexation;
pub mod optimization;
pub mod pipeline;
pub mod rules;
pub mod tax;
pub mod time_value;
pub mod types;

#[cfg(feature = "sip")]
pub mod sip;

#[cfg(feature = "compliance")]
pub mod compliance;

pub use error::CapGainsError;
pub use types::*;

/// Standard result type for all capital-gains operations
pub type CapGainsResult<T> = Result<T, CapGainsError>;
