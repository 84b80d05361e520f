//! # paywall-fees
//!
//! Platform fee arithmetic.
//!
//! Every payment is split between the platform and the content creator in
//! basis points. The split is exact: `fee + payout == amount` for every
//! representable amount.
//!
//! ## Modules
//!
//! - [`split`]: Basis-point fee split and the capped fee schedule

pub mod split;

pub use split::{split, FeeSchedule, FeeSplit};

/// Error types for fee operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    /// Fee rate exceeds the allowed maximum.
    #[error("invalid fee: {basis_points} bps exceeds maximum of {max} bps")]
    InvalidFee {
        /// The rejected rate.
        basis_points: u16,
        /// The maximum accepted rate.
        max: u16,
    },
}

/// Convenience result type for fee operations.
pub type Result<T> = std::result::Result<T, FeeError>;
