//! Basis-point fee split.
//!
//! A payment of `amount` is divided into:
//!
//! - **Platform fee**: `floor(amount * bps / 10_000)`
//! - **Creator payout**: `amount - fee`
//!
//! The truncation remainder always goes to the creator, so nothing is lost.
//!
//! ## Overflow
//!
//! `amount * bps` can overflow `u128` for large amounts. The product is
//! computed as `(amount / D) * bps + (amount % D) * bps / D` with
//! `D = 10_000`, which equals the floor of the full product and never
//! exceeds `amount` while `bps <= D`.

use paywall_types::{BASIS_POINTS_DENOMINATOR, DEFAULT_FEE_BASIS_POINTS, MAX_FEE_BASIS_POINTS};
use serde::{Deserialize, Serialize};

use crate::{FeeError, Result};

/// Result of splitting a payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Amount credited to the platform fee account.
    pub fee: u128,
    /// Amount credited to the creator.
    pub payout: u128,
}

impl FeeSplit {
    /// Total of both legs; always equals the split amount.
    pub fn total(&self) -> u128 {
        self.fee + self.payout
    }
}

/// Split `amount` at `fee_basis_points`.
///
/// # Errors
///
/// - [`FeeError::InvalidFee`] if `fee_basis_points` exceeds 10,000 (100%)
pub fn split(amount: u128, fee_basis_points: u16) -> Result<FeeSplit> {
    if fee_basis_points > BASIS_POINTS_DENOMINATOR {
        return Err(FeeError::InvalidFee {
            basis_points: fee_basis_points,
            max: BASIS_POINTS_DENOMINATOR,
        });
    }
    Ok(split_unchecked(amount, fee_basis_points))
}

fn split_unchecked(amount: u128, fee_basis_points: u16) -> FeeSplit {
    let denominator = u128::from(BASIS_POINTS_DENOMINATOR);
    let bps = u128::from(fee_basis_points);

    let fee = (amount / denominator) * bps + (amount % denominator) * bps / denominator;
    let payout = amount - fee;

    FeeSplit { fee, payout }
}

/// The platform's active fee rate, capped at [`MAX_FEE_BASIS_POINTS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    basis_points: u16,
}

impl FeeSchedule {
    /// Create a schedule at the given rate.
    ///
    /// # Errors
    ///
    /// - [`FeeError::InvalidFee`] if `basis_points > MAX_FEE_BASIS_POINTS`
    pub fn new(basis_points: u16) -> Result<Self> {
        if basis_points > MAX_FEE_BASIS_POINTS {
            return Err(FeeError::InvalidFee {
                basis_points,
                max: MAX_FEE_BASIS_POINTS,
            });
        }
        Ok(Self { basis_points })
    }

    pub fn basis_points(&self) -> u16 {
        self.basis_points
    }

    /// Replace the rate, returning the previous one.
    ///
    /// # Errors
    ///
    /// - [`FeeError::InvalidFee`] if `basis_points > MAX_FEE_BASIS_POINTS`;
    ///   the schedule is left unchanged
    pub fn set_basis_points(&mut self, basis_points: u16) -> Result<u16> {
        let next = Self::new(basis_points)?;
        let previous = self.basis_points;
        *self = next;

        tracing::info!(
            old_bps = previous,
            new_bps = basis_points,
            "fee schedule updated"
        );

        Ok(previous)
    }

    /// Split a payment at this schedule's rate.
    pub fn split(&self, amount: u128) -> FeeSplit {
        split_unchecked(amount, self.basis_points)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            basis_points: DEFAULT_FEE_BASIS_POINTS,
        }
    }
}
