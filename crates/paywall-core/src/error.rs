//! Unified error type for the paywall service.

use paywall_fees::FeeError;
use paywall_gating::GatingError;
use paywall_ledger::LedgerError;
use serde::{Deserialize, Serialize};

use crate::treasury::TransferError;

/// Caller-facing error category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotAuthorized,
    NotFound,
    AlreadyExists,
    AlreadyPurchased,
    InsufficientFunds,
    InvalidGatingKind,
    InvalidFee,
    NotEligible,
    UpgradeInProgress,
    NotInProgress,
    TransferFailed,
    GatingCheckFailed,
    InvalidTier,
    InvalidInput,
    /// The legacy rule store could not be read.
    LegacyUnavailable,
    InvalidConfig,
}

/// Every error a paywall operation can return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaywallError {
    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Gating(#[from] GatingError),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("not eligible: {0}")]
    NotEligible(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid config: {0}")]
    Config(String),
}

impl PaywallError {
    /// Map to the caller-facing category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaywallError::Fee(FeeError::InvalidFee { .. }) => ErrorKind::InvalidFee,
            PaywallError::Ledger(e) => ledger_kind(e),
            PaywallError::Gating(e) => gating_kind(e),
            PaywallError::Transfer(_) => ErrorKind::TransferFailed,
            PaywallError::NotAuthorized(_) => ErrorKind::NotAuthorized,
            PaywallError::NotEligible(_) => ErrorKind::NotEligible,
            PaywallError::InvalidInput(_) => ErrorKind::InvalidInput,
            PaywallError::Config(_) => ErrorKind::InvalidConfig,
        }
    }
}

fn ledger_kind(err: &LedgerError) -> ErrorKind {
    match err {
        LedgerError::NotAuthorized(_) => ErrorKind::NotAuthorized,
        LedgerError::ContentNotFound(_)
        | LedgerError::GrantNotFound { .. }
        | LedgerError::TierNotFound { .. }
        | LedgerError::SubscriptionNotFound { .. } => ErrorKind::NotFound,
        LedgerError::ContentExists(_) | LedgerError::TierExists { .. } => ErrorKind::AlreadyExists,
        LedgerError::AlreadyPurchased { .. } => ErrorKind::AlreadyPurchased,
        LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
        LedgerError::RefundWindowClosed { .. } => ErrorKind::NotEligible,
        LedgerError::TierInactive { .. } => ErrorKind::InvalidTier,
        LedgerError::InvalidInput(_) | LedgerError::Overflow(_) => ErrorKind::InvalidInput,
    }
}

fn gating_kind(err: &GatingError) -> ErrorKind {
    match err {
        GatingError::RuleNotFound(_) => ErrorKind::NotFound,
        GatingError::InvalidGatingKind(_) => ErrorKind::InvalidGatingKind,
        GatingError::UpgradeInProgress => ErrorKind::UpgradeInProgress,
        GatingError::NotInProgress => ErrorKind::NotInProgress,
        GatingError::CheckFailed(_) => ErrorKind::GatingCheckFailed,
        GatingError::LegacyRead(_) => ErrorKind::LegacyUnavailable,
        GatingError::InvalidInput(_) => ErrorKind::InvalidInput,
    }
}

/// Convenience result type for paywall operations.
pub type Result<T> = std::result::Result<T, PaywallError>;
