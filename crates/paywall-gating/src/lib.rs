//! # paywall-gating
//!
//! Token- and balance-gated access.
//!
//! A gating rule attached to a content id grants access to anyone holding
//! enough of a fungible token, a specific NFT, or enough native currency.
//! Rules exist in two schemas: the legacy shape and the extended shape with
//! category, tags, an active flag and an access counter. The migration
//! coordinator moves rules between them while the system stays live.
//!
//! ## Modules
//!
//! - [`rule`]: Rule schemas and the per-kind requirement
//! - [`oracle`]: Token balance/ownership boundary and a stub oracle
//! - [`engine`]: Rule storage and access evaluation
//! - [`migration`]: Upgrade state machine and legacy rule sources

pub mod engine;
pub mod migration;
pub mod oracle;
pub mod rule;

use paywall_types::{ContentId, InvalidGatingKind};

/// Error types for gating operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatingError {
    /// No rule for this content id.
    #[error("no gating rule for content {0}")]
    RuleNotFound(ContentId),

    /// Kind outside `{FT, NFT, NATIVE}`.
    #[error(transparent)]
    InvalidGatingKind(#[from] InvalidGatingKind),

    /// A rule-mutating call arrived while an upgrade is running.
    #[error("schema upgrade in progress")]
    UpgradeInProgress,

    /// A migration-only call arrived while no upgrade is running.
    #[error("no schema upgrade in progress")]
    NotInProgress,

    /// The balance/ownership oracle could not answer.
    #[error("gating check failed: {0}")]
    CheckFailed(String),

    /// The legacy rule store could not be read.
    #[error("legacy rule read failed: {0}")]
    LegacyRead(String),

    /// Category or tags exceed their limits.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type for gating operations.
pub type Result<T> = std::result::Result<T, GatingError>;
