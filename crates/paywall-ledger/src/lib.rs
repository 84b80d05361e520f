//! # paywall-ledger
//!
//! Content pricing, pay-per-view grants, creator subscriptions and the
//! access analytics read model.
//!
//! Mutating paths that move money are split into a fallible `plan_*` step
//! and an infallible `commit_*` step. Callers run every check and every
//! transfer between the two, so a failure never leaves a half-written
//! record behind.
//!
//! ## Modules
//!
//! - [`registry`]: Content metadata and ownership checks
//! - [`access`]: Pay-per-view grants and refund window
//! - [`subscription`]: Creator tiers and subscription expiry
//! - [`analytics`]: Monotonic access and revenue counters

pub mod access;
pub mod analytics;
pub mod registry;
pub mod subscription;

use paywall_types::{AccountId, ContentId, Tick, TierId};

/// Error types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The caller may not perform this action.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// No content with this id.
    #[error("content {0} not found")]
    ContentNotFound(ContentId),

    /// Content id already registered.
    #[error("content {0} already exists")]
    ContentExists(ContentId),

    /// No pay-per-view grant for this pair.
    #[error("no access grant for content {content_id} and {account}")]
    GrantNotFound {
        content_id: ContentId,
        account: AccountId,
    },

    /// A grant already exists and repeat purchase is not allowed.
    #[error("content {content_id} already purchased by {account}")]
    AlreadyPurchased {
        content_id: ContentId,
        account: AccountId,
    },

    /// Tendered amount is below the price.
    #[error("insufficient funds: price {required}, tendered {tendered}")]
    InsufficientFunds {
        required: u128,
        tendered: u128,
    },

    /// The refund window has elapsed.
    #[error("refund window closed: granted at {granted_at}, now {now}, window {window}")]
    RefundWindowClosed {
        granted_at: Tick,
        now: Tick,
        window: u64,
    },

    /// No tier with this key.
    #[error("tier {tier_id} of {creator} not found")]
    TierNotFound { creator: AccountId, tier_id: TierId },

    /// Tier key already taken.
    #[error("tier {tier_id} of {creator} already exists")]
    TierExists { creator: AccountId, tier_id: TierId },

    /// Tier exists but is deactivated.
    #[error("tier {tier_id} of {creator} is not active")]
    TierInactive { creator: AccountId, tier_id: TierId },

    /// No subscription record for this key.
    #[error("{account} has no subscription to tier {tier_id} of {creator}")]
    SubscriptionNotFound {
        account: AccountId,
        creator: AccountId,
        tier_id: TierId,
    },

    /// A field violates its size or range limit.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Counter or expiry arithmetic overflowed.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Reject underpayment.
///
/// # Errors
///
/// - [`LedgerError::InsufficientFunds`] if `tendered < required`
pub fn ensure_tendered(required: u128, tendered: u128) -> Result<()> {
    if tendered < required {
        return Err(LedgerError::InsufficientFunds { required, tendered });
    }
    Ok(())
}
