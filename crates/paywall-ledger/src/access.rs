//! Pay-per-view access grants.
//!
//! At most one grant exists per `(content, account)`. A plain purchase of
//! content the account already holds is rejected; only callers that opt in
//! with [`RepeatPolicy::Increment`] may bump `purchase_count` instead.
//!
//! Refunds remove the grant and nothing else. Money already moved by the
//! purchase stays where it is.

use std::collections::BTreeMap;

use paywall_types::{AccountId, ContentId, Tick};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// Default refund window in ticks (~1 day of 12-second blocks).
pub const DEFAULT_REFUND_WINDOW_TICKS: u64 = 7_200;

/// A recorded purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Tick of the first purchase; repeat purchases keep it.
    pub granted_at: Tick,
    pub purchase_count: u32,
}

/// What to do when a grant already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatPolicy {
    /// Fail with [`LedgerError::AlreadyPurchased`].
    Reject,
    /// Keep the grant and increment its purchase count.
    Increment,
}

/// All pay-per-view grants.
#[derive(Clone, Debug, Default)]
pub struct AccessLedger {
    grants: BTreeMap<(ContentId, AccountId), AccessGrant>,
}

impl AccessLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, content_id: ContentId, account: &AccountId) -> Option<&AccessGrant> {
        self.grants.get(&(content_id, *account))
    }

    pub fn has_grant(&self, content_id: ContentId, account: &AccountId) -> bool {
        self.grants.contains_key(&(content_id, *account))
    }

    /// Compute the grant a purchase would produce without writing it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AlreadyPurchased`] if a grant exists and `policy` is `Reject`
    /// - [`LedgerError::Overflow`] if the purchase count would overflow
    pub fn plan_purchase(
        &self,
        content_id: ContentId,
        account: &AccountId,
        now: Tick,
        policy: RepeatPolicy,
    ) -> Result<AccessGrant> {
        match (self.grant(content_id, account), policy) {
            (None, _) => Ok(AccessGrant {
                granted_at: now,
                purchase_count: 1,
            }),
            (Some(_), RepeatPolicy::Reject) => Err(LedgerError::AlreadyPurchased {
                content_id,
                account: *account,
            }),
            (Some(existing), RepeatPolicy::Increment) => {
                let purchase_count = existing
                    .purchase_count
                    .checked_add(1)
                    .ok_or(LedgerError::Overflow("purchase_count"))?;
                Ok(AccessGrant {
                    granted_at: existing.granted_at,
                    purchase_count,
                })
            }
        }
    }

    /// Write a grant produced by [`plan_purchase`](Self::plan_purchase).
    pub fn commit_purchase(
        &mut self,
        content_id: ContentId,
        account: AccountId,
        grant: AccessGrant,
    ) {
        tracing::info!(
            content_id,
            %account,
            purchase_count = grant.purchase_count,
            "access grant recorded"
        );
        self.grants.insert((content_id, account), grant);
    }

    /// Revoke a grant if still inside the refund window.
    ///
    /// The window is inclusive: a refund at exactly `granted_at + window`
    /// is still accepted.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::GrantNotFound`] if no grant exists
    /// - [`LedgerError::RefundWindowClosed`] if `now - granted_at > window`
    pub fn refund(
        &mut self,
        content_id: ContentId,
        account: &AccountId,
        now: Tick,
        window: u64,
    ) -> Result<AccessGrant> {
        let key = (content_id, *account);
        let grant = self.grants.get(&key).ok_or(LedgerError::GrantNotFound {
            content_id,
            account: *account,
        })?;

        if now.saturating_sub(grant.granted_at) > window {
            return Err(LedgerError::RefundWindowClosed {
                granted_at: grant.granted_at,
                now,
                window,
            });
        }

        tracing::info!(content_id, %account, "access grant refunded");
        self.grants.remove(&key).ok_or(LedgerError::GrantNotFound {
            content_id,
            account: *account,
        })
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
