//! Creator subscription tiers.
//!
//! A tier is keyed by `(creator, tier_id)` and sells `duration_ticks` of
//! access to everything that creator publishes. Subscriptions are keyed by
//! `(account, creator, tier_id)` and only store their expiry.
//!
//! ## Renewal
//!
//! A fresh subscription expires at `now + duration`. A renewal extends from
//! `max(now, current_expiry)` so time already paid for is never lost.

use std::collections::BTreeMap;

use paywall_types::{AccountId, Tick, TierId};
use serde::{Deserialize, Serialize};

use crate::{ensure_tendered, LedgerError, Result};

/// A creator-defined subscription offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    pub price: u128,
    pub duration_ticks: u64,
    pub active: bool,
}

/// An account's subscription to one tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSubscription {
    /// Last tick (inclusive) at which the subscription is valid.
    pub expires_at: Tick,
}

/// Whether a subscription request replaces or extends the current expiry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscribeMode {
    /// `expires_at = now + duration`.
    Fresh,
    /// `expires_at = max(now, existing) + duration`.
    Renew,
}

/// A validated subscription awaiting payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionPlan {
    pub account: AccountId,
    pub creator: AccountId,
    pub tier_id: TierId,
    pub price: u128,
    pub expires_at: Tick,
    pub mode: SubscribeMode,
}

type SubscriptionKey = (AccountId, AccountId, TierId);

/// Tiers and subscriptions for all creators.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionManager {
    tiers: BTreeMap<(AccountId, TierId), SubscriptionTier>,
    subscriptions: BTreeMap<SubscriptionKey, ActiveSubscription>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new active tier for `creator`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] if `duration_ticks` is zero
    /// - [`LedgerError::TierExists`] if the key is taken
    pub fn create_tier(
        &mut self,
        creator: AccountId,
        tier_id: TierId,
        price: u128,
        duration_ticks: u64,
    ) -> Result<SubscriptionTier> {
        if duration_ticks == 0 {
            return Err(LedgerError::InvalidInput(
                "tier duration must be non-zero".to_string(),
            ));
        }
        if self.tiers.contains_key(&(creator, tier_id)) {
            return Err(LedgerError::TierExists { creator, tier_id });
        }

        let tier = SubscriptionTier {
            price,
            duration_ticks,
            active: true,
        };
        self.tiers.insert((creator, tier_id), tier);

        tracing::info!(%creator, tier_id, price, duration_ticks, "subscription tier created");
        Ok(tier)
    }

    /// Look up a tier.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TierNotFound`] if absent
    pub fn tier(&self, creator: &AccountId, tier_id: TierId) -> Result<&SubscriptionTier> {
        self.tiers
            .get(&(*creator, tier_id))
            .ok_or(LedgerError::TierNotFound {
                creator: *creator,
                tier_id,
            })
    }

    fn tier_mut(&mut self, creator: &AccountId, tier_id: TierId) -> Result<&mut SubscriptionTier> {
        self.tiers
            .get_mut(&(*creator, tier_id))
            .ok_or(LedgerError::TierNotFound {
                creator: *creator,
                tier_id,
            })
    }

    /// Change a tier's price and duration. Existing subscriptions keep
    /// their expiry.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TierNotFound`] if absent
    /// - [`LedgerError::InvalidInput`] if `duration_ticks` is zero
    pub fn update_tier(
        &mut self,
        creator: &AccountId,
        tier_id: TierId,
        price: u128,
        duration_ticks: u64,
    ) -> Result<SubscriptionTier> {
        if duration_ticks == 0 {
            return Err(LedgerError::InvalidInput(
                "tier duration must be non-zero".to_string(),
            ));
        }
        let tier = self.tier_mut(creator, tier_id)?;
        tier.price = price;
        tier.duration_ticks = duration_ticks;
        let updated = *tier;

        tracing::info!(%creator, tier_id, price, duration_ticks, "subscription tier updated");
        Ok(updated)
    }

    /// Stop selling a tier. Current subscribers keep access until expiry.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TierNotFound`] if absent
    pub fn deactivate_tier(&mut self, creator: &AccountId, tier_id: TierId) -> Result<()> {
        self.tier_mut(creator, tier_id)?.active = false;
        tracing::info!(%creator, tier_id, "subscription tier deactivated");
        Ok(())
    }

    /// Validate a subscription request and compute its new expiry.
    ///
    /// A renewal with no existing record is treated as expired and extends
    /// from `now`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TierNotFound`] if the tier is absent
    /// - [`LedgerError::TierInactive`] if the tier is deactivated
    /// - [`LedgerError::InsufficientFunds`] if `tendered < price`
    /// - [`LedgerError::Overflow`] if the expiry overflows
    pub fn plan_subscription(
        &self,
        account: AccountId,
        creator: AccountId,
        tier_id: TierId,
        tendered: u128,
        now: Tick,
        mode: SubscribeMode,
    ) -> Result<SubscriptionPlan> {
        let tier = self.tier(&creator, tier_id)?;
        if !tier.active {
            return Err(LedgerError::TierInactive { creator, tier_id });
        }
        ensure_tendered(tier.price, tendered)?;

        let base = match mode {
            SubscribeMode::Fresh => now,
            SubscribeMode::Renew => self
                .subscription(&account, &creator, tier_id)
                .map_or(now, |sub| sub.expires_at.max(now)),
        };
        let expires_at = base
            .checked_add(tier.duration_ticks)
            .ok_or(LedgerError::Overflow("subscription expiry"))?;

        Ok(SubscriptionPlan {
            account,
            creator,
            tier_id,
            price: tier.price,
            expires_at,
            mode,
        })
    }

    /// Write a subscription produced by [`plan_subscription`](Self::plan_subscription).
    pub fn commit_subscription(&mut self, plan: &SubscriptionPlan) {
        self.subscriptions.insert(
            (plan.account, plan.creator, plan.tier_id),
            ActiveSubscription {
                expires_at: plan.expires_at,
            },
        );
        tracing::info!(
            account = %plan.account,
            creator = %plan.creator,
            tier_id = plan.tier_id,
            expires_at = plan.expires_at,
            renewal = plan.mode == SubscribeMode::Renew,
            "subscription recorded"
        );
    }

    pub fn subscription(
        &self,
        account: &AccountId,
        creator: &AccountId,
        tier_id: TierId,
    ) -> Option<&ActiveSubscription> {
        self.subscriptions.get(&(*account, *creator, tier_id))
    }

    /// `true` while `expires_at >= now`.
    pub fn is_subscribed(
        &self,
        account: &AccountId,
        creator: &AccountId,
        tier_id: TierId,
        now: Tick,
    ) -> bool {
        self.subscription(account, creator, tier_id)
            .is_some_and(|sub| sub.expires_at >= now)
    }

    /// First unexpired tier `account` holds for `creator`, if any.
    pub fn active_tier_for(
        &self,
        account: &AccountId,
        creator: &AccountId,
        now: Tick,
    ) -> Option<TierId> {
        let start = (*account, *creator, TierId::MIN);
        let end = (*account, *creator, TierId::MAX);
        self.subscriptions
            .range(start..=end)
            .find(|(_, sub)| sub.expires_at >= now)
            .map(|((_, _, tier_id), _)| *tier_id)
    }

    /// Drop a subscription record. No money is returned.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SubscriptionNotFound`] if absent
    pub fn cancel(
        &mut self,
        account: &AccountId,
        creator: &AccountId,
        tier_id: TierId,
    ) -> Result<ActiveSubscription> {
        let removed = self
            .subscriptions
            .remove(&(*account, *creator, tier_id))
            .ok_or(LedgerError::SubscriptionNotFound {
                account: *account,
                creator: *creator,
                tier_id,
            })?;
        tracing::info!(%account, %creator, tier_id, "subscription cancelled");
        Ok(removed)
    }
}
