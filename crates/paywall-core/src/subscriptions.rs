//! Subscription tier and subscriber operations.

use paywall_fees::FeeSplit;
use paywall_ledger::subscription::{ActiveSubscription, SubscribeMode, SubscriptionTier};
use paywall_types::events::PaywallEvent;
use paywall_types::{AccountId, Tick, TierId};
use serde::{Deserialize, Serialize};

use crate::treasury::{execute_transfers, TransferLeg};
use crate::{CallContext, Paywall, PaywallError, Result};

/// What a successful subscribe or renew charged and recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionReceipt {
    pub account: AccountId,
    pub creator: AccountId,
    pub tier_id: TierId,
    pub expires_at: Tick,
    pub split: FeeSplit,
}

impl Paywall {
    /// Create a tier. The caller must be `creator`.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is `creator`
    /// - `InvalidInput` if `duration_ticks` is zero
    /// - `AlreadyExists` if the tier id is taken for this creator
    pub fn create_tier(
        &self,
        ctx: &CallContext,
        creator: AccountId,
        tier_id: TierId,
        price: u128,
        duration_ticks: u64,
    ) -> Result<SubscriptionTier> {
        ensure_tier_owner(ctx, &creator)?;
        let mut state = self.lock();
        let tier = state
            .subscriptions
            .create_tier(creator, tier_id, price, duration_ticks)?;

        self.events.emit(
            ctx.now,
            PaywallEvent::TierCreated {
                creator,
                tier_id,
                price,
                duration_ticks,
            },
        );
        Ok(tier)
    }

    /// Change price and duration of a tier. The caller must be `creator`.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is `creator`
    /// - `NotFound` if the creator has no such tier
    /// - `InvalidInput` if `duration_ticks` is zero
    pub fn update_tier(
        &self,
        ctx: &CallContext,
        creator: AccountId,
        tier_id: TierId,
        price: u128,
        duration_ticks: u64,
    ) -> Result<SubscriptionTier> {
        ensure_tier_owner(ctx, &creator)?;
        let mut state = self.lock();
        let tier = state
            .subscriptions
            .update_tier(&creator, tier_id, price, duration_ticks)?;

        self.events.emit(
            ctx.now,
            PaywallEvent::TierUpdated {
                creator,
                tier_id,
                active: tier.active,
            },
        );
        Ok(tier)
    }

    /// Stop selling a tier. Existing subscribers keep access until expiry.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is `creator`
    /// - `NotFound` if the creator has no such tier
    pub fn deactivate_tier(
        &self,
        ctx: &CallContext,
        creator: AccountId,
        tier_id: TierId,
    ) -> Result<()> {
        ensure_tier_owner(ctx, &creator)?;
        let mut state = self.lock();
        state.subscriptions.deactivate_tier(&creator, tier_id)?;

        self.events.emit(
            ctx.now,
            PaywallEvent::TierUpdated {
                creator,
                tier_id,
                active: false,
            },
        );
        Ok(())
    }

    /// Subscribe the caller; the new expiry is `now + duration`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the tier is absent
    /// - `InvalidTier` if the tier is deactivated
    /// - `InsufficientFunds` if `tendered` is below the price
    /// - `TransferFailed` if the treasury rejects a leg; nothing is written
    pub fn subscribe(
        &self,
        ctx: &CallContext,
        creator: AccountId,
        tier_id: TierId,
        tendered: u128,
    ) -> Result<SubscriptionReceipt> {
        self.pay_subscription(ctx, creator, tier_id, tendered, SubscribeMode::Fresh)
    }

    /// Extend the caller's subscription from `max(now, current expiry)`.
    ///
    /// A missing subscription is treated as expired.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe`](Self::subscribe).
    pub fn renew(
        &self,
        ctx: &CallContext,
        creator: AccountId,
        tier_id: TierId,
        tendered: u128,
    ) -> Result<SubscriptionReceipt> {
        self.pay_subscription(ctx, creator, tier_id, tendered, SubscribeMode::Renew)
    }

    /// Drop the caller's subscription. Nothing is refunded.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the caller has no such subscription
    pub fn cancel_subscription(
        &self,
        ctx: &CallContext,
        creator: AccountId,
        tier_id: TierId,
    ) -> Result<ActiveSubscription> {
        let mut state = self.lock();
        let removed = state.subscriptions.cancel(&ctx.caller, &creator, tier_id)?;

        self.events.emit(
            ctx.now,
            PaywallEvent::SubscriptionCancelled {
                account: ctx.caller,
                creator,
                tier_id,
            },
        );
        Ok(removed)
    }

    /// `true` while the subscription's expiry is at or after `now`.
    pub fn is_subscribed(
        &self,
        account: &AccountId,
        creator: &AccountId,
        tier_id: TierId,
        now: Tick,
    ) -> bool {
        self.lock()
            .subscriptions
            .is_subscribed(account, creator, tier_id, now)
    }

    fn pay_subscription(
        &self,
        ctx: &CallContext,
        creator: AccountId,
        tier_id: TierId,
        tendered: u128,
        mode: SubscribeMode,
    ) -> Result<SubscriptionReceipt> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let plan = state.subscriptions.plan_subscription(
            ctx.caller, creator, tier_id, tendered, ctx.now, mode,
        )?;
        let split = state.fees.split(plan.price);

        execute_transfers(
            state.treasury.as_mut(),
            &[
                TransferLeg {
                    amount: split.fee,
                    from: ctx.caller,
                    to: state.fee_account,
                },
                TransferLeg {
                    amount: split.payout,
                    from: ctx.caller,
                    to: creator,
                },
            ],
        )?;

        state.subscriptions.commit_subscription(&plan);

        let renewal = mode == SubscribeMode::Renew;
        self.events.emit(
            ctx.now,
            PaywallEvent::Subscribed {
                account: ctx.caller,
                creator,
                tier_id,
                expires_at: plan.expires_at,
                fee: split.fee,
                payout: split.payout,
                renewal,
            },
        );

        Ok(SubscriptionReceipt {
            account: ctx.caller,
            creator,
            tier_id,
            expires_at: plan.expires_at,
            split,
        })
    }
}

fn ensure_tier_owner(ctx: &CallContext, creator: &AccountId) -> Result<()> {
    if &ctx.caller != creator {
        return Err(PaywallError::NotAuthorized(
            "only the creator may manage its tiers".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use crate::ErrorKind;

    fn with_tier(price: u128, duration: u64) -> Paywall {
        let paywall = service();
        paywall
            .create_tier(&ctx(CREATOR, 1), CREATOR, 1, price, duration)
            .expect("tier");
        paywall
    }

    #[test]
    fn test_create_tier_checks() {
        let paywall = with_tier(10, 100);
        assert_eq!(
            paywall
                .create_tier(&ctx(BUYER, 1), CREATOR, 2, 10, 100)
                .map_err(|e| e.kind()),
            Err(ErrorKind::NotAuthorized)
        );
        assert_eq!(
            paywall
                .create_tier(&ctx(CREATOR, 1), CREATOR, 1, 10, 100)
                .map_err(|e| e.kind()),
            Err(ErrorKind::AlreadyExists)
        );
        assert_eq!(
            paywall
                .create_tier(&ctx(CREATOR, 1), CREATOR, 2, 10, 0)
                .map_err(|e| e.kind()),
            Err(ErrorKind::InvalidInput)
        );
    }

    #[test]
    fn test_subscribe_and_expiry() {
        let paywall = with_tier(1_000, 100);
        let receipt = paywall
            .subscribe(&ctx(BUYER, 50), CREATOR, 1, 1_000)
            .expect("subscribe");
        assert_eq!(receipt.expires_at, 150);
        assert_eq!(receipt.split.fee, 25);
        assert!(paywall.is_subscribed(&BUYER, &CREATOR, 1, 150));
        assert!(!paywall.is_subscribed(&BUYER, &CREATOR, 1, 151));
        assert_eq!(paywall.native_balance(&CREATOR), Ok(975));
    }

    #[test]
    fn test_renew_extends_from_existing_expiry() {
        let paywall = with_tier(10, 100);
        paywall.subscribe(&ctx(BUYER, 0), CREATOR, 1, 10).expect("sub");
        let renewed = paywall.renew(&ctx(BUYER, 40), CREATOR, 1, 10).expect("renew");
        assert_eq!(renewed.expires_at, 200);

        let late = paywall.renew(&ctx(BUYER, 500), CREATOR, 1, 10).expect("late renew");
        assert_eq!(late.expires_at, 600);
    }

    #[test]
    fn test_inactive_tier_rejected_existing_kept() {
        let paywall = with_tier(10, 100);
        paywall.subscribe(&ctx(BUYER, 0), CREATOR, 1, 10).expect("sub");
        paywall.deactivate_tier(&ctx(CREATOR, 5), CREATOR, 1).expect("deactivate");

        assert_eq!(
            paywall.subscribe(&ctx(BUYER, 6), CREATOR, 1, 10).map_err(|e| e.kind()),
            Err(ErrorKind::InvalidTier)
        );
        assert!(paywall.is_subscribed(&BUYER, &CREATOR, 1, 50));
    }

    #[test]
    fn test_subscribe_errors() {
        let paywall = with_tier(10, 100);
        assert_eq!(
            paywall.subscribe(&ctx(BUYER, 0), CREATOR, 9, 10).map_err(|e| e.kind()),
            Err(ErrorKind::NotFound)
        );
        assert_eq!(
            paywall.subscribe(&ctx(BUYER, 0), CREATOR, 1, 9).map_err(|e| e.kind()),
            Err(ErrorKind::InsufficientFunds)
        );
    }

    #[test]
    fn test_tier_changes_are_creator_only() {
        let paywall = with_tier(10, 100);
        assert_eq!(
            paywall
                .update_tier(&ctx(BUYER, 1), CREATOR, 1, 5, 5)
                .map_err(|e| e.kind()),
            Err(ErrorKind::NotAuthorized)
        );
        assert_eq!(
            paywall
                .deactivate_tier(&ctx(BUYER, 1), CREATOR, 1)
                .map_err(|e| e.kind()),
            Err(ErrorKind::NotAuthorized)
        );
        assert!(paywall.tier(&CREATOR, 1).expect("tier").active);
        assert_eq!(
            paywall
                .update_tier(&ctx(BUYER, 1), BUYER, 1, 5, 5)
                .map_err(|e| e.kind()),
            Err(ErrorKind::NotFound)
        );

        let tier = paywall
            .update_tier(&ctx(CREATOR, 1), CREATOR, 1, 5, 50)
            .expect("update");
        assert_eq!(tier.price, 5);
        assert_eq!(paywall.tier(&CREATOR, 1).expect("tier").duration_ticks, 50);
    }

    #[test]
    fn test_cancel_subscription() {
        let paywall = with_tier(10, 100);
        paywall.subscribe(&ctx(BUYER, 0), CREATOR, 1, 10).expect("sub");
        paywall
            .cancel_subscription(&ctx(BUYER, 10), CREATOR, 1)
            .expect("cancel");
        assert!(!paywall.is_subscribed(&BUYER, &CREATOR, 1, 10));
        assert_eq!(
            paywall
                .cancel_subscription(&ctx(BUYER, 10), CREATOR, 1)
                .map_err(|e| e.kind()),
            Err(ErrorKind::NotFound)
        );
    }
}
