//! Content registry and pay-per-view operations.

use paywall_fees::FeeSplit;
use paywall_ledger::access::{AccessGrant, RepeatPolicy};
use paywall_ledger::ensure_tendered;
use paywall_ledger::registry::Content;
use paywall_types::events::PaywallEvent;
use paywall_types::{AccountId, ContentId};
use serde::{Deserialize, Serialize};

use crate::treasury::{execute_transfers, TransferLeg, TreasuryBalances};
use crate::{CallContext, Paywall, PaywallError, Result, State};

/// What a successful purchase charged and recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub content_id: ContentId,
    pub buyer: AccountId,
    pub price: u128,
    pub split: FeeSplit,
    pub grant: AccessGrant,
}

impl Paywall {
    /// Register a content item.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the locator exceeds 256 bytes
    /// - `NotAuthorized` unless the caller is `creator` or the platform owner
    /// - `AlreadyExists` if the id is taken
    pub fn add_content(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
        price: u128,
        creator: AccountId,
        locator: &str,
    ) -> Result<Content> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let content = state
            .registry
            .add(&ctx.caller, &state.owner, content_id, price, creator, locator)?
            .clone();

        self.events.emit(
            ctx.now,
            PaywallEvent::ContentAdded {
                content_id,
                creator,
                price,
            },
        );
        Ok(content)
    }

    /// Change a content item's price. Returns the previous price.
    ///
    /// # Errors
    ///
    /// - `NotFound` if absent
    /// - `NotAuthorized` unless the caller is the creator
    pub fn update_content_price(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
        new_price: u128,
    ) -> Result<u128> {
        let old_price = self
            .lock()
            .registry
            .update_price(&ctx.caller, content_id, new_price)?;

        self.events.emit(
            ctx.now,
            PaywallEvent::ContentPriceUpdated {
                content_id,
                old_price,
                new_price,
            },
        );
        Ok(old_price)
    }

    /// Remove a content item's pricing. Existing grants stay valid.
    ///
    /// # Errors
    ///
    /// - `NotFound` if absent
    /// - `NotAuthorized` unless the caller is the creator or the platform owner
    pub fn remove_content(&self, ctx: &CallContext, content_id: ContentId) -> Result<Content> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let removed = state.registry.remove(&ctx.caller, &state.owner, content_id)?;

        self.events.emit(
            ctx.now,
            PaywallEvent::ContentRemoved {
                content_id,
                removed_by: ctx.caller,
            },
        );
        Ok(removed)
    }

    /// Look up a content item.
    ///
    /// # Errors
    ///
    /// - `NotFound` if absent
    pub fn get_content(&self, content_id: ContentId) -> Result<Content> {
        Ok(self.lock().registry.get(content_id)?.clone())
    }

    /// Buy pay-per-view access as the caller.
    ///
    /// Exactly the price is charged, split between the fee account and the
    /// creator; any excess tendered is not taken.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the content is absent
    /// - `AlreadyPurchased` if the caller already holds a grant
    /// - `InsufficientFunds` if `tendered` is below the price
    /// - `TransferFailed` if the treasury rejects a leg; nothing is written
    pub fn purchase(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
        tendered: u128,
    ) -> Result<PurchaseReceipt> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let receipt = pay_and_grant(state, ctx, content_id, tendered, RepeatPolicy::Reject)?;
        self.emit_purchase(ctx, &receipt);
        Ok(receipt)
    }

    /// Buy access through a gating rule the caller satisfies.
    ///
    /// The only path on which a repeat purchase is allowed: an existing
    /// grant keeps its `granted_at` and its purchase count is incremented.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the content or its gating rule is absent
    /// - `NotEligible` if the caller does not satisfy the rule
    /// - `GatingCheckFailed` if the oracle can not answer
    /// - `InsufficientFunds`, `TransferFailed` as for [`purchase`](Self::purchase)
    pub fn purchase_gated(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
        tendered: u128,
    ) -> Result<PurchaseReceipt> {
        let mut guard = self.lock();
        let state = &mut *guard;

        state.registry.get(content_id)?;
        let passed = state.gating.evaluate(
            content_id,
            &ctx.caller,
            state.oracle.as_ref(),
            &TreasuryBalances(state.treasury.as_ref()),
        )?;
        if !passed {
            return Err(PaywallError::NotEligible(format!(
                "{} does not satisfy the gating rule of content {content_id}",
                ctx.caller
            )));
        }

        let receipt = pay_and_grant(state, ctx, content_id, tendered, RepeatPolicy::Increment)?;
        state.gating.record_access(content_id);
        self.emit_purchase(ctx, &receipt);
        Ok(receipt)
    }

    /// `true` if `account` holds a grant for or created `content_id`.
    pub fn has_access(&self, content_id: ContentId, account: &AccountId) -> bool {
        let state = self.lock();
        state.access.has_grant(content_id, account)
            || state.registry.creator_of(content_id).as_ref() == Some(account)
    }

    /// Revoke `account`'s grant inside the refund window.
    ///
    /// Only access is revoked. No funds move back to the buyer.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the content or the grant is absent
    /// - `NotAuthorized` unless the caller is the content's creator
    /// - `NotEligible` if the refund window has elapsed
    pub fn refund(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
        account: &AccountId,
    ) -> Result<AccessGrant> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let creator = state.registry.get(content_id)?.creator;
        if creator != ctx.caller {
            return Err(PaywallError::NotAuthorized(
                "only the creator may refund".to_string(),
            ));
        }
        let grant = state
            .access
            .refund(content_id, account, ctx.now, state.refund_window)?;

        self.events.emit(
            ctx.now,
            PaywallEvent::AccessRefunded {
                content_id,
                account: *account,
            },
        );
        Ok(grant)
    }

    fn emit_purchase(&self, ctx: &CallContext, receipt: &PurchaseReceipt) {
        self.events.emit(
            ctx.now,
            PaywallEvent::AccessPurchased {
                content_id: receipt.content_id,
                buyer: receipt.buyer,
                price: receipt.price,
                fee: receipt.split.fee,
                payout: receipt.split.payout,
                purchase_count: receipt.grant.purchase_count,
            },
        );
    }
}

/// Plan, pay, then commit a purchase by `ctx.caller`.
fn pay_and_grant(
    state: &mut State,
    ctx: &CallContext,
    content_id: ContentId,
    tendered: u128,
    policy: RepeatPolicy,
) -> Result<PurchaseReceipt> {
    let content = state.registry.get(content_id)?;
    let (price, creator) = (content.price, content.creator);
    let buyer = ctx.caller;

    let grant = state
        .access
        .plan_purchase(content_id, &buyer, ctx.now, policy)?;
    ensure_tendered(price, tendered)?;
    let split = state.fees.split(price);

    execute_transfers(
        state.treasury.as_mut(),
        &[
            TransferLeg {
                amount: split.fee,
                from: buyer,
                to: state.fee_account,
            },
            TransferLeg {
                amount: split.payout,
                from: buyer,
                to: creator,
            },
        ],
    )?;

    state.access.commit_purchase(content_id, buyer, grant);
    state.analytics.record(content_id, &buyer, ctx.now, price);

    tracing::info!(
        content_id,
        %buyer,
        price,
        fee = split.fee,
        payout = split.payout,
        "content purchased"
    );

    Ok(PurchaseReceipt {
        content_id,
        buyer,
        price,
        split,
        grant,
    })
}

#[cfg(test)]
mod tests {
    use paywall_gating::migration::InMemoryLegacySource;
    use paywall_gating::oracle::StubOracle;
    use paywall_gating::rule::RuleDraft;

    use super::*;
    use crate::testutil::*;
    use crate::{ErrorKind, InMemoryTreasury};

    const STRANGER: AccountId = AccountId::new([0x55; 32]);

    fn with_content(price: u128) -> Paywall {
        let paywall = service();
        paywall
            .add_content(&ctx(CREATOR, 1), 1, price, CREATOR, "ipfs://item")
            .expect("add");
        paywall
    }

    #[test]
    fn test_add_content_rules() {
        let paywall = service();
        let err = paywall
            .add_content(&ctx(STRANGER, 1), 1, 10, CREATOR, "x")
            .expect_err("stranger");
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);

        paywall
            .add_content(&ctx(OWNER, 1), 1, 10, CREATOR, "x")
            .expect("owner on behalf");
        let err = paywall
            .add_content(&ctx(CREATOR, 1), 1, 10, CREATOR, "x")
            .expect_err("dup");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let err = paywall
            .add_content(&ctx(CREATOR, 1), 2, 10, CREATOR, &"l".repeat(257))
            .expect_err("long locator");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_update_price_creator_only() {
        let paywall = with_content(100);
        let err = paywall
            .update_content_price(&ctx(OWNER, 2), 1, 5)
            .expect_err("owner");
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
        assert_eq!(paywall.update_content_price(&ctx(CREATOR, 2), 1, 5), Ok(100));
        assert_eq!(paywall.get_content(1).expect("get").price, 5);
        assert_eq!(
            paywall.update_content_price(&ctx(CREATOR, 2), 9, 5).map_err(|e| e.kind()),
            Err(ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_purchase_splits_and_grants() {
        let paywall = with_content(1_000_000);
        let receipt = paywall
            .purchase(&ctx(BUYER, 10), 1, 2_000_000)
            .expect("purchase");
        assert_eq!(receipt.split.fee, 25_000);
        assert_eq!(receipt.split.payout, 975_000);
        assert_eq!(receipt.grant.granted_at, 10);
        assert!(paywall.has_access(1, &BUYER));
        assert_eq!(paywall.native_balance(&BUYER), Ok(9_000_000));
        assert_eq!(paywall.native_balance(&FEES), Ok(25_000));
        assert_eq!(paywall.native_balance(&CREATOR), Ok(975_000));

        let analytics = paywall.content_analytics(1).expect("analytics");
        assert_eq!(analytics.revenue_generated, 1_000_000);
        assert_eq!(analytics.total_access, 1);
    }

    #[test]
    fn test_purchase_error_order() {
        let paywall = with_content(100);
        assert_eq!(
            paywall.purchase(&ctx(BUYER, 2), 7, 100).map_err(|e| e.kind()),
            Err(ErrorKind::NotFound)
        );
        assert_eq!(
            paywall.purchase(&ctx(BUYER, 2), 1, 99).map_err(|e| e.kind()),
            Err(ErrorKind::InsufficientFunds)
        );
        paywall.purchase(&ctx(BUYER, 2), 1, 100).expect("first");
        assert_eq!(
            paywall.purchase(&ctx(BUYER, 3), 1, 100).map_err(|e| e.kind()),
            Err(ErrorKind::AlreadyPurchased)
        );
    }

    #[test]
    fn test_failed_payout_leaves_no_trace() {
        let mut treasury = InMemoryTreasury::new().with_balance(BUYER, 1_000);
        treasury.freeze(CREATOR);
        let paywall = service_with(treasury, StubOracle::new(), InMemoryLegacySource::new());
        paywall
            .add_content(&ctx(CREATOR, 1), 1, 1_000, CREATOR, "x")
            .expect("add");

        let err = paywall.purchase(&ctx(BUYER, 2), 1, 1_000).expect_err("frozen");
        assert_eq!(err.kind(), ErrorKind::TransferFailed);
        assert!(!paywall.has_access(1, &BUYER));
        assert!(paywall.grant(1, &BUYER).is_none());
        assert!(paywall.content_analytics(1).is_none());
        assert_eq!(paywall.native_balance(&BUYER), Ok(1_000));
        assert_eq!(paywall.native_balance(&FEES), Ok(0));
    }

    #[test]
    fn test_creator_has_access() {
        let paywall = with_content(100);
        assert!(paywall.has_access(1, &CREATOR));
        assert!(!paywall.has_access(1, &STRANGER));
    }

    #[test]
    fn test_grant_survives_content_removal() {
        let paywall = with_content(100);
        paywall.purchase(&ctx(BUYER, 2), 1, 100).expect("buy");
        paywall.remove_content(&ctx(OWNER, 3), 1).expect("remove");
        assert!(paywall.has_access(1, &BUYER));
        assert_eq!(
            paywall.get_content(1).map_err(|e| e.kind()),
            Err(ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_refund_window() {
        let paywall = with_content(100);
        paywall.purchase(&ctx(BUYER, 100), 1, 100).expect("buy");

        assert_eq!(
            paywall.refund(&ctx(STRANGER, 101), 1, &BUYER).map_err(|e| e.kind()),
            Err(ErrorKind::NotAuthorized)
        );
        assert_eq!(
            paywall
                .refund(&ctx(CREATOR, 100 + 7_201), 1, &BUYER)
                .map_err(|e| e.kind()),
            Err(ErrorKind::NotEligible)
        );
        paywall
            .refund(&ctx(CREATOR, 100 + 7_200), 1, &BUYER)
            .expect("inside window");
        assert!(!paywall.has_access(1, &BUYER));
        assert_eq!(
            paywall.refund(&ctx(CREATOR, 200), 1, &BUYER).map_err(|e| e.kind()),
            Err(ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_purchase_gated_allows_repeat() {
        let mut oracle = StubOracle::new();
        let token = paywall_types::ContractRef::new([0x70; 32]);
        oracle.set_balance(token, BUYER, 50);
        let paywall = service_with(
            InMemoryTreasury::new().with_balance(BUYER, 1_000),
            oracle,
            InMemoryLegacySource::new(),
        );
        paywall
            .add_content(&ctx(CREATOR, 1), 1, 100, CREATOR, "x")
            .expect("add");
        paywall
            .set_gating_rule(&ctx(CREATOR, 1), 1, RuleDraft::fungible(token, 10))
            .expect("rule");

        let first = paywall.purchase_gated(&ctx(BUYER, 5), 1, 100).expect("first");
        let second = paywall.purchase_gated(&ctx(BUYER, 9), 1, 100).expect("second");
        assert_eq!(first.grant.purchase_count, 1);
        assert_eq!(second.grant.purchase_count, 2);
        assert_eq!(second.grant.granted_at, 5);
        assert_eq!(paywall.gating_rule(1).expect("rule").access_count, 2);
        assert_eq!(paywall.native_balance(&BUYER), Ok(800));

        assert_eq!(
            paywall.purchase(&ctx(BUYER, 10), 1, 100).map_err(|e| e.kind()),
            Err(ErrorKind::AlreadyPurchased)
        );
    }

    #[test]
    fn test_purchase_gated_requires_rule_pass() {
        let paywall = with_content(100);
        paywall
            .set_gating_rule(&ctx(CREATOR, 1), 1, RuleDraft::native(1_000_000_000))
            .expect("rule");
        assert_eq!(
            paywall.purchase_gated(&ctx(BUYER, 2), 1, 100).map_err(|e| e.kind()),
            Err(ErrorKind::NotEligible)
        );
        assert!(paywall.grant(1, &BUYER).is_none());
    }
}
