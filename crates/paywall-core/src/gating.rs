//! Gating rule operations.

use paywall_gating::rule::{GatingRule, RuleDraft};
use paywall_gating::GatingError;
use paywall_types::events::PaywallEvent;
use paywall_types::{AccessMethod, AccountId, ContentId, ContractRef, GatingKind};

use crate::treasury::TreasuryBalances;
use crate::{CallContext, Paywall, PaywallError, Result, State};

impl Paywall {
    /// Create or replace the gating rule of a content item.
    ///
    /// If no extended rule exists and a legacy store is configured, the
    /// legacy rule for the same id is folded in first so its history
    /// survives.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the content is absent
    /// - `NotAuthorized` unless the caller is the content's creator
    /// - `UpgradeInProgress` while a schema upgrade runs
    /// - `LegacyUnavailable` if the legacy store can not be read
    /// - `InvalidGatingKind` if a legacy rule carries an unknown kind
    /// - `InvalidInput` if category or tags exceed their limits
    pub fn set_gating_rule(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
        draft: RuleDraft,
    ) -> Result<GatingRule> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let creator = state.registry.get(content_id)?.creator;
        if creator != ctx.caller {
            return Err(PaywallError::NotAuthorized(
                "only the creator may set gating rules".to_string(),
            ));
        }
        ensure_rules_writable(state, content_id)?;

        let legacy = match state.legacy_source {
            Some(source_ref) if !state.gating.has_rule(content_id) => state
                .legacy
                .read_rule(&source_ref, content_id)
                .map_err(|e| GatingError::LegacyRead(e.to_string()))?,
            _ => None,
        };

        let write = state
            .gating
            .set_rule(content_id, draft, ctx.now, legacy.as_ref())?;

        self.events.emit(
            ctx.now,
            PaywallEvent::GatingRuleSet {
                content_id,
                kind: write.rule.kind,
                migrated_legacy: write.migrated_legacy,
            },
        );
        Ok(write.rule)
    }

    /// [`set_gating_rule`](Self::set_gating_rule) taking the raw kind code
    /// used on the wire (0 = FT, 1 = NFT, 2 = NATIVE).
    ///
    /// # Errors
    ///
    /// - `InvalidGatingKind` if `kind_code` is unknown
    /// - Otherwise as [`set_gating_rule`](Self::set_gating_rule)
    #[allow(clippy::too_many_arguments)]
    pub fn set_gating_rule_coded(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
        token_ref: Option<ContractRef>,
        threshold: u128,
        kind_code: u8,
        category: Option<String>,
        tags: Vec<String>,
    ) -> Result<GatingRule> {
        let kind = GatingKind::try_from(kind_code).map_err(GatingError::from)?;
        self.set_gating_rule(
            ctx,
            content_id,
            RuleDraft {
                token_ref,
                threshold,
                kind,
                category,
                tags,
            },
        )
    }

    /// Soft-delete a rule; it stays readable but stops granting.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is the creator or the platform owner
    /// - `UpgradeInProgress` while a schema upgrade runs
    /// - `NotFound` if no rule exists
    pub fn deactivate_gating_rule(&self, ctx: &CallContext, content_id: ContentId) -> Result<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        ensure_rule_admin(state, &ctx.caller, content_id)?;
        ensure_rules_writable(state, content_id)?;
        state.gating.deactivate(content_id, ctx.now)?;

        self.events
            .emit(ctx.now, PaywallEvent::GatingRuleDeactivated { content_id });
        Ok(())
    }

    /// Remove a rule entirely.
    ///
    /// # Errors
    ///
    /// Same as [`deactivate_gating_rule`](Self::deactivate_gating_rule).
    pub fn delete_gating_rule(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
    ) -> Result<GatingRule> {
        let mut guard = self.lock();
        let state = &mut *guard;
        ensure_rule_admin(state, &ctx.caller, content_id)?;
        ensure_rules_writable(state, content_id)?;
        let removed = state.gating.delete(content_id)?;

        self.events
            .emit(ctx.now, PaywallEvent::GatingRuleDeleted { content_id });
        Ok(removed)
    }

    /// Evaluate the gating rule of `content_id` for `account`.
    ///
    /// A pass increments the rule's access count and the analytics read
    /// model. Allowed while a schema upgrade runs.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no rule exists
    /// - `GatingCheckFailed` if the oracle can not answer
    pub fn check_access(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
        account: &AccountId,
    ) -> Result<bool> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let native = TreasuryBalances(state.treasury.as_ref());
        let passed = state
            .gating
            .check_access(content_id, account, state.oracle.as_ref(), &native)?;
        if !passed {
            return Ok(false);
        }

        let kind = state
            .gating
            .rule(content_id)
            .map(|r| r.kind)
            .ok_or(GatingError::RuleNotFound(content_id))?;
        state.analytics.record(content_id, account, ctx.now, 0);
        self.events.emit(
            ctx.now,
            PaywallEvent::AccessGranted {
                content_id,
                account: *account,
                method: AccessMethod::Gated { kind },
            },
        );
        Ok(true)
    }

    /// Current rule of a content item.
    pub fn gating_rule(&self, content_id: ContentId) -> Option<GatingRule> {
        self.lock().gating.rule(content_id).cloned()
    }

    /// Snapshot of every extended rule ordered by content id.
    pub fn gating_rules(&self) -> Vec<(ContentId, GatingRule)> {
        self.lock()
            .gating
            .iter()
            .map(|(id, rule)| (*id, rule.clone()))
            .collect()
    }
}

/// Creator of the content, or the platform owner. Rules of removed content
/// are owner-only.
fn ensure_rule_admin(state: &State, caller: &AccountId, content_id: ContentId) -> Result<()> {
    let is_creator = state.registry.creator_of(content_id).as_ref() == Some(caller);
    if !is_creator && caller != &state.owner {
        return Err(PaywallError::NotAuthorized(
            "only the creator or platform owner may change this rule".to_string(),
        ));
    }
    Ok(())
}

fn ensure_rules_writable(state: &State, content_id: ContentId) -> Result<()> {
    state.migration.ensure_idle().map_err(|e| {
        tracing::warn!(content_id, "gating rule change rejected during upgrade");
        PaywallError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use paywall_gating::migration::InMemoryLegacySource;
    use paywall_gating::oracle::StubOracle;
    use paywall_gating::rule::LegacyGatingRule;

    use super::*;
    use crate::testutil::*;
    use crate::{ErrorKind, InMemoryTreasury};

    const TOKEN: ContractRef = ContractRef::new([0x70; 32]);

    fn with_content(paywall: Paywall) -> Paywall {
        paywall
            .add_content(&ctx(CREATOR, 1), 1, 100, CREATOR, "x")
            .expect("add");
        paywall
    }

    #[test]
    fn test_set_rule_auth_and_existence() {
        let paywall = with_content(service());
        assert_eq!(
            paywall
                .set_gating_rule(&ctx(CREATOR, 2), 9, RuleDraft::native(0))
                .map_err(|e| e.kind()),
            Err(ErrorKind::NotFound)
        );
        assert_eq!(
            paywall
                .set_gating_rule(&ctx(OWNER, 2), 1, RuleDraft::native(0))
                .map_err(|e| e.kind()),
            Err(ErrorKind::NotAuthorized)
        );
        paywall
            .set_gating_rule(&ctx(CREATOR, 2), 1, RuleDraft::native(0))
            .expect("creator");
    }

    #[test]
    fn test_coded_kind_rejected() {
        let paywall = with_content(service());
        let err = paywall
            .set_gating_rule_coded(&ctx(CREATOR, 2), 1, None, 0, 3, None, Vec::new())
            .expect_err("kind 3");
        assert_eq!(err.kind(), ErrorKind::InvalidGatingKind);
        assert!(paywall.gating_rule(1).is_none());

        let rule = paywall
            .set_gating_rule_coded(&ctx(CREATOR, 2), 1, Some(TOKEN), 4, 1, None, Vec::new())
            .expect("nft");
        assert_eq!(rule.kind, GatingKind::Nft);
    }

    #[test]
    fn test_native_zero_grants_everyone() {
        let paywall = with_content(service());
        paywall
            .set_gating_rule(&ctx(CREATOR, 2), 1, RuleDraft::native(0))
            .expect("rule");
        let stranger = AccountId::new([0x99; 32]);
        assert_eq!(paywall.check_access(&ctx(stranger, 3), 1, &stranger), Ok(true));
        assert_eq!(paywall.check_access(&ctx(BUYER, 3), 1, &BUYER), Ok(true));
        assert_eq!(paywall.gating_rule(1).expect("rule").access_count, 2);
        assert_eq!(paywall.content_analytics(1).expect("analytics").total_access, 2);
    }

    #[test]
    fn test_rule_mutations_blocked_during_upgrade() {
        let paywall = with_content(service());
        paywall
            .set_gating_rule(&ctx(CREATOR, 2), 1, RuleDraft::native(0))
            .expect("rule");
        paywall.start_upgrade(&ctx(OWNER, 3)).expect("start");

        for result in [
            paywall
                .set_gating_rule(&ctx(CREATOR, 4), 1, RuleDraft::native(5))
                .map(|_| ()),
            paywall.deactivate_gating_rule(&ctx(CREATOR, 4), 1),
            paywall.delete_gating_rule(&ctx(CREATOR, 4), 1).map(|_| ()),
        ] {
            assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::UpgradeInProgress));
        }
        assert_eq!(paywall.gating_rule(1).expect("rule").threshold, 0);
        assert_eq!(paywall.check_access(&ctx(BUYER, 4), 1, &BUYER), Ok(true));
    }

    #[test]
    fn test_deactivate_and_delete() {
        let paywall = with_content(service());
        paywall
            .set_gating_rule(&ctx(CREATOR, 2), 1, RuleDraft::native(0))
            .expect("rule");

        assert_eq!(
            paywall
                .deactivate_gating_rule(&ctx(BUYER, 3), 1)
                .map_err(|e| e.kind()),
            Err(ErrorKind::NotAuthorized)
        );
        paywall.deactivate_gating_rule(&ctx(OWNER, 3), 1).expect("owner");
        assert_eq!(paywall.check_access(&ctx(BUYER, 4), 1, &BUYER), Ok(false));

        paywall.delete_gating_rule(&ctx(CREATOR, 5), 1).expect("delete");
        assert_eq!(
            paywall.check_access(&ctx(BUYER, 6), 1, &BUYER).map_err(|e| e.kind()),
            Err(ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_oracle_failure_surfaces() {
        let mut oracle = StubOracle::new();
        oracle.mark_unreachable(TOKEN);
        let paywall = with_content(service_with(
            InMemoryTreasury::new(),
            oracle,
            InMemoryLegacySource::new(),
        ));
        paywall
            .set_gating_rule(&ctx(CREATOR, 2), 1, RuleDraft::fungible(TOKEN, 1))
            .expect("rule");
        assert_eq!(
            paywall.check_access(&ctx(BUYER, 3), 1, &BUYER).map_err(|e| e.kind()),
            Err(ErrorKind::GatingCheckFailed)
        );
    }

    #[test]
    fn test_set_rule_folds_in_legacy() {
        let mut legacy = InMemoryLegacySource::new();
        legacy.insert(
            LEGACY,
            1,
            LegacyGatingRule {
                token_ref: None,
                threshold: 5,
                kind_code: GatingKind::Native.code(),
                created_at: 0,
                updated_at: 0,
                access_count: 41,
            },
        );
        let paywall =
            with_content(service_with(InMemoryTreasury::new(), StubOracle::new(), legacy));

        let rule = paywall
            .set_gating_rule(
                &ctx(CREATOR, 9),
                1,
                RuleDraft::native(7).with_category("music"),
            )
            .expect("rule");
        assert_eq!(rule.access_count, 41);
        assert_eq!(rule.created_at, 0);
        assert_eq!(rule.threshold, 7);
        assert_eq!(rule.category.as_deref(), Some("music"));
    }

    #[test]
    fn test_unreadable_legacy_fails_set() {
        let mut legacy = InMemoryLegacySource::new();
        legacy.break_entry(LEGACY, 1);
        let paywall =
            with_content(service_with(InMemoryTreasury::new(), StubOracle::new(), legacy));
        assert_eq!(
            paywall
                .set_gating_rule(&ctx(CREATOR, 2), 1, RuleDraft::native(0))
                .map_err(|e| e.kind()),
            Err(ErrorKind::LegacyUnavailable)
        );
        assert!(paywall.gating_rule(1).is_none());
    }
}
