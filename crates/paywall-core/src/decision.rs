//! Combined access decision.
//!
//! Paths are consulted in a fixed order and the first that grants wins:
//!
//! 1. Pay-per-view grant
//! 2. Content creator
//! 3. Unexpired subscription to any tier of the creator
//! 4. Gating rule
//!
//! Only the gating path calls out to the oracle, so cheap local paths
//! short-circuit it.

use paywall_types::events::PaywallEvent;
use paywall_types::{AccessMethod, AccountId, ContentId};
use serde::{Deserialize, Serialize};

use crate::treasury::TreasuryBalances;
use crate::{CallContext, Paywall, Result};

/// Outcome of [`Paywall::decide_access`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub granted: bool,
    /// The path that granted access; `None` when denied.
    pub method: Option<AccessMethod>,
}

impl AccessDecision {
    pub fn granted(method: AccessMethod) -> Self {
        Self {
            granted: true,
            method: Some(method),
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: false,
            method: None,
        }
    }
}

impl Paywall {
    /// Decide whether `account` may access `content_id` right now.
    ///
    /// A granted decision is counted in the analytics read model and
    /// announced with [`PaywallEvent::AccessGranted`]. Content that no longer
    /// exists can still be reached through an existing grant or gating rule.
    ///
    /// # Errors
    ///
    /// - `GatingCheckFailed` if the gating path is reached and the oracle
    ///   can not answer
    pub fn decide_access(
        &self,
        ctx: &CallContext,
        content_id: ContentId,
        account: &AccountId,
    ) -> Result<AccessDecision> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let creator = state.registry.creator_of(content_id);

        let mut method = if state.access.has_grant(content_id, account) {
            Some(AccessMethod::Purchase)
        } else if creator.as_ref() == Some(account) {
            Some(AccessMethod::Creator)
        } else {
            creator.and_then(|creator| {
                state
                    .subscriptions
                    .active_tier_for(account, &creator, ctx.now)
                    .map(|tier_id| AccessMethod::Subscription { creator, tier_id })
            })
        };

        if method.is_none() {
            if let Some(kind) = state.gating.rule(content_id).map(|r| r.kind) {
                let native = TreasuryBalances(state.treasury.as_ref());
                if state
                    .gating
                    .check_access(content_id, account, state.oracle.as_ref(), &native)?
                {
                    method = Some(AccessMethod::Gated { kind });
                }
            }
        }

        let Some(method) = method else {
            tracing::debug!(content_id, %account, "access denied");
            return Ok(AccessDecision::denied());
        };

        state.analytics.record(content_id, account, ctx.now, 0);
        tracing::debug!(content_id, %account, method = method.tag(), "access granted");
        self.events.emit(
            ctx.now,
            PaywallEvent::AccessGranted {
                content_id,
                account: *account,
                method,
            },
        );
        Ok(AccessDecision::granted(method))
    }
}
