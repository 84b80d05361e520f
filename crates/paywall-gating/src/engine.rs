//! Gating engine.
//!
//! Stores extended-schema rules by content id and evaluates them against an
//! account.
//!
//! ## Rule lifecycle
//!
//! ```text
//! (none) --set--> Active --deactivate--> Deactivated --set--> Active
//!                   |                        |
//!                   +--------delete----------+--> (none)
//! ```
//!
//! A deactivated rule stays readable and always evaluates to `false`.

use std::collections::BTreeMap;

use paywall_types::{AccountId, ContentId, Tick};

use crate::oracle::{NativeBalances, OracleError, TokenOracle};
use crate::rule::{owns, GatingRule, LegacyGatingRule, Requirement, RuleDraft};
use crate::{GatingError, Result};

/// Result of writing a rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleWrite {
    pub rule: GatingRule,
    /// A legacy rule was folded in before the draft was applied.
    pub migrated_legacy: bool,
}

/// Per-id result of a legacy migration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    Migrated,
    /// An extended rule already exists; nothing was written.
    AlreadyMigrated,
}

/// Rule store and evaluator.
#[derive(Clone, Debug, Default)]
pub struct GatingEngine {
    rules: BTreeMap<ContentId, GatingRule>,
}

impl GatingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(&self, content_id: ContentId) -> Option<&GatingRule> {
        self.rules.get(&content_id)
    }

    pub fn has_rule(&self, content_id: ContentId) -> bool {
        self.rules.contains_key(&content_id)
    }

    /// All extended rules ordered by content id.
    pub fn iter(&self) -> impl Iterator<Item = (&ContentId, &GatingRule)> {
        self.rules.iter()
    }

    /// Create or replace the rule for `content_id`.
    ///
    /// If no extended rule exists yet and `legacy` is given, the legacy rule
    /// is converted first so its `created_at` and `access_count` survive.
    /// Nothing is written unless every step succeeds.
    ///
    /// # Errors
    ///
    /// - [`GatingError::InvalidInput`] if the draft violates field limits
    /// - [`GatingError::InvalidGatingKind`] if the legacy rule has an unknown kind
    pub fn set_rule(
        &mut self,
        content_id: ContentId,
        draft: RuleDraft,
        now: Tick,
        legacy: Option<&LegacyGatingRule>,
    ) -> Result<RuleWrite> {
        draft.validate()?;

        let (rule, migrated_legacy) = match (self.rules.get(&content_id), legacy) {
            (Some(existing), _) => {
                let mut rule = existing.clone();
                rule.apply_draft(draft, now);
                (rule, false)
            }
            (None, Some(legacy)) => {
                let mut rule = GatingRule::from_legacy(legacy)?;
                rule.apply_draft(draft, now);
                (rule, true)
            }
            (None, None) => (GatingRule::from_draft(draft, now), false),
        };

        tracing::info!(
            content_id,
            kind = %rule.kind,
            migrated_legacy,
            "gating rule set"
        );
        self.rules.insert(content_id, rule.clone());

        Ok(RuleWrite {
            rule,
            migrated_legacy,
        })
    }

    /// Soft-delete: the rule stays readable but stops granting access.
    ///
    /// # Errors
    ///
    /// - [`GatingError::RuleNotFound`] if absent
    pub fn deactivate(&mut self, content_id: ContentId, now: Tick) -> Result<()> {
        let rule = self
            .rules
            .get_mut(&content_id)
            .ok_or(GatingError::RuleNotFound(content_id))?;
        rule.active = false;
        rule.updated_at = now;
        tracing::info!(content_id, "gating rule deactivated");
        Ok(())
    }

    /// Hard-delete a rule.
    ///
    /// # Errors
    ///
    /// - [`GatingError::RuleNotFound`] if absent
    pub fn delete(&mut self, content_id: ContentId) -> Result<GatingRule> {
        let removed = self
            .rules
            .remove(&content_id)
            .ok_or(GatingError::RuleNotFound(content_id))?;
        tracing::info!(content_id, "gating rule deleted");
        Ok(removed)
    }

    /// Evaluate a rule without touching counters.
    ///
    /// # Errors
    ///
    /// - [`GatingError::RuleNotFound`] if no rule exists
    /// - [`GatingError::CheckFailed`] if the oracle can not answer
    pub fn evaluate(
        &self,
        content_id: ContentId,
        account: &AccountId,
        oracle: &dyn TokenOracle,
        native: &dyn NativeBalances,
    ) -> Result<bool> {
        let rule = self
            .rules
            .get(&content_id)
            .ok_or(GatingError::RuleNotFound(content_id))?;
        if !rule.active {
            return Ok(false);
        }

        let Some(requirement) = rule.requirement() else {
            tracing::debug!(content_id, kind = %rule.kind, "gating rule has no token reference");
            return Ok(false);
        };

        let passed = match requirement {
            Requirement::Native { min_balance } => {
                native.native_balance(account).map_err(check_failed)? >= min_balance
            }
            Requirement::Fungible { token, min_balance } => {
                oracle.balance_of(&token, account).map_err(check_failed)? >= min_balance
            }
            Requirement::NonFungible { token, token_id } => {
                owns(oracle.owner_of(&token, token_id).map_err(check_failed)?, account)
            }
        };

        tracing::debug!(content_id, %account, kind = %rule.kind, passed, "gating rule evaluated");
        Ok(passed)
    }

    /// Evaluate a rule and count the access when it passes.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`](Self::evaluate).
    pub fn check_access(
        &mut self,
        content_id: ContentId,
        account: &AccountId,
        oracle: &dyn TokenOracle,
        native: &dyn NativeBalances,
    ) -> Result<bool> {
        let passed = self.evaluate(content_id, account, oracle, native)?;
        if passed {
            self.record_access(content_id);
        }
        Ok(passed)
    }

    /// Count one passed check against a rule. No-op if the rule is gone.
    pub fn record_access(&mut self, content_id: ContentId) {
        if let Some(rule) = self.rules.get_mut(&content_id) {
            rule.access_count = rule.access_count.saturating_add(1);
        }
    }

    /// Copy a legacy rule into the extended schema unless one already exists.
    ///
    /// # Errors
    ///
    /// - [`GatingError::InvalidGatingKind`] if the legacy kind code is unknown
    pub fn migrate_legacy(
        &mut self,
        content_id: ContentId,
        legacy: &LegacyGatingRule,
    ) -> Result<MigrationOutcome> {
        if self.rules.contains_key(&content_id) {
            return Ok(MigrationOutcome::AlreadyMigrated);
        }
        let rule = GatingRule::from_legacy(legacy)?;
        self.rules.insert(content_id, rule);
        tracing::debug!(content_id, "legacy gating rule migrated");
        Ok(MigrationOutcome::Migrated)
    }
}

fn check_failed(err: OracleError) -> GatingError {
    GatingError::CheckFailed(err.to_string())
}
