//! Schema upgrade coordinator.
//!
//! Moves gating rules from the legacy schema to the extended schema while
//! the system keeps serving access checks.
//!
//! ## State machine
//!
//! ```text
//! Idle --start_upgrade--> InProgress --complete_upgrade--> Idle
//! ```
//!
//! While `InProgress` every rule-mutating operation except the migration
//! batch itself is rejected with [`GatingError::UpgradeInProgress`]. The
//! batch only runs while `InProgress`.
//!
//! ## Partial failure
//!
//! A migration batch never aborts early. Each id either migrates, is
//! skipped because an extended rule already exists, or is tallied as an
//! error and the batch moves on.

use std::collections::BTreeMap;

use paywall_types::{ContentId, ContractRef, EXTENDED_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};

use crate::engine::{GatingEngine, MigrationOutcome};
use crate::rule::LegacyGatingRule;
use crate::{GatingError, Result};

/// The legacy store could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("legacy source {source_ref}: {reason}")]
pub struct LegacyReadError {
    pub source_ref: ContractRef,
    pub reason: String,
}

/// A store of legacy-schema rules, addressed by reference.
pub trait LegacySource: Send {
    /// Read the legacy rule for `content_id`, `Ok(None)` if the store has none.
    fn read_rule(
        &self,
        source_ref: &ContractRef,
        content_id: ContentId,
    ) -> std::result::Result<Option<LegacyGatingRule>, LegacyReadError>;
}

/// In-memory legacy store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLegacySource {
    rules: BTreeMap<(ContractRef, ContentId), LegacyGatingRule>,
    broken: Vec<(ContractRef, ContentId)>,
}

impl InMemoryLegacySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        source_ref: ContractRef,
        content_id: ContentId,
        rule: LegacyGatingRule,
    ) {
        self.rules.insert((source_ref, content_id), rule);
    }

    /// Make reads of one id fail, simulating a corrupt or unreachable entry.
    pub fn break_entry(&mut self, source_ref: ContractRef, content_id: ContentId) {
        self.broken.push((source_ref, content_id));
    }
}

impl LegacySource for InMemoryLegacySource {
    fn read_rule(
        &self,
        source_ref: &ContractRef,
        content_id: ContentId,
    ) -> std::result::Result<Option<LegacyGatingRule>, LegacyReadError> {
        if self.broken.contains(&(*source_ref, content_id)) {
            return Err(LegacyReadError {
                source_ref: *source_ref,
                reason: format!("entry {content_id} unreadable"),
            });
        }
        Ok(self.rules.get(&(*source_ref, content_id)).cloned())
    }
}

/// Process-wide upgrade state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationState {
    pub in_progress: bool,
    pub schema_version: String,
}

impl Default for MigrationState {
    fn default() -> Self {
        Self {
            in_progress: false,
            schema_version: LEGACY_SCHEMA_VERSION.to_string(),
        }
    }
}

/// Outcome counts of one migration batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationTally {
    pub migrated: u32,
    /// Ids that already had an extended rule.
    pub skipped: u32,
    pub errors: u32,
    /// Reason for every errored id, in batch order.
    pub failures: Vec<(ContentId, String)>,
}

impl MigrationTally {
    fn fail(&mut self, content_id: ContentId, reason: String) {
        tracing::warn!(content_id, %reason, "legacy migration: item failed");
        self.errors += 1;
        self.failures.push((content_id, reason));
    }
}

/// Owner of the [`MigrationState`] singleton.
#[derive(Clone, Debug, Default)]
pub struct MigrationCoordinator {
    state: MigrationState,
}

impl MigrationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a given schema version (e.g. restored from config).
    pub fn with_schema_version(schema_version: impl Into<String>) -> Self {
        Self {
            state: MigrationState {
                in_progress: false,
                schema_version: schema_version.into(),
            },
        }
    }

    pub fn state(&self) -> &MigrationState {
        &self.state
    }

    pub fn in_progress(&self) -> bool {
        self.state.in_progress
    }

    /// Guard for rule-mutating operations.
    ///
    /// # Errors
    ///
    /// - [`GatingError::UpgradeInProgress`] while an upgrade runs
    pub fn ensure_idle(&self) -> Result<()> {
        if self.state.in_progress {
            return Err(GatingError::UpgradeInProgress);
        }
        Ok(())
    }

    /// Guard for migration-only operations.
    ///
    /// # Errors
    ///
    /// - [`GatingError::NotInProgress`] while idle
    pub fn ensure_in_progress(&self) -> Result<()> {
        if !self.state.in_progress {
            return Err(GatingError::NotInProgress);
        }
        Ok(())
    }

    /// `Idle → InProgress`. Returns the schema version being upgraded from.
    ///
    /// # Errors
    ///
    /// - [`GatingError::UpgradeInProgress`] if already in progress
    pub fn start_upgrade(&mut self) -> Result<String> {
        self.ensure_idle()?;
        self.state.in_progress = true;
        tracing::info!(from = %self.state.schema_version, "schema upgrade started");
        Ok(self.state.schema_version.clone())
    }

    /// `InProgress → Idle`, stamping the extended schema version.
    ///
    /// # Errors
    ///
    /// - [`GatingError::NotInProgress`] if idle
    pub fn complete_upgrade(&mut self) -> Result<String> {
        self.ensure_in_progress()?;
        self.state.in_progress = false;
        self.state.schema_version = EXTENDED_SCHEMA_VERSION.to_string();
        tracing::info!(schema_version = %self.state.schema_version, "schema upgrade completed");
        Ok(self.state.schema_version.clone())
    }

    /// Copy legacy rules for `content_ids` from `source_ref` into `engine`.
    ///
    /// # Errors
    ///
    /// - [`GatingError::NotInProgress`] if no upgrade is running. Per-item
    ///   failures are reported in the tally, never as an error.
    pub fn migrate_from_legacy(
        &self,
        engine: &mut GatingEngine,
        source: &dyn LegacySource,
        source_ref: &ContractRef,
        content_ids: &[ContentId],
    ) -> Result<MigrationTally> {
        self.ensure_in_progress()?;

        let mut tally = MigrationTally::default();
        for &content_id in content_ids {
            // Checked before reading so a re-run never touches the source.
            if engine.has_rule(content_id) {
                tally.skipped += 1;
                continue;
            }

            let legacy = match source.read_rule(source_ref, content_id) {
                Ok(Some(legacy)) => legacy,
                Ok(None) => {
                    tally.fail(content_id, "no legacy rule".to_string());
                    continue;
                }
                Err(e) => {
                    tally.fail(content_id, e.to_string());
                    continue;
                }
            };

            match engine.migrate_legacy(content_id, &legacy) {
                Ok(MigrationOutcome::Migrated) => tally.migrated += 1,
                Ok(MigrationOutcome::AlreadyMigrated) => tally.skipped += 1,
                Err(e) => tally.fail(content_id, e.to_string()),
            }
        }

        tracing::info!(
            source = %source_ref,
            migrated = tally.migrated,
            skipped = tally.skipped,
            errors = tally.errors,
            "legacy migration batch finished"
        );
        Ok(tally)
    }
}
