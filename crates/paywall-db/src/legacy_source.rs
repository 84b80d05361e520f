//! [`LegacySource`] backed by a SQLite legacy rule table.

use std::path::Path;

use paywall_gating::migration::{LegacyReadError, LegacySource};
use paywall_gating::rule::LegacyGatingRule;
use paywall_types::{ContentId, ContractRef};
use rusqlite::Connection;

use crate::queries::legacy_rules;
use crate::Result;

/// Reads legacy rules from `legacy_gating_rules`.
#[derive(Debug)]
pub struct SqliteLegacySource {
    conn: Connection,
}

impl SqliteLegacySource {
    /// Open a legacy database file, upgrading its schema if needed.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: crate::open(path)?,
        })
    }

    /// Wrap an already configured and migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Content ids stored under `source_ref`.
    pub fn content_ids(&self, source_ref: &ContractRef) -> Result<Vec<ContentId>> {
        legacy_rules::list_ids(&self.conn, source_ref)
    }
}

impl LegacySource for SqliteLegacySource {
    fn read_rule(
        &self,
        source_ref: &ContractRef,
        content_id: ContentId,
    ) -> std::result::Result<Option<LegacyGatingRule>, LegacyReadError> {
        legacy_rules::get(&self.conn, source_ref, content_id).map_err(|e| {
            tracing::warn!(source = %source_ref, content_id, error = %e, "legacy rule read failed");
            LegacyReadError {
                source_ref: *source_ref,
                reason: e.to_string(),
            }
        })
    }
}
