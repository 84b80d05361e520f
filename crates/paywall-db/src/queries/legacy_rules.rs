//! Legacy gating rule query functions.

use paywall_gating::rule::LegacyGatingRule;
use paywall_types::{ContentId, ContractRef};
use rusqlite::{Connection, OptionalExtension};

use super::{amount_from_sql, amount_to_sql, contract_from_sql};
use crate::{DbError, Result};

/// Insert or replace a legacy rule.
pub fn insert(
    conn: &Connection,
    source_ref: &ContractRef,
    content_id: ContentId,
    rule: &LegacyGatingRule,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO legacy_gating_rules
         (source_ref, content_id, token_ref, threshold, kind, created_at, updated_at, access_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            source_ref.as_bytes().as_slice(),
            content_id as i64,
            rule.token_ref.as_ref().map(|t| t.as_bytes().to_vec()),
            amount_to_sql(rule.threshold),
            rule.kind_code as i64,
            rule.created_at as i64,
            rule.updated_at as i64,
            rule.access_count as i64,
        ],
    )?;
    Ok(())
}

/// Insert a row with a raw kind code, bypassing the `u8` range of
/// [`LegacyGatingRule::kind_code`]. Old clients wrote arbitrary integers.
pub fn insert_raw_kind(
    conn: &Connection,
    source_ref: &ContractRef,
    content_id: ContentId,
    threshold: u128,
    kind: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO legacy_gating_rules
         (source_ref, content_id, token_ref, threshold, kind, created_at, updated_at, access_count)
         VALUES (?1, ?2, NULL, ?3, ?4, 0, 0, 0)",
        rusqlite::params![
            source_ref.as_bytes().as_slice(),
            content_id as i64,
            amount_to_sql(threshold),
            kind,
        ],
    )?;
    Ok(())
}

/// Fetch one legacy rule.
pub fn get(
    conn: &Connection,
    source_ref: &ContractRef,
    content_id: ContentId,
) -> Result<Option<LegacyGatingRule>> {
    let raw = conn
        .query_row(
            "SELECT token_ref, threshold, kind, created_at, updated_at, access_count
             FROM legacy_gating_rules
             WHERE source_ref = ?1 AND content_id = ?2",
            rusqlite::params![source_ref.as_bytes().as_slice(), content_id as i64],
            |row| {
                Ok(LegacyRow {
                    token_ref: row.get(0)?,
                    threshold: row.get(1)?,
                    kind: row.get(2)?,
                    created_at: row.get::<_, i64>(3)? as u64,
                    updated_at: row.get::<_, i64>(4)? as u64,
                    access_count: row.get::<_, i64>(5)? as u64,
                })
            },
        )
        .optional()?;

    raw.map(LegacyRow::into_rule).transpose()
}

/// Content ids stored under `source_ref`, ascending.
pub fn list_ids(conn: &Connection, source_ref: &ContractRef) -> Result<Vec<ContentId>> {
    let mut stmt = conn.prepare(
        "SELECT content_id FROM legacy_gating_rules
         WHERE source_ref = ?1
         ORDER BY content_id",
    )?;
    let ids = stmt
        .query_map([source_ref.as_bytes().as_slice()], |row| {
            Ok(row.get::<_, i64>(0)? as u64)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// A raw legacy row before field decoding.
#[derive(Debug)]
struct LegacyRow {
    token_ref: Option<Vec<u8>>,
    threshold: String,
    kind: i64,
    created_at: u64,
    updated_at: u64,
    access_count: u64,
}

impl LegacyRow {
    fn into_rule(self) -> Result<LegacyGatingRule> {
        let kind_code = u8::try_from(self.kind)
            .map_err(|_| DbError::Serialization(format!("kind code {} out of range", self.kind)))?;
        Ok(LegacyGatingRule {
            token_ref: contract_from_sql(self.token_ref)?,
            threshold: amount_from_sql(&self.threshold)?,
            kind_code,
            created_at: self.created_at,
            updated_at: self.updated_at,
            access_count: self.access_count,
        })
    }
}
