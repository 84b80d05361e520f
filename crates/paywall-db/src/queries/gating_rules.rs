//! Extended gating rule query functions.

use paywall_gating::rule::GatingRule;
use paywall_types::{ContentId, GatingKind};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{amount_from_sql, amount_to_sql, contract_from_sql};
use crate::{DbError, Result};

const SELECT_COLUMNS: &str = "content_id, token_ref, threshold, kind, active, created_at,
     updated_at, access_count, category, tags";

/// Insert or replace an extended rule.
pub fn upsert(conn: &Connection, content_id: ContentId, rule: &GatingRule) -> Result<()> {
    let tags = serde_json::to_string(&rule.tags)
        .map_err(|e| DbError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT OR REPLACE INTO gating_rules
         (content_id, token_ref, threshold, kind, active, created_at, updated_at,
          access_count, category, tags)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            content_id as i64,
            rule.token_ref.as_ref().map(|t| t.as_bytes().to_vec()),
            amount_to_sql(rule.threshold),
            rule.kind.as_str(),
            rule.active,
            rule.created_at as i64,
            rule.updated_at as i64,
            rule.access_count as i64,
            rule.category,
            tags,
        ],
    )?;
    Ok(())
}

/// Fetch one extended rule.
pub fn get(conn: &Connection, content_id: ContentId) -> Result<Option<GatingRule>> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM gating_rules WHERE content_id = ?1"),
            [content_id as i64],
            RuleRow::from_row,
        )
        .optional()?;
    raw.map(|r| r.into_rule().map(|(_, rule)| rule)).transpose()
}

/// All extended rules ordered by content id.
pub fn list(conn: &Connection) -> Result<Vec<(ContentId, GatingRule)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM gating_rules ORDER BY content_id"
    ))?;
    let rows = stmt
        .query_map([], RuleRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(RuleRow::into_rule).collect()
}

/// Delete one extended rule.
pub fn delete(conn: &Connection, content_id: ContentId) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM gating_rules WHERE content_id = ?1",
        [content_id as i64],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("gating rule {content_id}")));
    }
    Ok(())
}

/// Replace the table contents with `rules` in one transaction.
///
/// Returns the number of rules written.
pub fn export<'a, I>(conn: &mut Connection, rules: I) -> Result<usize>
where
    I: IntoIterator<Item = (&'a ContentId, &'a GatingRule)>,
{
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM gating_rules", [])?;
    let mut written = 0;
    for (content_id, rule) in rules {
        upsert(&tx, *content_id, rule)?;
        written += 1;
    }
    tx.commit()?;
    tracing::info!(written, "gating rules exported");
    Ok(written)
}

/// A raw extended row before field decoding.
#[derive(Debug)]
struct RuleRow {
    content_id: u64,
    token_ref: Option<Vec<u8>>,
    threshold: String,
    kind: String,
    active: bool,
    created_at: u64,
    updated_at: u64,
    access_count: u64,
    category: Option<String>,
    tags: String,
}

impl RuleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_id: row.get::<_, i64>(0)? as u64,
            token_ref: row.get(1)?,
            threshold: row.get(2)?,
            kind: row.get(3)?,
            active: row.get(4)?,
            created_at: row.get::<_, i64>(5)? as u64,
            updated_at: row.get::<_, i64>(6)? as u64,
            access_count: row.get::<_, i64>(7)? as u64,
            category: row.get(8)?,
            tags: row.get(9)?,
        })
    }

    fn into_rule(self) -> Result<(ContentId, GatingRule)> {
        let kind: GatingKind = self
            .kind
            .parse()
            .map_err(|e: paywall_types::InvalidGatingKind| DbError::Serialization(e.to_string()))?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| DbError::Serialization(e.to_string()))?;
        Ok((
            self.content_id,
            GatingRule {
                token_ref: contract_from_sql(self.token_ref)?,
                threshold: amount_from_sql(&self.threshold)?,
                kind,
                active: self.active,
                created_at: self.created_at,
                updated_at: self.updated_at,
                access_count: self.access_count,
                category: self.category,
                tags,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use paywall_gating::rule::RuleDraft;
    use paywall_types::ContractRef;

    use super::*;

    fn rule() -> GatingRule {
        let mut rule = GatingRule::from_draft(
            RuleDraft::non_fungible(ContractRef::new([8; 32]), 77)
                .with_category("art")
                .with_tags(["limited", "print"]),
            40,
        );
        rule.access_count = 12;
        rule
    }

    #[test]
    fn test_upsert_and_get() {
        let conn = crate::open_memory().expect("open");
        upsert(&conn, 5, &rule()).expect("upsert");
        assert_eq!(get(&conn, 5).expect("get"), Some(rule()));
        assert_eq!(get(&conn, 6).expect("get"), None);
    }

    #[test]
    fn test_delete() {
        let conn = crate::open_memory().expect("open");
        upsert(&conn, 5, &rule()).expect("upsert");
        delete(&conn, 5).expect("delete");
        assert!(matches!(delete(&conn, 5), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_export_replaces_contents() {
        let mut conn = crate::open_memory().expect("open");
        upsert(&conn, 99, &rule()).expect("stale row");

        let native = GatingRule::from_draft(RuleDraft::native(10), 1);
        let fresh = [(1u64, rule()), (2u64, native.clone())];
        let written = export(&mut conn, fresh.iter().map(|(id, r)| (id, r))).expect("export");
        assert_eq!(written, 2);

        let listed = list(&conn).expect("list");
        assert_eq!(listed, vec![(1, rule()), (2, native)]);
    }

    #[test]
    fn test_kind_column_constrained() {
        let conn = crate::open_memory().expect("open");
        let result = conn.execute(
            "INSERT INTO gating_rules (content_id, threshold, kind, created_at, updated_at)
             VALUES (1, '0', 'erc1155', 0, 0)",
            [],
        );
        assert!(result.is_err());
    }
}
