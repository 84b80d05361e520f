//! SQL schema definitions.

/// Legacy rule table. Rows are keyed by the store reference they were
/// written under so one file can hold several legacy deployments.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS legacy_gating_rules (
    source_ref BLOB NOT NULL,
    content_id INTEGER NOT NULL,
    token_ref BLOB,
    threshold TEXT NOT NULL,
    kind INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (source_ref, content_id)
);
"#;

/// Extended rule table.
pub const SCHEMA_V2: &str = r#"
CREATE TABLE IF NOT EXISTS gating_rules (
    content_id INTEGER PRIMARY KEY,
    token_ref BLOB,
    threshold TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('ft', 'nft', 'native')),
    active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    category TEXT,
    tags TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_gating_rules_category ON gating_rules(category);
"#;
