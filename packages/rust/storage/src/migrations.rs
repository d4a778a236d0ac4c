//! SQL migration definitions for the DeepCut database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: ideas",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Generated research packages
CREATE TABLE IF NOT EXISTS ideas (
    id                     TEXT PRIMARY KEY,
    topic                  TEXT NOT NULL,
    style                  TEXT,
    research_data          TEXT NOT NULL,
    created_via_automation INTEGER NOT NULL DEFAULT 0,
    created_at             TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ideas_created_at ON ideas(created_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
