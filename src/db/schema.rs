//! SQL DDL for the local installations table.

/// SQLite schema with:
/// - `app_id` TEXT PRIMARY KEY (the conflict target for upserts and claims)
/// - `initialized` BOOLEAN (stored as INTEGER 0/1)
/// - `updated_at` TEXT, RFC3339
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS installations (
    app_id TEXT PRIMARY KEY NOT NULL,
    initialized INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);
"#;
