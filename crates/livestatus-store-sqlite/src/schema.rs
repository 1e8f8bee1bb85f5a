//! SQL schema for the binding registry.
//!
//! Executed on every open; `PRAGMA user_version` records the layout for
//! future migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per (kind, subject, group, target). An empty resource_id means
-- the destination currently has no live resource.
CREATE TABLE IF NOT EXISTS bindings (
    kind        TEXT NOT NULL,   -- 'message' | 'event'
    subject_id  TEXT NOT NULL,
    group_id    TEXT NOT NULL,
    target_id   TEXT NOT NULL,   -- channel id for messages, '' for events
    resource_id TEXT NOT NULL DEFAULT '',
    updated_at  TEXT NOT NULL,   -- ISO 8601 UTC
    PRIMARY KEY (kind, subject_id, group_id, target_id)
);

PRAGMA user_version = 1;
";
