//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per analysis run; a re-run for the same container and date
-- replaces the previous row (created_at is preserved across replacements).
CREATE TABLE IF NOT EXISTS ledger_records (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    container_id   TEXT NOT NULL,
    analysis_date  TEXT NOT NULL,               -- YYYY-MM-DD
    analysis_at    TEXT NOT NULL,               -- ISO 8601 UTC
    window_start   TEXT NOT NULL,               -- ISO 8601 UTC
    window_end     TEXT NOT NULL,               -- ISO 8601 UTC
    total_messages INTEGER NOT NULL DEFAULT 0,
    model          TEXT NOT NULL,
    raw_output     TEXT NOT NULL DEFAULT '',
    status         TEXT NOT NULL DEFAULT 'success',  -- 'success' | 'error'
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (container_id, analysis_date)
);

-- Flattened task rows belonging to a record. Items are never updated in
-- place: a replacement run deletes and reinserts them in one transaction.
CREATE TABLE IF NOT EXISTS ledger_items (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id INTEGER NOT NULL REFERENCES ledger_records(id) ON DELETE CASCADE,
    category  TEXT NOT NULL,                    -- 'pending' | 'completed' | 'issue'
    assignee  TEXT NOT NULL,
    task_text TEXT NOT NULL,
    position  INTEGER NOT NULL DEFAULT 0       -- 1-based within the assignee list
);

-- Meeting summaries are append-only; one row per analysed transcript.
CREATE TABLE IF NOT EXISTS meeting_summaries (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at  TEXT NOT NULL,                 -- ISO 8601 UTC
    transcript   TEXT NOT NULL DEFAULT '',
    summary_text TEXT NOT NULL,
    participants TEXT NOT NULL DEFAULT '[]',    -- JSON array of names
    meeting_type TEXT NOT NULL DEFAULT 'general',
    model        TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ledger_records_date_idx   ON ledger_records(analysis_date);
CREATE INDEX IF NOT EXISTS ledger_items_record_idx   ON ledger_items(record_id);
CREATE INDEX IF NOT EXISTS ledger_items_assignee_idx ON ledger_items(assignee);
CREATE INDEX IF NOT EXISTS meeting_summaries_recorded_idx ON meeting_summaries(recorded_at);

PRAGMA user_version = 1;
";
