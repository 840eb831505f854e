//! Database schema definitions
//!
//! All SQL schema for the frontier database lives here.

/// SQL schema for the frontier database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Every URL the crawler has ever seen. Rows are never deleted.
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL UNIQUE,
    priority REAL NOT NULL DEFAULT 1.0,
    state TEXT NOT NULL DEFAULT 'unclaimed',
    failure_reason TEXT,
    discovered_from INTEGER REFERENCES urls(id),
    last_attempt TEXT
);

CREATE INDEX IF NOT EXISTS idx_urls_state ON urls(state);
CREATE INDEX IF NOT EXISTS idx_urls_claim ON urls(state, priority DESC, id ASC);

-- Extracted article data, one row per URL at most
CREATE TABLE IF NOT EXISTS artifacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL UNIQUE REFERENCES urls(id),
    fields TEXT NOT NULL,
    saved_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
