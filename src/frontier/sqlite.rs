//! SQLite frontier store implementation
//!
//! The claim operation runs as one IMMEDIATE transaction so that selection
//! and the Unclaimed -> Claimed transition are a single atomic read-and-update.
//! Callers serialize access through the store's surrounding mutex; the
//! critical section covers only the claim itself, never a whole task.

use crate::frontier::schema::initialize_schema;
use crate::frontier::store::{FoldStats, FrontierStore, StoreError, StoreResult};
use crate::frontier::{ClaimFilter, RunRecord, RunStatus, UrlRecord, UrlState};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde_json::Map;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// SQLite-backed frontier store
pub struct SqliteFrontier {
    conn: Connection,
}

impl SqliteFrontier {
    /// Opens or creates the frontier database at the given path
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Rewrites a claim timestamp (test hook for the stale-claim pass)
    #[cfg(test)]
    pub fn backdate_claim(&mut self, id: i64, last_attempt: &str) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE urls SET last_attempt = ?1 WHERE id = ?2",
            params![last_attempt, id],
        )?;
        Ok(())
    }

    fn map_url_row(row: &Row<'_>) -> rusqlite::Result<UrlRecord> {
        Ok(UrlRecord {
            id: row.get(0)?,
            address: row.get(1)?,
            priority: row.get(2)?,
            state: UrlState::from_db_string(&row.get::<_, String>(3)?)
                .unwrap_or(UrlState::Failed),
            failure_reason: row.get(4)?,
            discovered_from: row.get(5)?,
            last_attempt: row.get(6)?,
        })
    }

    fn current_state(conn: &Connection, id: i64) -> StoreResult<UrlState> {
        let state: Option<String> = conn
            .query_row("SELECT state FROM urls WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;

        match state {
            Some(s) => Ok(UrlState::from_db_string(&s).unwrap_or(UrlState::Failed)),
            None => Err(StoreError::UrlNotFound(id)),
        }
    }

    fn upsert_artifact_inner(
        conn: &Connection,
        url_id: i64,
        fields_json: &str,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO artifacts (url_id, fields, saved_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(url_id) DO UPDATE SET fields = excluded.fields, saved_at = excluded.saved_at",
            params![url_id, fields_json, now],
        )?;
        Ok(())
    }

    fn bump_or_insert_inner(
        conn: &Connection,
        address: &str,
        parent_id: i64,
        baseline: f64,
        increment: f64,
    ) -> StoreResult<bool> {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM urls WHERE address = ?1",
                params![address],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE urls SET priority = priority + ?1 WHERE id = ?2",
                    params![increment, id],
                )?;
                Ok(false)
            }
            None => {
                conn.execute(
                    "INSERT INTO urls (address, priority, state, discovered_from)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        address,
                        baseline,
                        UrlState::Unclaimed.to_db_string(),
                        parent_id
                    ],
                )?;
                Ok(true)
            }
        }
    }
}

impl FrontierStore for SqliteFrontier {
    // ===== URL records =====

    fn insert_url(
        &mut self,
        address: &str,
        priority: f64,
        discovered_from: Option<i64>,
    ) -> StoreResult<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM urls WHERE address = ?1",
                params![address],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            // Priority never decreases; a higher provenance priority wins
            self.conn.execute(
                "UPDATE urls SET priority = MAX(priority, ?1) WHERE id = ?2",
                params![priority, id],
            )?;
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO urls (address, priority, state, discovered_from) VALUES (?1, ?2, ?3, ?4)",
            params![
                address,
                priority,
                UrlState::Unclaimed.to_db_string(),
                discovered_from
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_url(&self, id: i64) -> StoreResult<UrlRecord> {
        self.conn
            .query_row(
                "SELECT id, address, priority, state, failure_reason, discovered_from, last_attempt
                 FROM urls WHERE id = ?1",
                params![id],
                Self::map_url_row,
            )
            .optional()?
            .ok_or(StoreError::UrlNotFound(id))
    }

    fn get_url_by_address(&self, address: &str) -> StoreResult<Option<UrlRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, address, priority, state, failure_reason, discovered_from, last_attempt
                 FROM urls WHERE address = ?1",
                params![address],
                Self::map_url_row,
            )
            .optional()?;
        Ok(record)
    }

    fn claim(&mut self, n: usize, filter: &ClaimFilter) -> StoreResult<Vec<UrlRecord>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().to_rfc3339();

        let mut claimed = {
            let mut stmt = tx.prepare(
                "SELECT id, address, priority, state, failure_reason, discovered_from, last_attempt
                 FROM urls
                 WHERE state = 'unclaimed'
                   AND (?1 IS NULL OR address LIKE ?1 || '%')
                 ORDER BY priority DESC, id ASC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(
                    params![filter.origin_prefix, n as i64],
                    Self::map_url_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        for record in &mut claimed {
            tx.execute(
                "UPDATE urls SET state = 'claimed', last_attempt = ?1 WHERE id = ?2",
                params![now, record.id],
            )?;
            record.state = UrlState::Claimed;
            record.last_attempt = Some(now.clone());
        }

        tx.commit()?;
        Ok(claimed)
    }

    fn update_status(
        &mut self,
        id: i64,
        state: UrlState,
        reason: Option<&str>,
    ) -> StoreResult<()> {
        let from = Self::current_state(&self.conn, id)?;

        // Only a Claimed record may be terminated; claims and operator
        // resets have their own dedicated paths.
        if !(from == UrlState::Claimed && state.is_terminal()) {
            return Err(StoreError::InvalidTransition {
                id,
                from,
                to: state,
            });
        }

        self.conn.execute(
            "UPDATE urls SET state = ?1, failure_reason = ?2 WHERE id = ?3",
            params![state.to_db_string(), reason, id],
        )?;
        Ok(())
    }

    // ===== Artifacts =====

    fn upsert_artifact(
        &mut self,
        url_id: i64,
        fields: &Map<String, serde_json::Value>,
    ) -> StoreResult<()> {
        let fields_json = serde_json::to_string(fields)?;
        Self::upsert_artifact_inner(&self.conn, url_id, &fields_json)
    }

    fn artifact_exists(&self, url_id: i64) -> StoreResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM artifacts WHERE url_id = ?1",
            params![url_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ===== Link folding =====

    fn bump_or_insert_link(
        &mut self,
        address: &str,
        parent_id: i64,
        baseline: f64,
        increment: f64,
    ) -> StoreResult<bool> {
        Self::bump_or_insert_inner(&self.conn, address, parent_id, baseline, increment)
    }

    fn record_success(
        &mut self,
        url_id: i64,
        fields: &Map<String, serde_json::Value>,
        links: &[String],
        baseline: f64,
        increment: f64,
    ) -> StoreResult<FoldStats> {
        let fields_json = serde_json::to_string(fields)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Recording success twice is a retry, not an error; the artifact
        // upsert makes the repeat land on the same row
        let from = Self::current_state(&tx, url_id)?;
        if from != UrlState::Claimed && from != UrlState::Success {
            return Err(StoreError::InvalidTransition {
                id: url_id,
                from,
                to: UrlState::Success,
            });
        }

        Self::upsert_artifact_inner(&tx, url_id, &fields_json)?;

        tx.execute(
            "UPDATE urls SET state = 'success', failure_reason = NULL WHERE id = ?1",
            params![url_id],
        )?;

        let mut stats = FoldStats::default();
        for link in links {
            if Self::bump_or_insert_inner(&tx, link, url_id, baseline, increment)? {
                stats.inserted += 1;
            } else {
                stats.boosted += 1;
            }
        }

        tx.commit()?;
        Ok(stats)
    }

    // ===== Operator passes =====

    fn reset_failed(&mut self) -> StoreResult<usize> {
        let changed = self.conn.execute(
            "UPDATE urls SET state = 'unclaimed', failure_reason = NULL WHERE state = 'failed'",
            [],
        )?;
        Ok(changed)
    }

    fn reclaim_stale(&mut self, older_than: Duration) -> StoreResult<usize> {
        let cutoff = (Utc::now()
            - chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::zero()))
        .to_rfc3339();

        let changed = self.conn.execute(
            "UPDATE urls SET state = 'unclaimed'
             WHERE state = 'claimed' AND last_attempt IS NOT NULL AND last_attempt < ?1",
            params![cutoff],
        )?;
        Ok(changed)
    }

    // ===== Run management =====

    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StoreResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Running),
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::RunNotFound(run_id))
    }

    // ===== Statistics =====

    fn count_by_state(&self) -> StoreResult<HashMap<UrlState, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT state, COUNT(*) FROM urls GROUP BY state")?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (state_str, count) = row?;
            if let Some(state) = UrlState::from_db_string(&state_str) {
                counts.insert(state, count as u64);
            }
        }

        Ok(counts)
    }

    fn count_urls(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_artifacts(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM artifacts", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
