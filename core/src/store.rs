//! SQLite persistence for snapshots and the schedule.
//!
//! RULE: Only store.rs talks to the database. Pipeline code calls store
//! methods — it never executes SQL directly.

use crate::error::ReportResult;
use crate::report::ReportType;
use crate::schedule::Schedule;
use crate::snapshot::HistoricalSnapshot;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;

pub struct HistoryStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl HistoryStore {
    pub fn open(path: &str) -> ReportResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only matters for real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ReportResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    pub fn reopen(&self) -> ReportResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ReportResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_history.sql"))?;
        Ok(())
    }

    // ── Snapshots (append-only) ────────────────────────────────────────

    pub fn insert_snapshot(&self, snapshot: &HistoricalSnapshot) -> ReportResult<()> {
        let payload = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT INTO appeal_history (snapshot_id, created_at, week, year, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &snapshot.snapshot_id,
                snapshot.created_at.to_rfc3339(),
                snapshot.week as i64,
                snapshot.year as i64,
                payload,
            ],
        )?;
        Ok(())
    }

    /// Most recent snapshots first. Rows whose payload no longer parses
    /// (older schema versions) are dropped rather than failing the read.
    pub fn recent_snapshots(&self, limit: usize) -> ReportResult<Vec<HistoricalSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM appeal_history ORDER BY created_at DESC LIMIT ?1",
        )?;
        let payloads = stmt
            .query_map(params![limit as i64], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(payloads
            .iter()
            .filter_map(|p| serde_json::from_str(p).ok())
            .collect())
    }

    pub fn snapshot_count(&self) -> ReportResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM appeal_history", [], |row| row.get(0))?;
        Ok(count)
    }

    // ── Schedule (singleton, replaced wholesale) ───────────────────────

    /// Enable weekly reports: delete any existing schedule rows, then
    /// create the new one.
    pub fn enable_schedule(&self, schedule: &Schedule) -> ReportResult<()> {
        self.conn.execute("DELETE FROM schedule", [])?;
        self.conn.execute(
            "INSERT INTO schedule (schedule_id, enabled, next_run, slack_channel, report_type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &schedule.schedule_id,
                schedule.enabled as i64,
                schedule.next_run.to_rfc3339(),
                &schedule.slack_channel,
                schedule.report_type.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn disable_schedule(&self) -> ReportResult<()> {
        self.conn.execute("DELETE FROM schedule", [])?;
        Ok(())
    }

    pub fn find_schedule(&self) -> ReportResult<Option<Schedule>> {
        self.conn
            .query_row(
                "SELECT schedule_id, enabled, next_run, slack_channel, report_type
                 FROM schedule LIMIT 1",
                [],
                schedule_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn update_next_run(&self, schedule_id: &str, next_run: DateTime<Utc>) -> ReportResult<()> {
        self.conn.execute(
            "UPDATE schedule SET next_run = ?1 WHERE schedule_id = ?2",
            params![next_run.to_rfc3339(), schedule_id],
        )?;
        Ok(())
    }
}

fn schedule_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Schedule> {
    let next_run_raw: String = row.get(2)?;
    let report_type_raw: String = row.get(4)?;
    Ok(Schedule {
        schedule_id: row.get(0)?,
        enabled: row.get::<_, i64>(1)? != 0,
        next_run: DateTime::parse_from_rfc3339(&next_run_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        slack_channel: row.get(3)?,
        report_type: ReportType::from_str(&report_type_raw).unwrap_or(ReportType::Weekly),
    })
}
