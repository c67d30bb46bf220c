use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StoreError, ValidationError};

const CSV_HEADER: [&str; 5] = ["team_a", "team_b", "ga", "gb", "date"];

/// One completed match. Team names are compared by exact equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub team_a: String,
    pub team_b: String,
    pub goals_a: u32,
    pub goals_b: u32,
    /// `None` when the stored date was missing or unparsable.
    pub timestamp: Option<DateTime<Utc>>,
}

impl MatchRecord {
    /// Validates the raw input; a missing timestamp means "now".
    pub fn new(
        team_a: &str,
        team_b: &str,
        goals_a: i64,
        goals_b: i64,
        timestamp: Option<DateTime<Utc>>,
    ) -> std::result::Result<Self, ValidationError> {
        Self::validated(
            team_a,
            team_b,
            goals_a,
            goals_b,
            Some(timestamp.unwrap_or_else(Utc::now)),
        )
    }

    fn validated(
        team_a: &str,
        team_b: &str,
        goals_a: i64,
        goals_b: i64,
        timestamp: Option<DateTime<Utc>>,
    ) -> std::result::Result<Self, ValidationError> {
        if team_a.trim().is_empty() || team_b.trim().is_empty() {
            return Err(ValidationError::EmptyTeamName);
        }
        Ok(Self {
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            goals_a: checked_goals(team_a, goals_a)?,
            goals_b: checked_goals(team_b, goals_b)?,
            timestamp,
        })
    }

    pub fn involves(&self, team: &str) -> bool {
        self.team_a == team || self.team_b == team
    }

    /// True when this record is the unordered pairing `{team_a, team_b}`.
    pub fn is_pairing(&self, team_a: &str, team_b: &str) -> bool {
        (self.team_a == team_a && self.team_b == team_b)
            || (self.team_a == team_b && self.team_b == team_a)
    }

    /// `(goals_for, goals_against)` from `team`'s side. Side A wins for self-matches.
    pub fn goals_for(&self, team: &str) -> Option<(u32, u32)> {
        if self.team_a == team {
            Some((self.goals_a, self.goals_b))
        } else if self.team_b == team {
            Some((self.goals_b, self.goals_a))
        } else {
            None
        }
    }
}

fn checked_goals(team: &str, goals: i64) -> std::result::Result<u32, ValidationError> {
    u32::try_from(goals).map_err(|_| ValidationError::InvalidGoals {
        team: team.to_string(),
        goals,
    })
}

/// Accepts RFC 3339, naive ISO-8601 (read as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

mod sealed {
    use super::MatchRecord;
    use crate::error::Result;

    /// Raw medium access. Only reachable through [`super::MatchStore`], which
    /// validates before writing.
    pub trait Backend {
        fn write_record(&mut self, record: &MatchRecord) -> Result<()>;

        fn read_all(&self) -> Result<Vec<MatchRecord>>;

        fn count(&self) -> Result<usize> {
            Ok(self.read_all()?.len())
        }
    }
}

/// Append-only match log.
///
/// The trait is sealed: the three backends in this module are the only
/// implementations, and records only reach them through [`MatchStore::append`].
pub trait MatchStore: sealed::Backend {
    /// Full history in insertion order, as an independent copy.
    fn all(&self) -> Result<Vec<MatchRecord>> {
        self.read_all()
    }

    fn len(&self) -> Result<usize> {
        self.count()
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn append(
        &mut self,
        team_a: &str,
        team_b: &str,
        goals_a: i64,
        goals_b: i64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<MatchRecord> {
        let record = MatchRecord::new(team_a, team_b, goals_a, goals_b, timestamp)?;
        self.write_record(&record)?;
        log_recorded(&record);
        Ok(record)
    }
}

/// Writes a batch validated up front by [`MatchRecord::new`].
pub(crate) fn append_validated<S: MatchStore + ?Sized>(
    store: &mut S,
    record: &MatchRecord,
) -> Result<()> {
    store.write_record(record)?;
    log_recorded(record);
    Ok(())
}

fn log_recorded(record: &MatchRecord) {
    info!(
        team_a = %record.team_a,
        team_b = %record.team_b,
        goals_a = record.goals_a,
        goals_b = record.goals_b,
        "match recorded"
    );
}

impl<S: MatchStore + ?Sized> sealed::Backend for Box<S> {
    fn write_record(&mut self, record: &MatchRecord) -> Result<()> {
        (**self).write_record(record)
    }

    fn read_all(&self) -> Result<Vec<MatchRecord>> {
        (**self).read_all()
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }
}

impl<S: MatchStore + ?Sized> MatchStore for Box<S> {}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<MatchRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl sealed::Backend for MemoryStore {
    fn write_record(&mut self, record: &MatchRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<MatchRecord>> {
        Ok(self.records.clone())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }
}

impl MatchStore for MemoryStore {}

/// Flat `team_a,team_b,ga,gb,date` log, re-read on every `all()`.
///
/// The header row is optional on read: a file whose first row has no
/// `team_a` column is read positionally from the first line.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl sealed::Backend for CsvStore {
    fn write_record(&mut self, record: &MatchRecord) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| StoreError::io(&self.path, err))?;
        let needs_header = file
            .metadata()
            .map_err(|err| StoreError::io(&self.path, err))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(CSV_HEADER)?;
        }
        writer.write_record([
            record.team_a.clone(),
            record.team_b.clone(),
            record.goals_a.to_string(),
            record.goals_b.to_string(),
            record
                .timestamp
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
        ])?;
        writer
            .flush()
            .map_err(|err| StoreError::io(&self.path, err))?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<MatchRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut rows = reader.records().enumerate().peekable();
        let mut cols = [0, 1, 2, 3, 4];
        let mut has_header = false;
        if let Some((_, Ok(first))) = rows.peek() {
            if first.iter().any(|h| h.trim() == CSV_HEADER[0]) {
                for (col, name) in cols.iter_mut().zip(CSV_HEADER) {
                    if let Some(pos) = first.iter().position(|h| h.trim() == name) {
                        *col = pos;
                    }
                }
                has_header = true;
            }
        }
        if has_header {
            rows.next();
        }

        let mut out = Vec::new();
        for (idx, row) in rows {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    warn!(path = %self.path.display(), row = idx + 1, %err, "skipping unreadable row");
                    continue;
                }
            };
            let field = |i: usize| row.get(cols[i]).unwrap_or_default();
            match record_from_fields(field(0), field(1), field(2), field(3), field(4)) {
                Ok(record) => out.push(record),
                Err(err) => {
                    warn!(path = %self.path.display(), row = idx + 1, %err, "skipping invalid row");
                }
            }
        }
        Ok(out)
    }
}

impl MatchStore for CsvStore {}

fn record_from_fields(
    team_a: &str,
    team_b: &str,
    goals_a: &str,
    goals_b: &str,
    date: &str,
) -> std::result::Result<MatchRecord, ValidationError> {
    let parse_goals = |field: &'static str, raw: &str| {
        raw.trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::Malformed {
                field,
                value: raw.to_string(),
            })
    };
    MatchRecord::validated(
        team_a,
        team_b,
        parse_goals("ga", goals_a)?,
        parse_goals("gb", goals_b)?,
        parse_timestamp(date),
    )
}

/// Append-only `matches` table; insertion order is rowid order.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_a TEXT NOT NULL,
            team_b TEXT NOT NULL,
            goals_a INTEGER NOT NULL,
            goals_b INTEGER NOT NULL,
            recorded_at TEXT NULL
        );
        "#,
    )?;
    Ok(())
}

impl sealed::Backend for SqliteStore {
    fn write_record(&mut self, record: &MatchRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO matches(team_a, team_b, goals_a, goals_b, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.team_a,
                record.team_b,
                i64::from(record.goals_a),
                i64::from(record.goals_b),
                record.timestamp.map(|ts| ts.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<MatchRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT team_a, team_b, goals_a, goals_b, recorded_at FROM matches ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (team_a, team_b, goals_a, goals_b, recorded_at) = row?;
            let timestamp = recorded_at.as_deref().and_then(parse_timestamp);
            match MatchRecord::validated(&team_a, &team_b, goals_a, goals_b, timestamp) {
                Ok(record) => out.push(record),
                Err(err) => warn!(%err, "skipping invalid sqlite row"),
            }
        }
        Ok(out)
    }

    fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }
}

impl MatchStore for SqliteStore {}
