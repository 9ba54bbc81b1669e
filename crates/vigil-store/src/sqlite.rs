//! SQLite-based store implementation

use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};
use vigil_util::{EventId, OperatorId, TaskId, TimeOfDay};

use crate::{
    Frequency, ScheduledTask, SecurityEvent, SecurityEventKind, Store, StoreError, StoreResult,
};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- Security event log (append-only)
            CREATE TABLE IF NOT EXISTS security_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type TEXT NOT NULL,
                description TEXT NOT NULL,
                photo_path TEXT,
                timestamp TEXT NOT NULL
            );

            -- Scheduled tasks (soft-deleted via active flag)
            CREATE TABLE IF NOT EXISTS scheduled_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                command TEXT NOT NULL,
                schedule_time TEXT NOT NULL,
                frequency TEXT NOT NULL DEFAULT 'daily',
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON security_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_tasks_active ON scheduled_tasks(active);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn append_event(
        &self,
        kind: SecurityEventKind,
        description: &str,
        evidence_path: Option<&str>,
    ) -> StoreResult<EventId> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO security_events (event_type, description, photo_path, timestamp)
             VALUES (?, ?, ?, ?)",
            params![
                kind.as_str(),
                description,
                evidence_path,
                Local::now().to_rfc3339()
            ],
        )?;

        let id = EventId::new(conn.last_insert_rowid());
        debug!(event_id = %id, kind = %kind, "Security event appended");

        Ok(id)
    }

    fn recent_events(&self, limit: usize) -> StoreResult<Vec<SecurityEvent>> {
        let conn = self.conn.lock().unwrap();

        // Append-only log: ids are assigned in insertion order, and the
        // RFC 3339 text would sort wrongly across a UTC-offset change.
        let mut stmt = conn.prepare(
            "SELECT id, event_type, description, photo_path, timestamp
             FROM security_events
             ORDER BY id DESC
             LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let kind: String = row.get(1)?;
            let description: String = row.get(2)?;
            let evidence_path: Option<String> = row.get(3)?;
            let timestamp: String = row.get(4)?;
            Ok((id, kind, description, evidence_path, timestamp))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, kind_str, description, evidence_path, timestamp_str) = row?;

            let kind = SecurityEventKind::parse(&kind_str).ok_or_else(|| {
                StoreError::Database(format!("unknown event type '{kind_str}' in row {id}"))
            })?;
            let timestamp = parse_stored_timestamp(&timestamp_str);

            events.push(SecurityEvent {
                id: EventId::new(id),
                kind,
                description,
                evidence_path,
                timestamp,
            });
        }

        Ok(events)
    }

    fn insert_task(
        &self,
        owner: &OperatorId,
        command: &str,
        time_of_day: TimeOfDay,
    ) -> StoreResult<ScheduledTask> {
        let conn = self.conn.lock().unwrap();
        let created_at = Local::now();

        conn.execute(
            "INSERT INTO scheduled_tasks (user_id, command, schedule_time, frequency, active, created_at)
             VALUES (?, ?, ?, ?, 1, ?)",
            params![
                owner.as_str(),
                command,
                time_of_day.to_string(),
                Frequency::Daily.as_str(),
                created_at.to_rfc3339()
            ],
        )?;

        let id = TaskId::new(conn.last_insert_rowid());
        debug!(task_id = %id, owner = %owner, time = %time_of_day, "Task inserted");

        Ok(ScheduledTask {
            id,
            owner: owner.clone(),
            command: command.to_string(),
            time_of_day,
            frequency: Frequency::Daily,
            active: true,
            created_at,
        })
    }

    fn list_tasks(&self, active_only: bool) -> StoreResult<Vec<ScheduledTask>> {
        let conn = self.conn.lock().unwrap();

        let sql = if active_only {
            "SELECT id, user_id, command, schedule_time, frequency, active, created_at
             FROM scheduled_tasks WHERE active = 1 ORDER BY id"
        } else {
            "SELECT id, user_id, command, schedule_time, frequency, active, created_at
             FROM scheduled_tasks ORDER BY id"
        };

        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let owner: String = row.get(1)?;
            let command: String = row.get(2)?;
            let schedule_time: String = row.get(3)?;
            let frequency: String = row.get(4)?;
            let active: bool = row.get(5)?;
            let created_at: String = row.get(6)?;
            Ok((id, owner, command, schedule_time, frequency, active, created_at))
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            let (id, owner, command, schedule_time, frequency_str, active, created_at) = row?;

            let time_of_day = TimeOfDay::parse(&schedule_time).map_err(|_| {
                StoreError::Database(format!("invalid schedule_time '{schedule_time}' in row {id}"))
            })?;
            let frequency = Frequency::parse(&frequency_str).ok_or_else(|| {
                StoreError::Database(format!("unknown frequency '{frequency_str}' in row {id}"))
            })?;

            tasks.push(ScheduledTask {
                id: TaskId::new(id),
                owner: OperatorId::new(owner),
                command,
                time_of_day,
                frequency,
                active,
                created_at: parse_stored_timestamp(&created_at),
            });
        }

        Ok(tasks)
    }

    fn deactivate_task(&self, id: TaskId) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM scheduled_tasks WHERE id = ?",
                [id.as_i64()],
                |row| row.get(0),
            )
            .optional()?;

        if exists.is_none() {
            return Ok(false);
        }

        conn.execute(
            "UPDATE scheduled_tasks SET active = 0 WHERE id = ?",
            [id.as_i64()],
        )?;

        debug!(task_id = %id, "Task deactivated");
        Ok(true)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

fn parse_stored_timestamp(s: &str) -> DateTime<Local> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Local))
        .unwrap_or_else(|_| Local::now())
}
