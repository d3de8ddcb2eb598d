//! SQLite store for tasks, flows, and work logs
//!
//! Data persists across restarts; the dashboard endpoints read and write
//! through this wrapper. Writes to a task go through an optimistic version
//! check so concurrent editors get a conflict error instead of silently
//! overwriting each other.
//!
//! # Schema
//!
//! 1. **tasks** - Task metadata plus the embedded flow template and version
//! 2. **subtasks** - One row per subtask, ordered by `position`
//! 3. **flows** - Stored flow templates as JSON
//! 4. **work_logs** - Timestamped manual-step entries per task
//! 5. **schema_version** - Schema version for migrations
//!
//! WAL mode is enabled for better concurrent access.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use jarvio_sdk::{Flow, Priority, Subtask, SubtaskStatus, Task, TaskStatus, WorkLogEntry};

/// Database wrapper for task and flow persistence
pub struct Database {
    conn: Connection,
}

/// Aggregate counts over stored tasks
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub done: usize,
}

/// A task write lost an optimistic concurrency race
///
/// Kept as its own type so the API layer can map it to a conflict status
/// instead of a plain server error.
#[derive(Debug)]
pub struct VersionConflict {
    pub task_id: Uuid,
    pub expected: i64,
    pub found: i64,
}

impl std::fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "task {} version conflict: expected {}, found {}",
            self.task_id, self.expected, self.found
        )
    }
}

impl std::error::Error for VersionConflict {}

impl Database {
    /// Create a new database connection at the specified path
    pub fn new(path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // Enable foreign key constraints
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    /// Initialize database schema with all tables and indexes
    pub fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                -- Primary key
                id TEXT PRIMARY KEY,

                -- Task info
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                category TEXT NOT NULL,

                -- Embedded flow template, if the task came from one
                flow_json TEXT,

                -- Optimistic concurrency
                version INTEGER NOT NULL,

                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        self.conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at DESC);
            "#,
        )?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS subtasks (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                done INTEGER NOT NULL,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                category TEXT NOT NULL,
                block_json TEXT,

                FOREIGN KEY(task_id) REFERENCES tasks(id) ON DELETE CASCADE,
                UNIQUE(task_id, position)
            );
            "#,
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_subtasks_task_id ON subtasks(task_id, position)",
            [],
        )?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS flows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                flow_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS work_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id TEXT NOT NULL,
                subtask_index INTEGER NOT NULL,
                entry TEXT NOT NULL,
                timestamp TEXT NOT NULL,

                FOREIGN KEY(task_id) REFERENCES tasks(id) ON DELETE CASCADE
            );
            "#,
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_work_logs_task_id ON work_logs(task_id)",
            [],
        )?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (1)",
            [],
        )?;

        Ok(())
    }

    /// Get current schema version
    pub fn get_schema_version(&self) -> Result<i32> {
        let version: i32 =
            self.conn
                .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                    row.get(0)
                })?;
        Ok(version)
    }

    /// Insert or update a task with an optimistic version check
    ///
    /// A task whose id is not stored yet inserts at version 1. Updates
    /// succeed only while the stored version still equals `task.version`;
    /// on success the version is bumped both in the row and in place. A
    /// mismatch returns an error naming the task id and both versions, and
    /// writes nothing.
    pub fn save_task(&self, task: &mut Task) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;

        let now = Local::now();
        let now_str = now.to_rfc3339();
        let flow_json = task.flow.as_ref().map(serde_json::to_string).transpose()?;

        let updated = tx.execute(
            r#"
            UPDATE tasks
            SET title = ?1, description = ?2, status = ?3, priority = ?4,
                category = ?5, flow_json = ?6, version = version + 1,
                updated_at = ?7
            WHERE id = ?8 AND version = ?9
            "#,
            params![
                task.title,
                task.description,
                status_to_string(&task.status),
                priority_to_string(&task.priority),
                task.category,
                flow_json,
                now_str,
                task.id.to_string(),
                task.version,
            ],
        )?;

        let new_version = if updated == 1 {
            task.version + 1
        } else {
            let found: Option<i64> = tx
                .query_row(
                    "SELECT version FROM tasks WHERE id = ?1",
                    params![task.id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            match found {
                Some(found) => {
                    return Err(VersionConflict {
                        task_id: task.id,
                        expected: task.version,
                        found,
                    }
                    .into());
                }
                None => {
                    tx.execute(
                        r#"
                        INSERT INTO tasks (
                            id, title, description, status, priority, category,
                            flow_json, version, created_at, updated_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9)
                        "#,
                        params![
                            task.id.to_string(),
                            task.title,
                            task.description,
                            status_to_string(&task.status),
                            priority_to_string(&task.priority),
                            task.category,
                            flow_json,
                            task.created_at.to_rfc3339(),
                            now_str,
                        ],
                    )?;
                    1
                }
            }
        };

        // Subtask rows are replaced wholesale; position is execution order
        tx.execute(
            "DELETE FROM subtasks WHERE task_id = ?1",
            params![task.id.to_string()],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO subtasks (
                    id, task_id, position, title, description, done, status,
                    priority, category, block_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;
            for (position, subtask) in task.subtasks.iter().enumerate() {
                let block_json = subtask
                    .block
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    subtask.id.to_string(),
                    task.id.to_string(),
                    position,
                    subtask.title,
                    subtask.description,
                    subtask.done,
                    subtask_status_to_string(&subtask.status),
                    priority_to_string(&subtask.priority),
                    subtask.category,
                    block_json,
                ])?;
            }
        }

        tx.commit()?;
        task.version = new_version;
        task.updated_at = now;
        Ok(new_version)
    }

    /// Get a single task by ID, subtasks in execution order
    pub fn get_task(&self, id: &Uuid) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                r#"
                SELECT id, title, description, status, priority, category,
                       flow_json, version, created_at, updated_at
                FROM tasks
                WHERE id = ?1
                "#,
                params![id.to_string()],
                map_task_row,
            )
            .optional()?;

        let mut task = match task {
            Some(task) => task,
            None => return Ok(None),
        };
        task.subtasks = self.get_subtasks(id)?;
        Ok(Some(task))
    }

    /// List tasks with pagination, newest first
    pub fn list_tasks(&self, limit: usize, offset: usize) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, title, description, status, priority, category,
                   flow_json, version, created_at, updated_at
            FROM tasks
            ORDER BY created_at DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;

        let mut tasks = stmt
            .query_map(params![limit, offset], map_task_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for task in &mut tasks {
            task.subtasks = self.get_subtasks(&task.id)?;
        }
        Ok(tasks)
    }

    /// Delete a task; subtask and work-log rows cascade
    pub fn delete_task(&self, id: &Uuid) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    /// Get task counts by status
    pub fn task_stats(&self) -> Result<TaskStats> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                COUNT(*) as total,
                SUM(CASE WHEN status = 'NotStarted' THEN 1 ELSE 0 END) as not_started,
                SUM(CASE WHEN status = 'InProgress' THEN 1 ELSE 0 END) as in_progress,
                SUM(CASE WHEN status = 'Done' THEN 1 ELSE 0 END) as done
            FROM tasks
            "#,
        )?;

        let stats = stmt.query_row([], |row| {
            Ok(TaskStats {
                total: row.get(0)?,
                not_started: row.get::<_, Option<usize>>(1)?.unwrap_or(0),
                in_progress: row.get::<_, Option<usize>>(2)?.unwrap_or(0),
                done: row.get::<_, Option<usize>>(3)?.unwrap_or(0),
            })
        })?;

        Ok(stats)
    }

    /// Store a flow template
    pub fn save_flow(&self, flow: &Flow) -> Result<()> {
        let flow_json = serde_json::to_string(flow)?;
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO flows (id, name, description, flow_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                flow.id.to_string(),
                flow.name,
                flow.description,
                flow_json,
                Local::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a single flow by ID
    pub fn get_flow(&self, id: &Uuid) -> Result<Option<Flow>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT flow_json FROM flows WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// List stored flows, newest first
    pub fn list_flows(&self) -> Result<Vec<Flow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT flow_json FROM flows ORDER BY created_at DESC")?;

        let rows = stmt
            .query_map([], |row| {
                let json: String = row.get(0)?;
                Ok(json)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| anyhow!("Failed to parse flow: {}", e))
            })
            .collect()
    }

    /// Append a work-log entry for a task
    pub fn append_work_log(&self, task_id: &Uuid, entry: &WorkLogEntry) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO work_logs (task_id, subtask_index, entry, timestamp)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                task_id.to_string(),
                entry.subtask_index,
                entry.entry,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a task's work log in insertion order
    pub fn get_work_logs(&self, task_id: &Uuid) -> Result<Vec<WorkLogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT subtask_index, entry, timestamp
            FROM work_logs
            WHERE task_id = ?1
            ORDER BY id ASC
            "#,
        )?;

        let entries = stmt
            .query_map(params![task_id.to_string()], |row| {
                let subtask_index: usize = row.get(0)?;
                let entry: String = row.get(1)?;
                let timestamp_str: String = row.get(2)?;
                Ok(WorkLogEntry {
                    subtask_index,
                    entry,
                    timestamp: parse_timestamp(&timestamp_str, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn get_subtasks(&self, task_id: &Uuid) -> Result<Vec<Subtask>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, title, description, done, status, priority, category, block_json
            FROM subtasks
            WHERE task_id = ?1
            ORDER BY position ASC
            "#,
        )?;

        let subtasks = stmt
            .query_map(params![task_id.to_string()], map_subtask_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(subtasks)
    }
}

// Helper functions for mapping between database and Rust types

fn status_to_string(status: &TaskStatus) -> &'static str {
    match status {
        TaskStatus::NotStarted => "NotStarted",
        TaskStatus::InProgress => "InProgress",
        TaskStatus::Done => "Done",
    }
}

fn string_to_status(s: &str) -> Result<TaskStatus> {
    match s {
        "NotStarted" => Ok(TaskStatus::NotStarted),
        "InProgress" => Ok(TaskStatus::InProgress),
        "Done" => Ok(TaskStatus::Done),
        _ => Err(anyhow!("Unknown task status: {}", s)),
    }
}

fn subtask_status_to_string(status: &SubtaskStatus) -> &'static str {
    match status {
        SubtaskStatus::NotStarted => "NotStarted",
        SubtaskStatus::InProgress => "InProgress",
        SubtaskStatus::Done => "Done",
        SubtaskStatus::Skipped => "Skipped",
    }
}

fn string_to_subtask_status(s: &str) -> Result<SubtaskStatus> {
    match s {
        "NotStarted" => Ok(SubtaskStatus::NotStarted),
        "InProgress" => Ok(SubtaskStatus::InProgress),
        "Done" => Ok(SubtaskStatus::Done),
        "Skipped" => Ok(SubtaskStatus::Skipped),
        _ => Err(anyhow!("Unknown subtask status: {}", s)),
    }
}

fn priority_to_string(priority: &Priority) -> &'static str {
    match priority {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
    }
}

fn string_to_priority(s: &str) -> Result<Priority> {
    match s {
        "Low" => Ok(Priority::Low),
        "Medium" => Ok(Priority::Medium),
        "High" => Ok(Priority::High),
        _ => Err(anyhow!("Unknown priority: {}", s)),
    }
}

/// Parse an RFC 3339 column into local time
fn parse_timestamp(value: &str, column: usize) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Map a database row to a Task (subtasks loaded separately)
fn map_task_row(row: &Row) -> rusqlite::Result<Task> {
    let id_str: String = row.get(0)?;
    let title: String = row.get(1)?;
    let description: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let priority_str: String = row.get(4)?;
    let category: String = row.get(5)?;
    let flow_json: Option<String> = row.get(6)?;
    let version: i64 = row.get(7)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status = string_to_status(&status_str).map_err(|_| rusqlite::Error::InvalidQuery)?;
    let priority = string_to_priority(&priority_str).map_err(|_| rusqlite::Error::InvalidQuery)?;

    let flow = match flow_json {
        Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(Task {
        id,
        title,
        description,
        status,
        priority,
        category,
        subtasks: Vec::new(),
        flow,
        version,
        created_at: parse_timestamp(&created_at_str, 8)?,
        updated_at: parse_timestamp(&updated_at_str, 9)?,
    })
}

/// Map a database row to a Subtask
fn map_subtask_row(row: &Row) -> rusqlite::Result<Subtask> {
    let id_str: String = row.get(0)?;
    let title: String = row.get(1)?;
    let description: String = row.get(2)?;
    let done: bool = row.get(3)?;
    let status_str: String = row.get(4)?;
    let priority_str: String = row.get(5)?;
    let category: String = row.get(6)?;
    let block_json: Option<String> = row.get(7)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status = string_to_subtask_status(&status_str).map_err(|_| rusqlite::Error::InvalidQuery)?;
    let priority = string_to_priority(&priority_str).map_err(|_| rusqlite::Error::InvalidQuery)?;

    let block = match block_json {
        Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(Subtask {
        id,
        title,
        description,
        done,
        status,
        priority,
        category,
        block,
    })
}
