//! Task CRUD and the punishment eligibility scan.

use super::{Database, now_ms};
use crate::types::{Task, TaskChanges};
use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let is_completed: i64 = row.get("is_completed")?;
    let is_punished: i64 = row.get("is_punished")?;

    Ok(Task {
        id: row.get("id")?,
        content: row.get("content")?,
        x: row.get("x")?,
        y: row.get("y")?,
        deadline: row.get("deadline")?,
        shame_message: row.get("shame_message")?,
        webhook_url: row.get("webhook_url")?,
        is_completed: is_completed != 0,
        is_punished: is_punished != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Internal helper to get a task using an existing connection.
fn get_task_internal(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Create a new task. Generates a UUID and sets both audit timestamps.
    pub fn create_task(
        &self,
        content: String,
        x: f64,
        y: f64,
        deadline: Option<i64>,
        shame_message: String,
        webhook_url: String,
    ) -> Result<Task> {
        let task_id = Uuid::new_v4().to_string();
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (
                    id, content, x, y, deadline, shame_message, webhook_url,
                    is_completed, is_punished, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8, ?9)",
                params![
                    &task_id,
                    &content,
                    x,
                    y,
                    deadline,
                    &shame_message,
                    &webhook_url,
                    now,
                    now,
                ],
            )?;

            Ok(Task {
                id: task_id,
                content,
                x,
                y,
                deadline,
                shame_message,
                webhook_url,
                is_completed: false,
                is_punished: false,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Apply a partial update. Unset fields keep their stored values and
    /// `updated_at` is refreshed. Returns `None` when the task is unknown.
    ///
    /// `is_punished` is deliberately absent from [`TaskChanges`]: only the
    /// sweep may set it, via [`Database::mark_punished`].
    pub fn update_task(&self, task_id: &str, changes: TaskChanges) -> Result<Option<Task>> {
        let now = now_ms();

        self.with_conn(|conn| {
            let Some(task) = get_task_internal(conn, task_id)? else {
                return Ok(None);
            };

            let new_content = changes.content.unwrap_or(task.content);
            let new_x = changes.x.unwrap_or(task.x);
            let new_y = changes.y.unwrap_or(task.y);
            let new_is_completed = changes.is_completed.unwrap_or(task.is_completed);
            let new_deadline = changes.deadline.unwrap_or(task.deadline);
            let new_shame_message = changes.shame_message.unwrap_or(task.shame_message);
            let new_webhook_url = changes.webhook_url.unwrap_or(task.webhook_url);

            conn.execute(
                "UPDATE tasks SET
                    content = ?1, x = ?2, y = ?3, is_completed = ?4, deadline = ?5,
                    shame_message = ?6, webhook_url = ?7, updated_at = ?8
                WHERE id = ?9",
                params![
                    new_content,
                    new_x,
                    new_y,
                    new_is_completed as i64,
                    new_deadline,
                    new_shame_message,
                    new_webhook_url,
                    now,
                    task_id,
                ],
            )?;

            Ok(Some(Task {
                id: task_id.to_string(),
                content: new_content,
                x: new_x,
                y: new_y,
                deadline: new_deadline,
                shame_message: new_shame_message,
                webhook_url: new_webhook_url,
                is_completed: new_is_completed,
                updated_at: now,
                ..task
            }))
        })
    }

    /// Delete a task. Returns whether a row was removed.
    pub fn delete_task(&self, task_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            Ok(deleted > 0)
        })
    }

    /// Get all tasks, oldest first.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM tasks ORDER BY created_at")?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// The eligibility scan: incomplete, unpunished tasks whose deadline has
    /// passed. Ordering is irrelevant to the sweep.
    pub fn overdue_tasks(&self, now: i64) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks
                 WHERE is_completed = 0
                 AND is_punished = 0
                 AND deadline IS NOT NULL
                 AND deadline < ?1",
            )?;
            let tasks = stmt
                .query_map(params![now], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Commit the punished transition. The WHERE clause re-checks
    /// eligibility so a task completed (or deleted) while the notification
    /// was in flight is left untouched. Returns whether the flag flipped.
    pub fn mark_punished(&self, task_id: &str, now: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET is_punished = 1, updated_at = ?1
                 WHERE id = ?2 AND is_completed = 0 AND is_punished = 0",
                params![now, task_id],
            )?;
            Ok(changed > 0)
        })
    }
}
