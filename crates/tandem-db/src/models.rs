//! Database row types — these map directly to SQLite rows.
//! Distinct from tandem-types API models to keep the DB layer independent.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use tandem_types::models::{Task, TimerPhase, TimerSession, TimerStatus, User};
use tracing::warn;
use uuid::Uuid;

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    pub room_id: Option<String>,
    pub created_at: String,
}

pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub is_active: bool,
    pub created_at: String,
}

pub struct TimerSessionRow {
    pub id: String,
    pub user_id: String,
    pub task_id: Option<String>,
    pub status: String,
    pub phase: String,
    pub start_time: Option<i64>,
    pub duration_seconds: i64,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_uuid(&self.id).context("corrupt user id")?,
            room_id: self
                .room_id
                .as_deref()
                .map(parse_uuid)
                .transpose()
                .context("corrupt room id")?,
            name: self.name,
            invite_code: self.invite_code,
        })
    }
}

impl TaskRow {
    pub fn into_task(self) -> Result<Task> {
        Ok(Task {
            id: parse_uuid(&self.id).context("corrupt task id")?,
            user_id: parse_uuid(&self.user_id).context("corrupt user id on task")?,
            created_at: parse_timestamp(&self.id, &self.created_at),
            title: self.title,
            is_active: self.is_active,
        })
    }
}

impl TimerSessionRow {
    pub fn parsed_status(&self) -> Result<TimerStatus> {
        TimerStatus::parse(&self.status)
            .ok_or_else(|| anyhow!("unknown timer status '{}' on session {}", self.status, self.id))
    }

    pub fn parsed_phase(&self) -> Result<TimerPhase> {
        TimerPhase::parse(&self.phase)
            .ok_or_else(|| anyhow!("unknown timer phase '{}' on session {}", self.phase, self.id))
    }

    pub fn into_session(self) -> Result<TimerSession> {
        Ok(TimerSession {
            status: self.parsed_status()?,
            phase: self.parsed_phase()?,
            id: parse_uuid(&self.id).context("corrupt session id")?,
            user_id: parse_uuid(&self.user_id).context("corrupt user id on session")?,
            task_id: self
                .task_id
                .as_deref()
                .map(parse_uuid)
                .transpose()
                .context("corrupt task id on session")?,
            created_at: parse_timestamp(&self.id, &self.created_at),
            start_time: self.start_time,
            duration_seconds: self.duration_seconds,
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    raw.parse::<Uuid>().map_err(|e| anyhow!("'{}': {}", raw, e))
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert, falling back through RFC 3339.
fn parse_timestamp(row_id: &str, raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on row '{}': {}", raw, row_id, e);
            DateTime::default()
        })
}
