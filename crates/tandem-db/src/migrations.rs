use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS rooms (
            id          TEXT PRIMARY KEY,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            invite_code  TEXT NOT NULL UNIQUE,
            room_id      TEXT REFERENCES rooms(id),
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL,
            is_active   INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_user
            ON tasks(user_id);

        CREATE TABLE IF NOT EXISTS timer_sessions (
            id                TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL REFERENCES users(id),
            task_id           TEXT REFERENCES tasks(id) ON DELETE SET NULL,
            status            TEXT NOT NULL DEFAULT 'stopped',
            phase             TEXT NOT NULL DEFAULT 'work',
            start_time        INTEGER,
            duration_seconds  INTEGER NOT NULL DEFAULT 1500,
            created_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_timer_sessions_user
            ON timer_sessions(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
