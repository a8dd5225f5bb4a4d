use crate::Database;
use crate::models::{TaskRow, TimerSessionRow, UserRow};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use tandem_types::models::{TimerPhase, TimerStatus};

impl Database {
    // -- Users & rooms --

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "SELECT id, name, invite_code, room_id, created_at FROM users WHERE id = ?1", id))
    }

    pub fn get_user_by_invite_code(&self, invite_code: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT id, name, invite_code, room_id, created_at FROM users WHERE invite_code = ?1",
                invite_code,
            )
        })
    }

    /// The other member of a room, if any.
    pub fn get_partner(&self, room_id: &str, user_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, invite_code, room_id, created_at FROM users
                 WHERE room_id = ?1 AND id != ?2 LIMIT 1",
            )?;
            stmt.query_row(rusqlite::params![room_id, user_id], user_from_row)
                .optional()
        })
    }

    /// Seat a new user: join a room that has exactly one member, or create
    /// `new_room_id`. The scan and both inserts run in one transaction under
    /// the connection lock, so two concurrent pairings cannot both grab the
    /// same half-empty room.
    pub fn pair_new_user(
        &self,
        user_id: &str,
        name: &str,
        invite_code: &str,
        new_room_id: &str,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let joinable: Option<String> = tx
                .query_row(
                    "SELECT r.id FROM rooms r
                     LEFT JOIN users u ON u.room_id = r.id
                     GROUP BY r.id
                     HAVING COUNT(u.id) = 1
                     LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;

            let room_id = match joinable {
                Some(id) => id,
                None => {
                    tx.execute("INSERT INTO rooms (id) VALUES (?1)", [new_room_id])?;
                    new_room_id.to_string()
                }
            };

            tx.execute(
                "INSERT INTO users (id, name, invite_code, room_id) VALUES (?1, ?2, ?3, ?4)",
                (user_id, name, invite_code, &room_id),
            )?;

            let row = query_user(
                &tx,
                "SELECT id, name, invite_code, room_id, created_at FROM users WHERE id = ?1",
                user_id,
            )?
            .ok_or_else(|| anyhow!("user row vanished after insert: {}", user_id))?;

            tx.commit()?;
            Ok(row)
        })
    }

    // -- Tasks --

    pub fn list_tasks(&self, user_id: &str) -> Result<Vec<TaskRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, is_active, created_at FROM tasks
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], task_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_task(&self, id: &str, user_id: &str, title: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, user_id, title, is_active) VALUES (?1, ?2, ?3, 0)",
                (id, user_id, title),
            )?;
            Ok(())
        })
    }

    /// A task only if it exists and belongs to the user.
    pub fn get_task(&self, id: &str, user_id: &str) -> Result<Option<TaskRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, is_active, created_at FROM tasks
                 WHERE id = ?1 AND user_id = ?2",
            )?;
            stmt.query_row(rusqlite::params![id, user_id], task_from_row)
                .optional()
        })
    }

    pub fn get_active_task(&self, user_id: &str) -> Result<Option<TaskRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, is_active, created_at FROM tasks
                 WHERE user_id = ?1 AND is_active = 1",
            )?;
            stmt.query_row([user_id], task_from_row).optional()
        })
    }

    /// Deactivate every task the user owns, then activate the one named.
    /// Returns `None` when the task is absent or owned by someone else.
    /// Both updates happen under one hold of the connection lock, so no
    /// interleaving can observe two active tasks.
    pub fn activate_task(&self, id: &str, user_id: &str) -> Result<Option<TaskRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, is_active, created_at FROM tasks
                 WHERE id = ?1 AND user_id = ?2",
            )?;
            let existing = stmt
                .query_row(rusqlite::params![id, user_id], task_from_row)
                .optional()?;
            if existing.is_none() {
                return Ok(None);
            }

            conn.execute("UPDATE tasks SET is_active = 0 WHERE user_id = ?1", [user_id])?;
            conn.execute("UPDATE tasks SET is_active = 1 WHERE id = ?1", [id])?;

            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, is_active, created_at FROM tasks WHERE id = ?1",
            )?;
            stmt.query_row([id], task_from_row).optional()
        })
    }

    /// Returns `true` when a row was deleted.
    pub fn delete_task(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Timer sessions --

    /// The user's current session: the most recently created row.
    pub fn latest_session(&self, user_id: &str) -> Result<Option<TimerSessionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, task_id, status, phase, start_time, duration_seconds, created_at
                 FROM timer_sessions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT 1",
            )?;
            stmt.query_row([user_id], session_from_row).optional()
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<TimerSessionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, task_id, status, phase, start_time, duration_seconds, created_at
                 FROM timer_sessions WHERE id = ?1",
            )?;
            stmt.query_row([id], session_from_row).optional()
        })
    }

    pub fn insert_session(
        &self,
        id: &str,
        user_id: &str,
        task_id: Option<&str>,
        status: TimerStatus,
        phase: TimerPhase,
        start_time: Option<i64>,
        duration_seconds: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO timer_sessions (id, user_id, task_id, status, phase, start_time, duration_seconds)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    user_id,
                    task_id,
                    status.as_str(),
                    phase.as_str(),
                    start_time,
                    duration_seconds
                ],
            )?;
            Ok(())
        })
    }

    /// Flip a session to running with a fresh start point and task link.
    pub fn start_session(
        &self,
        id: &str,
        phase: TimerPhase,
        start_time: i64,
        duration_seconds: i64,
        task_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE timer_sessions
                 SET status = 'running', phase = ?1, start_time = ?2, duration_seconds = ?3, task_id = ?4
                 WHERE id = ?5",
                rusqlite::params![phase.as_str(), start_time, duration_seconds, task_id, id],
            )?;
            Ok(())
        })
    }

    /// Pause and stop only flip the status; start_time and
    /// duration_seconds stay as-is until resume reconciles them.
    pub fn set_session_status(&self, id: &str, status: TimerStatus) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE timer_sessions SET status = ?1 WHERE id = ?2",
                rusqlite::params![status.as_str(), id],
            )?;
            Ok(())
        })
    }

    pub fn resume_session(&self, id: &str, start_time: i64, duration_seconds: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE timer_sessions
                 SET status = 'running', start_time = ?1, duration_seconds = ?2
                 WHERE id = ?3",
                rusqlite::params![start_time, duration_seconds, id],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, sql: &str, param: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    stmt.query_row([param], user_from_row).optional()
}

fn user_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        invite_code: row.get(2)?,
        room_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn task_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<TaskRow, rusqlite::Error> {
    Ok(TaskRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn session_from_row(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<TimerSessionRow, rusqlite::Error> {
    Ok(TimerSessionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_id: row.get(2)?,
        status: row.get(3)?,
        phase: row.get(4)?,
        start_time: row.get(5)?,
        duration_seconds: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_user(db: &Database, code: &str, name: &str) -> UserRow {
        let user_id = uuid::Uuid::new_v4().to_string();
        let room_id = uuid::Uuid::new_v4().to_string();
        db.pair_new_user(&user_id, name, code, &room_id).unwrap()
    }

    #[test]
    fn first_two_users_share_a_room_third_gets_a_new_one() {
        let db = Database::open_in_memory().unwrap();

        let a = seeded_user(&db, "code-a", "Ada");
        let b = seeded_user(&db, "code-b", "Brendan");
        let c = seeded_user(&db, "code-c", "Grace");

        assert_eq!(a.room_id, b.room_id);
        assert!(a.room_id.is_some());
        assert_ne!(a.room_id, c.room_id);
        assert!(c.room_id.is_some());
    }

    #[test]
    fn partner_lookup_excludes_self() {
        let db = Database::open_in_memory().unwrap();

        let a = seeded_user(&db, "code-a", "Ada");
        let b = seeded_user(&db, "code-b", "Brendan");

        let room = a.room_id.clone().unwrap();
        let partner = db.get_partner(&room, &a.id).unwrap().unwrap();
        assert_eq!(partner.id, b.id);

        // Solo user has no partner yet
        let c = seeded_user(&db, "code-c", "Grace");
        let solo_room = c.room_id.unwrap();
        assert!(db.get_partner(&solo_room, &c.id).unwrap().is_none());
    }

    #[test]
    fn activate_leaves_exactly_one_active_task() {
        let db = Database::open_in_memory().unwrap();
        let user = seeded_user(&db, "code-a", "Ada");

        db.insert_task("t1", &user.id, "write tests").unwrap();
        db.insert_task("t2", &user.id, "review patch").unwrap();
        db.insert_task("t3", &user.id, "ship it").unwrap();

        db.activate_task("t1", &user.id).unwrap().unwrap();
        db.activate_task("t3", &user.id).unwrap().unwrap();

        let active: Vec<_> = db
            .list_tasks(&user.id)
            .unwrap()
            .into_iter()
            .filter(|t| t.is_active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "t3");
    }

    #[test]
    fn activate_rejects_foreign_task() {
        let db = Database::open_in_memory().unwrap();
        let a = seeded_user(&db, "code-a", "Ada");
        let b = seeded_user(&db, "code-b", "Brendan");

        db.insert_task("t1", &a.id, "mine").unwrap();
        assert!(db.activate_task("t1", &b.id).unwrap().is_none());

        // Ada's task is untouched
        let task = db.get_task("t1", &a.id).unwrap().unwrap();
        assert!(!task.is_active);
    }

    #[test]
    fn deleting_the_active_task_leaves_none_active() {
        let db = Database::open_in_memory().unwrap();
        let user = seeded_user(&db, "code-a", "Ada");

        db.insert_task("t1", &user.id, "focus").unwrap();
        db.activate_task("t1", &user.id).unwrap().unwrap();

        // A session may reference the task; deletion must still succeed.
        db.insert_session(
            "s1",
            &user.id,
            Some("t1"),
            TimerStatus::Running,
            TimerPhase::Work,
            Some(0),
            1500,
        )
        .unwrap();

        assert!(db.delete_task("t1", &user.id).unwrap());
        assert!(db.get_active_task(&user.id).unwrap().is_none());

        // The session survives with its task link cleared.
        let session = db.get_session("s1").unwrap().unwrap();
        assert!(session.task_id.is_none());
    }

    #[test]
    fn latest_session_prefers_the_most_recent_row() {
        let db = Database::open_in_memory().unwrap();
        let user = seeded_user(&db, "code-a", "Ada");

        db.insert_session("s1", &user.id, None, TimerStatus::Stopped, TimerPhase::Work, None, 1500)
            .unwrap();
        db.insert_session("s2", &user.id, None, TimerStatus::Running, TimerPhase::Break, Some(42), 300)
            .unwrap();

        // Same created_at second; rowid breaks the tie toward the newer insert.
        let latest = db.latest_session(&user.id).unwrap().unwrap();
        assert_eq!(latest.id, "s2");
    }

    #[test]
    fn duplicate_invite_code_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        seeded_user(&db, "code-a", "Ada");

        let result = db.pair_new_user(
            &uuid::Uuid::new_v4().to_string(),
            "Impostor",
            "code-a",
            &uuid::Uuid::new_v4().to_string(),
        );
        assert!(result.is_err());
    }
}
