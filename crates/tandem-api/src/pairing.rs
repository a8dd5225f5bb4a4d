use anyhow::Result;
use uuid::Uuid;

use tandem_db::{Database, models::UserRow};

/// Resolve an invite code to a user. An existing code logs straight back
/// in — the stored name wins over whatever was submitted. A fresh code
/// creates the user and seats them in a room that has exactly one member,
/// or in a brand-new room when none is waiting.
pub fn resolve(db: &Database, invite_code: &str, name: &str) -> Result<UserRow> {
    if let Some(user) = db.get_user_by_invite_code(invite_code)? {
        return Ok(user);
    }

    let user_id = Uuid::new_v4().to_string();
    let room_id = Uuid::new_v4().to_string();
    db.pair_new_user(&user_id, name, invite_code, &room_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_login_returns_the_same_user_unchanged() {
        let db = Database::open_in_memory().unwrap();

        let first = resolve(&db, "shared-secret", "Ada").unwrap();
        let second = resolve(&db, "shared-secret", "Somebody Else").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Ada");
        assert_eq!(first.room_id, second.room_id);
    }

    #[test]
    fn sequential_pairing_fills_rooms_two_at_a_time() {
        let db = Database::open_in_memory().unwrap();

        let a = resolve(&db, "code-a", "Ada").unwrap();
        let b = resolve(&db, "code-b", "Brendan").unwrap();
        let c = resolve(&db, "code-c", "Grace").unwrap();
        let d = resolve(&db, "code-d", "Dennis").unwrap();

        assert_eq!(a.room_id, b.room_id);
        assert_eq!(c.room_id, d.room_id);
        assert_ne!(a.room_id, c.room_id);
    }
}
