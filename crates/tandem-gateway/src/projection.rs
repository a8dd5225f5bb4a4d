use std::sync::Arc;

use anyhow::Result;
use tracing::warn;
use uuid::Uuid;

use tandem_db::Database;
use tandem_types::events::{GatewayEvent, StateSnapshot, UserSummary};

use crate::dispatcher::Dispatcher;

/// Assemble the outward snapshot for a user: identity, active task,
/// most-recent timer session. Always recomputed from the store — no cache
/// sits between a mutation and what the room sees.
pub fn user_state(db: &Database, user_id: &str) -> Result<Option<StateSnapshot>> {
    let Some(user) = db.get_user_by_id(user_id)? else {
        return Ok(None);
    };
    let active_task = db.get_active_task(user_id)?;
    let session = db.latest_session(user_id)?;

    let user = user.into_user()?;
    Ok(Some(StateSnapshot {
        user: UserSummary {
            id: user.id,
            name: user.name,
        },
        active_task: active_task.map(|t| t.into_task()).transpose()?,
        timer_session: session.map(|s| s.into_session()).transpose()?,
    }))
}

/// Recompute a user's snapshot and fan it out to their whole room, their
/// own connection included. Failures are logged and swallowed so one bad
/// push never disturbs the mutation that triggered it or any other
/// connection.
pub async fn push_user_state(
    db: Arc<Database>,
    dispatcher: &Dispatcher,
    user_id: Uuid,
    room_id: Option<Uuid>,
) {
    let uid = user_id.to_string();
    let snapshot = tokio::task::spawn_blocking(move || user_state(&db, &uid)).await;

    let snapshot = match snapshot {
        Ok(Ok(Some(snapshot))) => snapshot,
        Ok(Ok(None)) => return,
        Ok(Err(e)) => {
            warn!("state projection failed for {}: {:#}", user_id, e);
            return;
        }
        Err(e) => {
            warn!("state projection task for {} died: {}", user_id, e);
            return;
        }
    };

    let event = GatewayEvent::UserState {
        user_id,
        data: snapshot,
    };

    match room_id {
        Some(room_id) => dispatcher.broadcast_to_room(room_id, event).await,
        // A user without a room can still refresh their own tabs.
        None => dispatcher.send_to_user(user_id, event).await,
    }
}
