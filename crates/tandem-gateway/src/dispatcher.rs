use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use tandem_types::events::GatewayEvent;

/// Owns the live-connection and room-membership registries and fans
/// events out. Both registries are populated on connect and purged on
/// disconnect; nothing outside this struct holds connection state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// user_id -> (conn_id, sender). At most one live connection per user;
    /// a reconnect replaces the entry.
    connections: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,

    /// room_id -> members with a live connection.
    rooms: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                connections: RwLock::new(HashMap::new()),
                rooms: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a connection for a user, displacing any prior one.
    /// Returns (conn_id, receiver).
    pub async fn register(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .connections
            .write()
            .await
            .insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    pub async fn join_room(&self, room_id: Uuid, user_id: Uuid) {
        self.inner
            .rooms
            .write()
            .await
            .entry(room_id)
            .or_default()
            .insert(user_id);
    }

    /// Tear down a connection, but only if `conn_id` still owns the entry —
    /// a newer connection may have replaced it, in which case the stale
    /// close must not touch anything.
    pub async fn disconnect(&self, user_id: Uuid, room_id: Option<Uuid>, conn_id: Uuid) {
        {
            let mut connections = self.inner.connections.write().await;
            match connections.get(&user_id) {
                Some((current, _)) if *current == conn_id => {
                    connections.remove(&user_id);
                }
                _ => return,
            }
        }

        if let Some(room_id) = room_id {
            let mut rooms = self.inner.rooms.write().await;
            if let Some(members) = rooms.get_mut(&room_id) {
                members.remove(&user_id);
                if members.is_empty() {
                    rooms.remove(&room_id);
                }
            }
        }
    }

    /// Best-effort targeted send. A user with no live connection, or one
    /// whose receiver is already gone, is silently skipped.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let connections = self.inner.connections.read().await;
        if let Some((_, tx)) = connections.get(&user_id) {
            let _ = tx.send(event);
        }
    }

    /// Deliver to every connected member of the room, the originator's own
    /// connection included. One dead recipient never affects the others.
    pub async fn broadcast_to_room(&self, room_id: Uuid, event: GatewayEvent) {
        let members: Vec<Uuid> = {
            let rooms = self.inner.rooms.read().await;
            match rooms.get(&room_id) {
                Some(members) => members.iter().copied().collect(),
                None => return,
            }
        };

        let connections = self.inner.connections.read().await;
        for user_id in members {
            if let Some((_, tx)) = connections.get(&user_id) {
                let _ = tx.send(event.clone());
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recv_now(rx: &mut mpsc::UnboundedReceiver<GatewayEvent>) -> Option<GatewayEvent> {
        rx.try_recv().ok()
    }

    #[tokio::test]
    async fn broadcast_reaches_the_whole_room_and_nobody_else() {
        let dispatcher = Dispatcher::new();
        let room = Uuid::new_v4();
        let other_room = Uuid::new_v4();
        let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let (_, mut alice_rx) = dispatcher.register(alice).await;
        let (_, mut bob_rx) = dispatcher.register(bob).await;
        let (_, mut carol_rx) = dispatcher.register(carol).await;
        dispatcher.join_room(room, alice).await;
        dispatcher.join_room(room, bob).await;
        dispatcher.join_room(other_room, carol).await;

        dispatcher.broadcast_to_room(room, GatewayEvent::Pong).await;

        // Sender's own connection is included by design.
        assert!(recv_now(&mut alice_rx).is_some());
        assert!(recv_now(&mut bob_rx).is_some());
        assert!(recv_now(&mut carol_rx).is_none());
    }

    #[tokio::test]
    async fn reconnect_displaces_the_prior_connection() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let room = Uuid::new_v4();

        let (old_conn, mut old_rx) = dispatcher.register(user).await;
        dispatcher.join_room(room, user).await;

        let (_, mut new_rx) = dispatcher.register(user).await;
        dispatcher.join_room(room, user).await;

        dispatcher.send_to_user(user, GatewayEvent::Pong).await;
        assert!(recv_now(&mut new_rx).is_some());
        assert!(recv_now(&mut old_rx).is_none());

        // The displaced connection's close must not tear down the new
        // registration or the room membership.
        dispatcher.disconnect(user, Some(room), old_conn).await;
        dispatcher.broadcast_to_room(room, GatewayEvent::Pong).await;
        assert!(recv_now(&mut new_rx).is_some());
    }

    #[tokio::test]
    async fn disconnect_purges_both_registries() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let partner = Uuid::new_v4();
        let room = Uuid::new_v4();

        let (conn, _rx) = dispatcher.register(user).await;
        let (_, mut partner_rx) = dispatcher.register(partner).await;
        dispatcher.join_room(room, user).await;
        dispatcher.join_room(room, partner).await;

        dispatcher.disconnect(user, Some(room), conn).await;

        dispatcher.send_to_user(user, GatewayEvent::Pong).await;
        dispatcher.broadcast_to_room(room, GatewayEvent::Pong).await;

        // Partner still gets room traffic; the departed user is gone.
        assert!(recv_now(&mut partner_rx).is_some());
        assert!(recv_now(&mut partner_rx).is_none());
    }

    #[tokio::test]
    async fn send_to_dropped_receiver_is_a_no_op() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let room = Uuid::new_v4();

        let (_, rx) = dispatcher.register(user).await;
        dispatcher.join_room(room, user).await;
        drop(rx);

        // An in-flight projection may still target the closed connection.
        dispatcher.send_to_user(user, GatewayEvent::Pong).await;
        dispatcher.broadcast_to_room(room, GatewayEvent::Pong).await;
    }
}
