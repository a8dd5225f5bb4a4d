use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use tandem_db::Database;
use tandem_types::events::{GatewayCommand, GatewayEvent};
use tandem_types::models::User;

use crate::dispatcher::Dispatcher;
use crate::projection;

/// Drive one websocket connection. Identity was already resolved from the
/// cookie at the HTTP upgrade, so registration happens immediately.
pub async fn handle_connection(
    socket: WebSocket,
    db: Arc<Database>,
    dispatcher: Dispatcher,
    user: User,
) {
    let (mut sender, mut receiver) = socket.split();
    let user_id = user.id;
    let room_id = user.room_id;

    info!("{} ({}) connected", user.name, user_id);

    let (conn_id, mut events_rx) = dispatcher.register(user_id).await;
    if let Some(room_id) = room_id {
        dispatcher.join_room(room_id, user_id).await;
    }

    // Initial snapshot goes to the whole room, not just this connection,
    // so a freshly joined partner refreshes the other side's view too.
    projection::push_user_state(db.clone(), &dispatcher, user_id, room_id).await;

    // Forward dispatched events to the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("failed to encode event for {}: {}", user_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read client messages. Malformed input is logged and dropped; it
    // never closes the connection.
    let recv_dispatcher = dispatcher.clone();
    let recv_db = db.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&recv_db, &recv_dispatcher, user_id, room_id, cmd).await;
                    }
                    Err(e) => {
                        warn!("{} sent a bad message ({} bytes): {}", user_id, text.len(), e);
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.disconnect(user_id, room_id, conn_id).await;
    info!("{} ({}) disconnected", user.name, user_id);
}

async fn handle_command(
    db: &Arc<Database>,
    dispatcher: &Dispatcher,
    user_id: Uuid,
    room_id: Option<Uuid>,
    cmd: GatewayCommand,
) {
    match cmd {
        // Heartbeat is advisory and client-driven; the reply goes to the
        // pinging connection only.
        GatewayCommand::Ping => dispatcher.send_to_user(user_id, GatewayEvent::Pong).await,
        GatewayCommand::StateRequest => {
            projection::push_user_state(db.clone(), dispatcher, user_id, room_id).await;
        }
    }
}
