use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Task, TimerSession};

/// Events sent over the websocket to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayEvent {
    /// Heartbeat reply, sent to the pinging connection only.
    #[serde(rename = "pong")]
    Pong,

    /// One user's full state, fanned out to their whole room.
    #[serde(rename = "user:state")]
    UserState {
        #[serde(rename = "userId")]
        user_id: Uuid,
        data: StateSnapshot,
    },
}

/// Messages sent from client to server over the websocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayCommand {
    /// Client-driven heartbeat.
    #[serde(rename = "ping")]
    Ping,

    /// Ask the server to re-push the caller's snapshot to the room.
    #[serde(rename = "state:request")]
    StateRequest,
}

/// The outward snapshot of a user: identity, active task, current timer
/// session. Either of the latter may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub user: UserSummary,
    #[serde(rename = "activeTask")]
    pub active_task: Option<Task>,
    #[serde(rename = "timerSession")]
    pub timer_session: Option<TimerSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_wire_shape() {
        let json = serde_json::to_value(&GatewayEvent::Pong).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "pong" }));
    }

    #[test]
    fn user_state_wire_shape() {
        let user_id = Uuid::new_v4();
        let event = GatewayEvent::UserState {
            user_id,
            data: StateSnapshot {
                user: UserSummary {
                    id: user_id,
                    name: "ada".into(),
                },
                active_task: None,
                timer_session: None,
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "user:state");
        assert_eq!(json["userId"], user_id.to_string());
        assert_eq!(json["data"]["user"]["name"], "ada");
        assert!(json["data"]["activeTask"].is_null());
        assert!(json["data"]["timerSession"].is_null());
    }

    #[test]
    fn commands_parse_from_wire_tags() {
        let ping: GatewayCommand = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, GatewayCommand::Ping));

        let req: GatewayCommand = serde_json::from_str(r#"{"type":"state:request"}"#).unwrap();
        assert!(matches!(req, GatewayCommand::StateRequest));
    }

    #[test]
    fn unknown_command_type_is_an_error() {
        assert!(serde_json::from_str::<GatewayCommand>(r#"{"type":"nope"}"#).is_err());
    }
}
