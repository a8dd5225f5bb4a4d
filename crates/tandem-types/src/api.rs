use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Task, TimerPhase, TimerSession, User};

// -- Auth --

/// Fields are optional so a missing value surfaces as a validation error
/// rather than a body-decode rejection.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "inviteCode", default)]
    pub invite_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub success: bool,
}

// -- Tasks --

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task: Task,
}

// -- Timer --

#[derive(Debug, Deserialize)]
pub struct StartTimerRequest {
    #[serde(default)]
    pub phase: Option<TimerPhase>,
    #[serde(rename = "durationSeconds", default)]
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: TimerSession,
}

// -- Partner --

#[derive(Debug, Serialize)]
pub struct PartnerStateResponse {
    pub partner: Option<PartnerState>,
}

#[derive(Debug, Serialize)]
pub struct PartnerState {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "activeTask")]
    pub active_task: Option<Task>,
    #[serde(rename = "timerSession")]
    pub timer_session: Option<TimerSession>,
}
