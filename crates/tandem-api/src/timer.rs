use anyhow::anyhow;
use axum::{Extension, Json, extract::State};
use uuid::Uuid;

use tandem_gateway::projection;
use tandem_types::api::{SessionResponse, StartTimerRequest};
use tandem_types::models::{TimerPhase, TimerStatus};

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::{AppState, blocking};

const DEFAULT_DURATION_SECONDS: i64 = 1500;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Current session, created lazily on first read.
pub async fn get_timer(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<SessionResponse>> {
    let db = state.db.clone();
    let uid = user.id.to_string();
    let row = blocking(move || {
        if let Some(row) = db.latest_session(&uid)? {
            return Ok(row);
        }
        let id = Uuid::new_v4().to_string();
        db.insert_session(
            &id,
            &uid,
            None,
            TimerStatus::Stopped,
            TimerPhase::Work,
            None,
            DEFAULT_DURATION_SECONDS,
        )?;
        db.get_session(&id)?
            .ok_or_else(|| anyhow!("session row vanished after insert: {}", id))
    })
    .await?;

    Ok(Json(SessionResponse {
        session: row.into_session()?,
    }))
}

/// Start is never guarded: from any state it begins a fresh run with the
/// caller's active task attached.
pub async fn start_timer(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<StartTimerRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let phase = req.phase.unwrap_or(TimerPhase::Work);
    let duration_seconds = req.duration_seconds.unwrap_or(DEFAULT_DURATION_SECONDS);
    if duration_seconds <= 0 {
        return Err(ApiError::Validation(
            "durationSeconds must be positive".into(),
        ));
    }

    let db = state.db.clone();
    let uid = user.id.to_string();
    let start = now_ms();
    let row = blocking(move || {
        let task_id = db.get_active_task(&uid)?.map(|t| t.id);

        match db.latest_session(&uid)? {
            Some(session) => {
                db.start_session(&session.id, phase, start, duration_seconds, task_id.as_deref())?;
                db.get_session(&session.id)?
                    .ok_or_else(|| anyhow!("session row vanished: {}", session.id))
            }
            None => {
                let id = Uuid::new_v4().to_string();
                db.insert_session(
                    &id,
                    &uid,
                    task_id.as_deref(),
                    TimerStatus::Running,
                    phase,
                    Some(start),
                    duration_seconds,
                )?;
                db.get_session(&id)?
                    .ok_or_else(|| anyhow!("session row vanished after insert: {}", id))
            }
        }
    })
    .await?;

    projection::push_user_state(state.db.clone(), &state.dispatcher, user.id, user.room_id).await;

    Ok(Json(SessionResponse {
        session: row.into_session()?,
    }))
}

/// Pause flips only the status. The stored start point goes stale on
/// purpose; resume reconciles it.
pub async fn pause_timer(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<SessionResponse>> {
    let db = state.db.clone();
    let uid = user.id.to_string();
    let session = blocking(move || db.latest_session(&uid))
        .await?
        .ok_or(ApiError::InvalidTransition("timer is not running"))?;

    tandem_timer::ensure_can_pause(session.parsed_status()?)?;

    let db = state.db.clone();
    let sid = session.id.clone();
    let row = blocking(move || {
        db.set_session_status(&sid, TimerStatus::Paused)?;
        db.get_session(&sid)?
            .ok_or_else(|| anyhow!("session row vanished: {}", sid))
    })
    .await?;

    projection::push_user_state(state.db.clone(), &state.dispatcher, user.id, user.room_id).await;

    Ok(Json(SessionResponse {
        session: row.into_session()?,
    }))
}

pub async fn resume_timer(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<SessionResponse>> {
    let db = state.db.clone();
    let uid = user.id.to_string();
    let session = blocking(move || db.latest_session(&uid))
        .await?
        .ok_or(ApiError::InvalidTransition("timer is not paused"))?;

    tandem_timer::ensure_can_resume(session.parsed_status()?)?;

    let start_time = session
        .start_time
        .ok_or_else(|| anyhow!("paused session {} has no start_time", session.id))?;
    let point = tandem_timer::reconcile_resume(start_time, session.duration_seconds, now_ms());

    let db = state.db.clone();
    let sid = session.id.clone();
    let row = blocking(move || {
        db.resume_session(&sid, point.start_time, point.duration_seconds)?;
        db.get_session(&sid)?
            .ok_or_else(|| anyhow!("session row vanished: {}", sid))
    })
    .await?;

    projection::push_user_state(state.db.clone(), &state.dispatcher, user.id, user.room_id).await;

    Ok(Json(SessionResponse {
        session: row.into_session()?,
    }))
}

/// Stop is legal from any state, but only once a session exists.
pub async fn stop_timer(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<SessionResponse>> {
    let db = state.db.clone();
    let uid = user.id.to_string();
    let session = blocking(move || db.latest_session(&uid))
        .await?
        .ok_or(ApiError::NotFound("timer session"))?;

    let db = state.db.clone();
    let sid = session.id.clone();
    let row = blocking(move || {
        db.set_session_status(&sid, TimerStatus::Stopped)?;
        db.get_session(&sid)?
            .ok_or_else(|| anyhow!("session row vanished: {}", sid))
    })
    .await?;

    projection::push_user_state(state.db.clone(), &state.dispatcher, user.id, user.room_id).await;

    Ok(Json(SessionResponse {
        session: row.into_session()?,
    }))
}
