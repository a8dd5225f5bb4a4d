use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use tandem_gateway::projection;
use tandem_types::api::{CreateTaskRequest, OkResponse, TaskResponse, TasksResponse};

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::{AppState, blocking};

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<TasksResponse>> {
    let db = state.db.clone();
    let uid = user.id.to_string();
    let rows = blocking(move || db.list_tasks(&uid)).await?;

    let tasks = rows
        .into_iter()
        .map(|row| row.into_task())
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(TasksResponse { tasks }))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let title = req.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(ApiError::Validation("task title is required".into()));
    }

    let db = state.db.clone();
    let uid = user.id.to_string();
    let task_id = Uuid::new_v4().to_string();
    let stored_title = title.to_string();
    let row = blocking(move || {
        db.insert_task(&task_id, &uid, &stored_title)?;
        db.get_task(&task_id, &uid)?
            .ok_or_else(|| anyhow!("task row vanished after insert: {}", task_id))
    })
    .await?;

    projection::push_user_state(state.db.clone(), &state.dispatcher, user.id, user.room_id).await;

    Ok(Json(TaskResponse {
        task: row.into_task()?,
    }))
}

/// Activating a task deactivates every sibling first; at most one task per
/// user is ever active.
pub async fn activate_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let db = state.db.clone();
    let uid = user.id.to_string();
    let tid = task_id.to_string();
    let row = blocking(move || db.activate_task(&tid, &uid))
        .await?
        .ok_or(ApiError::NotFound("task"))?;

    projection::push_user_state(state.db.clone(), &state.dispatcher, user.id, user.room_id).await;

    Ok(Json(TaskResponse {
        task: row.into_task()?,
    }))
}

/// Deleting the active task leaves the user with no active task, and the
/// partner sees that null state in the broadcast.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<OkResponse>> {
    let db = state.db.clone();
    let uid = user.id.to_string();
    let tid = task_id.to_string();
    let deleted = blocking(move || db.delete_task(&tid, &uid)).await?;
    if !deleted {
        return Err(ApiError::NotFound("task"));
    }

    projection::push_user_state(state.db.clone(), &state.dispatcher, user.id, user.room_id).await;

    Ok(Json(OkResponse { success: true }))
}
