use axum::{Extension, Json, extract::State};

use tandem_types::api::{PartnerState, PartnerStateResponse};

use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::{AppState, blocking};

/// The paired partner's snapshot over plain HTTP — same assembly the
/// gateway pushes, shaped for a one-shot read.
pub async fn partner_state(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<PartnerStateResponse>> {
    let Some(room_id) = user.room_id else {
        return Ok(Json(PartnerStateResponse { partner: None }));
    };

    let db = state.db.clone();
    let uid = user.id.to_string();
    let rid = room_id.to_string();
    let looked_up = blocking(move || {
        let Some(partner) = db.get_partner(&rid, &uid)? else {
            return Ok(None);
        };
        let active_task = db.get_active_task(&partner.id)?;
        let session = db.latest_session(&partner.id)?;
        Ok(Some((partner, active_task, session)))
    })
    .await?;

    let Some((partner, active_task, session)) = looked_up else {
        return Ok(Json(PartnerStateResponse { partner: None }));
    };

    let partner = partner.into_user()?;
    Ok(Json(PartnerStateResponse {
        partner: Some(PartnerState {
            id: partner.id,
            name: partner.name,
            active_task: active_task.map(|t| t.into_task()).transpose()?,
            timer_session: session.map(|s| s.into_session()).transpose()?,
        }),
    }))
}
