use axum::{Extension, Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use tandem_types::api::{LoginRequest, LoginResponse, MeResponse, OkResponse};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, INVITE_COOKIE, USER_COOKIE};
use crate::{AppState, blocking, pairing};

/// Pairing entry point: an invite code is the whole credential. Fresh
/// codes create the user and seat them in a room; known codes log back in.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let invite_code = req.invite_code.as_deref().map(str::trim).unwrap_or_default();
    let name = req.name.as_deref().map(str::trim).unwrap_or_default();
    if invite_code.is_empty() || name.is_empty() {
        return Err(ApiError::Validation(
            "invite code and name are required".into(),
        ));
    }

    let db = state.db.clone();
    let code = invite_code.to_string();
    let submitted_name = name.to_string();
    let row = blocking(move || pairing::resolve(&db, &code, &submitted_name)).await?;
    let user = row.into_user()?;

    let jar = jar
        .add(identity_cookie(USER_COOKIE, user.id.to_string()))
        .add(identity_cookie(INVITE_COOKIE, user.invite_code.clone()));

    Ok((jar, Json(LoginResponse { user })))
}

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse { user })
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<OkResponse>) {
    let jar = jar
        .remove(Cookie::build(USER_COOKIE).path("/").build())
        .remove(Cookie::build(INVITE_COOKIE).path("/").build());
    (jar, Json(OkResponse { success: true }))
}

fn identity_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(30))
        .build()
}
