use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;

use tandem_types::models::User;

use crate::error::ApiError;
use crate::{AppState, blocking};

pub const USER_COOKIE: &str = "userId";
pub const INVITE_COOKIE: &str = "inviteCode";

/// Identity resolved from the session cookie, attached to authenticated
/// requests via extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolve the `userId` cookie against the store. Missing or unknown
/// identity is 401 — distinct from input validation failures.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = jar
        .get(USER_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::NotAuthenticated)?;

    let db = state.db.clone();
    let row = blocking(move || db.get_user_by_id(&user_id))
        .await?
        .ok_or(ApiError::NotAuthenticated)?;

    req.extensions_mut().insert(CurrentUser(row.into_user()?));
    Ok(next.run(req).await)
}
