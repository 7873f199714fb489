use axum::Json;
use axum::extract::State;
use axum_extra::extract::WithRejection;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiJson;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub(super) struct SessionRequest {
    email: String,
}

#[derive(Serialize)]
pub(super) struct SessionResponse {
    success: bool,
}

pub(super) async fn issue_session(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): ApiJson<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let sessions = state.sessions.as_ref().ok_or(AppError::NotFound)?;
    if req.email.trim().is_empty() {
        return Err(AppError::BadRequest("email is required".to_string()));
    }

    let token = sessions.issue(&req.email)?;
    info!("session issued for {}", req.email);

    Ok((
        jar.add(sessions.session_cookie(token)),
        Json(SessionResponse { success: true }),
    ))
}

pub(super) async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let sessions = state.sessions.as_ref().ok_or(AppError::NotFound)?;
    Ok((
        jar.add(sessions.removal_cookie()),
        Json(SessionResponse { success: true }),
    ))
}
