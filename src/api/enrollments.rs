use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use super::{ApiJson, ApiQuery};
use crate::auth::Caller;
use crate::error::AppError;
use crate::models::*;
use crate::services::EnrollmentService;
use crate::state::AppState;

#[derive(Deserialize)]
pub(super) struct StudentParams {
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CheckParams {
    email: String,
    course_id: String,
}

pub(super) async fn list_enrollments(
    State(state): State<AppState>,
    caller: Caller,
    WithRejection(Query(params), _): ApiQuery<StudentParams>,
) -> Result<Json<Vec<EnrollmentWithCourse>>, AppError> {
    let enrollments = EnrollmentService::new(state.db)
        .list_for_student(&caller, &params.email)
        .await?;
    Ok(Json(enrollments))
}

pub(super) async fn check_enrollment(
    State(state): State<AppState>,
    caller: Caller,
    WithRejection(Query(params), _): ApiQuery<CheckParams>,
) -> Result<Json<EnrollmentCheck>, AppError> {
    let check = EnrollmentService::new(state.db)
        .check(&caller, &params.email, &params.course_id)
        .await?;
    Ok(Json(check))
}

pub(super) async fn count_enrollments(
    State(state): State<AppState>,
    caller: Caller,
    WithRejection(Query(params), _): ApiQuery<StudentParams>,
) -> Result<Json<EnrollmentCount>, AppError> {
    let count = EnrollmentService::new(state.db)
        .count(&caller, &params.email)
        .await?;
    Ok(Json(count))
}

pub(super) async fn create_enrollment(
    State(state): State<AppState>,
    caller: Caller,
    WithRejection(Json(req), _): ApiJson<NewEnrollmentRequest>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = EnrollmentService::new(state.db).enroll(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub(super) async fn delete_enrollment(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = EnrollmentService::new(state.db).withdraw(&caller, &id).await?;
    Ok(Json(enrollment))
}
