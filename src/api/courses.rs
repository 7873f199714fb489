use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use super::{ApiJson, ApiQuery};
use crate::auth::Caller;
use crate::error::AppError;
use crate::models::*;
use crate::services::CourseService;
use crate::state::AppState;

#[derive(Deserialize)]
pub(super) struct CourseListParams {
    email: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct InstructorParams {
    email: String,
}

pub(super) async fn list_courses(
    State(state): State<AppState>,
    WithRejection(Query(params), _): ApiQuery<CourseListParams>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = CourseService::new(state.db)
        .list(params.email.as_deref())
        .await?;
    Ok(Json(courses))
}

pub(super) async fn latest_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = CourseService::new(state.db).latest().await?;
    Ok(Json(courses))
}

pub(super) async fn popular_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = CourseService::new(state.db).popular().await?;
    Ok(Json(courses))
}

pub(super) async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>, AppError> {
    let detail = CourseService::new(state.db).detail(&id).await?;
    Ok(Json(detail))
}

pub(super) async fn create_course(
    State(state): State<AppState>,
    caller: Caller,
    WithRejection(Json(req), _): ApiJson<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = CourseService::new(state.db).create(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub(super) async fn update_course(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    WithRejection(Json(req), _): ApiJson<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::new(state.db)
        .update(&caller, &id, req)
        .await?;
    Ok(Json(course))
}

pub(super) async fn delete_course(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<DeleteCourseResponse>, AppError> {
    let result = CourseService::new(state.db).delete(&caller, &id).await?;
    Ok(Json(result))
}

pub(super) async fn enrollment_summary(
    State(state): State<AppState>,
    caller: Caller,
    WithRejection(Query(params), _): ApiQuery<InstructorParams>,
) -> Result<Json<Vec<CourseEnrollmentSummary>>, AppError> {
    let summary = CourseService::new(state.db)
        .enrollment_summary(&caller, &params.email)
        .await?;
    Ok(Json(summary))
}
