mod courses;
mod enrollments;
mod session;

use axum::http::{HeaderValue, Method, header};
use axum::routing::{delete, post};
use axum::{Json, Router, extract::{Query, State}, http::StatusCode, routing::get};
use axum_extra::extract::WithRejection;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// `Query` whose rejection is reported as an `AppError`.
type ApiQuery<T> = WithRejection<Query<T>, AppError>;
/// `Json` whose rejection is reported as an `AppError`.
type ApiJson<T> = WithRejection<Json<T>, AppError>;

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/courses", get(courses::list_courses).post(courses::create_course))
        .route("/courses/enrollments", get(courses::enrollment_summary))
        .route(
            "/courses/{id}",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/course/{id}", get(courses::get_course))
        .route("/latest", get(courses::latest_courses))
        .route("/popular", get(courses::popular_courses))
        .route(
            "/enrollments",
            get(enrollments::list_enrollments).post(enrollments::create_enrollment),
        )
        .route("/enrollments/check", get(enrollments::check_enrollment))
        .route("/enrollments/count", get(enrollments::count_enrollments))
        .route("/enrollments/{id}", delete(enrollments::delete_enrollment));

    if state.sessions.is_some() {
        router = router
            .route("/jwt", post(session::issue_session))
            .route("/logout", post(session::logout));
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the configured front-end origins; cookies are not
/// sent cross-origin otherwise.
pub fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn root() -> &'static str {
    "Welcome to Edu-Learn-Server"
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}
