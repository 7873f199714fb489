use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::Caller;
use crate::db::{self, repository};
use crate::error::AppError;
use crate::models::{
    Course, CourseDetail, CourseEnrollmentSummary, DeleteCourseResponse, NewCourseRequest,
    UpdateCourseRequest,
};

pub const LATEST_LIMIT: i64 = 6;
pub const POPULAR_LIMIT: i64 = 6;

/// Course catalogue rules: validation, ownership and cascading deletes.
pub struct CourseService {
    db: SqlitePool,
}

impl CourseService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Every course, or one instructor's when `instructor_email` is given.
    pub async fn list(&self, instructor_email: Option<&str>) -> Result<Vec<Course>, AppError> {
        Ok(repository::fetch_courses(&self.db, instructor_email).await?)
    }

    pub async fn latest(&self) -> Result<Vec<Course>, AppError> {
        Ok(repository::fetch_latest_courses(&self.db, LATEST_LIMIT).await?)
    }

    pub async fn popular(&self) -> Result<Vec<Course>, AppError> {
        Ok(repository::fetch_popular_courses(&self.db, POPULAR_LIMIT).await?)
    }

    pub async fn detail(&self, id: &str) -> Result<CourseDetail, AppError> {
        let course = repository::find_course_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(course.into())
    }

    pub async fn create(&self, caller: &Caller, req: NewCourseRequest) -> Result<Course, AppError> {
        validate_new_course(&req)?;
        caller.ensure_email(&req.instructor_email)?;

        let course = repository::insert_course(&self.db, req, Utc::now()).await?;
        info!("course {} published by {}", course.id, course.instructor_email);
        Ok(course)
    }

    /// Applies the present fields of `req`. Only the course's instructor may
    /// edit it, and seats cannot drop below the students already enrolled.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &str,
        req: UpdateCourseRequest,
    ) -> Result<Course, AppError> {
        let mut tx = db::begin_write(&self.db).await?;

        let mut current = repository::find_course_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound)?;
        caller.ensure_email(&current.instructor_email)?;

        if let Some(title) = req.title {
            current.title = title;
        }
        if let Some(instructor_name) = req.instructor_name {
            current.instructor_name = instructor_name;
        }
        if let Some(duration) = req.duration {
            current.duration = duration;
        }
        if let Some(total_seats) = req.total_seats {
            current.total_seats = total_seats;
        }

        if current.title.trim().is_empty() {
            return Err(AppError::BadRequest("title is required".to_string()));
        }
        if current.total_seats < current.enrolled_count {
            return Err(AppError::BadRequest(format!(
                "totalSeats cannot be lower than the {} students already enrolled",
                current.enrolled_count
            )));
        }

        repository::update_course(&mut *tx, &current).await?;
        tx.commit().await?;

        info!("course {} updated", current.id);
        Ok(current)
    }

    /// Removes the course together with its enrollments.
    pub async fn delete(&self, caller: &Caller, id: &str) -> Result<DeleteCourseResponse, AppError> {
        let mut tx = db::begin_write(&self.db).await?;

        let course = repository::find_course_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound)?;
        caller.ensure_email(&course.instructor_email)?;

        let removed_enrollments = repository::delete_enrollments_for_course(&mut *tx, id).await?;
        let deleted = repository::delete_course(&mut *tx, id).await?;
        tx.commit().await?;

        info!(
            "course {} deleted ({} enrollments removed)",
            id, removed_enrollments
        );
        Ok(DeleteCourseResponse {
            deleted_count: u64::from(deleted),
            removed_enrollments,
        })
    }

    pub async fn enrollment_summary(
        &self,
        caller: &Caller,
        instructor_email: &str,
    ) -> Result<Vec<CourseEnrollmentSummary>, AppError> {
        caller.ensure_email(instructor_email)?;

        let courses = repository::fetch_courses(&self.db, Some(instructor_email)).await?;
        Ok(courses.into_iter().map(CourseEnrollmentSummary::from).collect())
    }
}

fn validate_new_course(req: &NewCourseRequest) -> Result<(), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    if req.instructor_email.trim().is_empty() {
        return Err(AppError::BadRequest("instructorEmail is required".to_string()));
    }
    if req.total_seats < 0 {
        return Err(AppError::BadRequest("totalSeats must not be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::models::NewEnrollmentRequest;
    use crate::services::EnrollmentService;

    const INSTRUCTOR: &str = "ada@example.com";

    async fn setup() -> (SqlitePool, CourseService) {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let service = CourseService::new(pool.clone());
        (pool, service)
    }

    fn new_course(title: &str, total_seats: i64) -> NewCourseRequest {
        NewCourseRequest {
            title: title.to_string(),
            instructor_name: "Ada Lovelace".to_string(),
            instructor_email: INSTRUCTOR.to_string(),
            duration: "8 weeks".to_string(),
            total_seats,
        }
    }

    #[tokio::test]
    async fn test_create_and_detail_seats_left() {
        let (pool, service) = setup().await;
        let course = service
            .create(&Caller::verified(INSTRUCTOR), new_course("Rust 101", 25))
            .await
            .expect("create");

        EnrollmentService::new(pool.clone())
            .enroll(
                &Caller::anonymous(),
                NewEnrollmentRequest {
                    student: "sam@example.com".to_string(),
                    course_id: course.id.clone(),
                },
            )
            .await
            .expect("enroll");

        let detail = service.detail(&course.id).await.expect("detail");
        assert_eq!(detail.course.enrolled_count, 1);
        assert_eq!(detail.seats_left, 24);

        assert!(matches!(service.detail("missing").await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_create_validates_and_checks_owner() {
        let (_pool, service) = setup().await;

        assert!(matches!(
            service.create(&Caller::anonymous(), new_course("  ", 10)).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.create(&Caller::anonymous(), new_course("Rust", -1)).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service
                .create(&Caller::verified("mallory@example.com"), new_course("Rust", 10))
                .await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (_pool, service) = setup().await;
        let caller = Caller::verified(INSTRUCTOR);
        let course = service.create(&caller, new_course("Rust 101", 25)).await.unwrap();

        let updated = service
            .update(
                &caller,
                &course.id,
                UpdateCourseRequest {
                    title: Some("Rust 201".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.title, "Rust 201");
        assert_eq!(updated.total_seats, 25);
        assert_eq!(updated.duration, "8 weeks");

        let err = service
            .update(
                &Caller::verified("mallory@example.com"),
                &course.id,
                UpdateCourseRequest::default(),
            )
            .await
            .expect_err("foreign instructor");
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_update_cannot_shrink_below_enrolled() {
        let (pool, service) = setup().await;
        let course = service
            .create(&Caller::anonymous(), new_course("Rust 101", 2))
            .await
            .unwrap();
        repository::increment_enrolled_count(&pool, &course.id).await.unwrap();
        repository::increment_enrolled_count(&pool, &course.id).await.unwrap();

        let err = service
            .update(
                &Caller::anonymous(),
                &course.id,
                UpdateCourseRequest {
                    total_seats: Some(1),
                    ..Default::default()
                },
            )
            .await
            .expect_err("shrink below enrolled");
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_enrollments() {
        let (pool, service) = setup().await;
        let course = service
            .create(&Caller::anonymous(), new_course("Rust 101", 10))
            .await
            .unwrap();
        EnrollmentService::new(pool.clone())
            .enroll(
                &Caller::anonymous(),
                NewEnrollmentRequest {
                    student: "sam@example.com".to_string(),
                    course_id: course.id.clone(),
                },
            )
            .await
            .unwrap();

        let result = service.delete(&Caller::anonymous(), &course.id).await.expect("delete");
        assert_eq!(result.deleted_count, 1);
        assert_eq!(result.removed_enrollments, 1);
        assert_eq!(
            repository::count_active_enrollments(&pool, "sam@example.com").await.unwrap(),
            0
        );

        assert!(matches!(
            service.delete(&Caller::anonymous(), &course.id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_enrollment_summary_requires_matching_email() {
        let (_pool, service) = setup().await;
        let caller = Caller::verified(INSTRUCTOR);
        service.create(&caller, new_course("Rust 101", 10)).await.unwrap();

        let summary = service.enrollment_summary(&caller, INSTRUCTOR).await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].seats_left, 10);

        assert!(matches!(
            service.enrollment_summary(&caller, "rob@example.com").await,
            Err(AppError::Forbidden(_))
        ));
    }
}
