use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::Caller;
use crate::db::{self, repository};
use crate::error::AppError;
use crate::models::{
    Enrollment, EnrollmentCheck, EnrollmentCount, EnrollmentWithCourse, NewEnrollmentRequest,
};

/// A student may hold at most this many active enrollments.
pub const MAX_ACTIVE_ENROLLMENTS: i64 = 3;

pub struct EnrollmentService {
    db: SqlitePool,
}

impl EnrollmentService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Inserts the enrollment and bumps the course counter in one
    /// transaction; any rejection leaves both untouched.
    pub async fn enroll(
        &self,
        caller: &Caller,
        req: NewEnrollmentRequest,
    ) -> Result<Enrollment, AppError> {
        if req.student.trim().is_empty() || req.course_id.trim().is_empty() {
            return Err(AppError::BadRequest(
                "student and courseId are required".to_string(),
            ));
        }
        caller.ensure_email(&req.student)?;

        let mut tx = db::begin_write(&self.db).await?;

        let course = repository::find_course_by_id(&mut *tx, &req.course_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if repository::find_enrollment(&mut *tx, &req.student, &course.id)
            .await?
            .is_some()
        {
            warn!("duplicate enrollment: {} -> {}", req.student, course.id);
            return Err(AppError::Conflict(
                "already enrolled in this course".to_string(),
            ));
        }

        let active = repository::count_active_enrollments(&mut *tx, &req.student).await?;
        if active >= MAX_ACTIVE_ENROLLMENTS {
            warn!("enrollment limit reached for {}", req.student);
            return Err(AppError::BadRequest(format!(
                "cannot enroll in more than {} courses",
                MAX_ACTIVE_ENROLLMENTS
            )));
        }

        let enrollment = match repository::insert_enrollment(&mut *tx, req, Utc::now()).await {
            Ok(enrollment) => enrollment,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::Conflict(
                    "already enrolled in this course".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        repository::increment_enrolled_count(&mut *tx, &course.id).await?;
        tx.commit().await?;

        info!("{} enrolled in course {}", enrollment.student, enrollment.course_id);
        Ok(enrollment)
    }

    /// Deletes the enrollment and decrements the course counter (never below
    /// zero) in one transaction. Returns the removed enrollment.
    pub async fn withdraw(&self, caller: &Caller, id: &str) -> Result<Enrollment, AppError> {
        let enrollment = repository::find_enrollment_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)?;
        caller.ensure_email(&enrollment.student)?;

        let mut tx = db::begin_write(&self.db).await?;

        if !repository::delete_enrollment(&mut *tx, id).await? {
            return Err(AppError::NotFound);
        }
        if !repository::decrement_enrolled_count(&mut *tx, &enrollment.course_id).await? {
            warn!(
                "course {} counter not decremented (missing or already zero)",
                enrollment.course_id
            );
        }

        tx.commit().await?;

        info!("{} withdrew from course {}", enrollment.student, enrollment.course_id);
        Ok(enrollment)
    }

    /// The student's enrollments with their courses attached.
    pub async fn list_for_student(
        &self,
        caller: &Caller,
        student: &str,
    ) -> Result<Vec<EnrollmentWithCourse>, AppError> {
        caller.ensure_email(student)?;

        let enrollments = repository::fetch_enrollments_by_student(&self.db, student).await?;
        let mut result = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let course = repository::find_course_by_id(&self.db, &enrollment.course_id).await?;
            result.push(EnrollmentWithCourse { enrollment, course });
        }

        Ok(result)
    }

    pub async fn check(
        &self,
        caller: &Caller,
        student: &str,
        course_id: &str,
    ) -> Result<EnrollmentCheck, AppError> {
        caller.ensure_email(student)?;

        let existing = repository::find_enrollment(&self.db, student, course_id).await?;
        Ok(EnrollmentCheck {
            enrolled: existing.is_some(),
            enrollment_id: existing.map(|e| e.id),
        })
    }

    pub async fn count(&self, caller: &Caller, student: &str) -> Result<EnrollmentCount, AppError> {
        caller.ensure_email(student)?;

        let count = repository::count_active_enrollments(&self.db, student).await?;
        Ok(EnrollmentCount {
            count,
            limit: MAX_ACTIVE_ENROLLMENTS,
        })
    }
}
