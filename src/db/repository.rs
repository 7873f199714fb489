//! SQL access for courses and enrollments. Every function takes any SQLite
//! executor, so callers can run it on the pool or inside a transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::models::{Course, Enrollment, EnrollmentStatus, NewCourseRequest, NewEnrollmentRequest};

const COURSE_COLUMNS: &str = "id, title, instructor_name, instructor_email, duration, total_seats, enrolled_count, publish_date";
const ENROLLMENT_COLUMNS: &str = "id, student, course_id, enrolled_at, status";

/// All courses, or only `instructor_email`'s, newest publish date first.
pub async fn fetch_courses<'e, E>(
    db: E,
    instructor_email: Option<&str>,
) -> Result<Vec<Course>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    match instructor_email {
        Some(email) => {
            sqlx::query_as::<_, Course>(&format!(
                "SELECT {COURSE_COLUMNS} FROM courses WHERE instructor_email = ? ORDER BY publish_date DESC, id"
            ))
            .bind(email)
            .fetch_all(db)
            .await
        }
        None => {
            sqlx::query_as::<_, Course>(&format!(
                "SELECT {COURSE_COLUMNS} FROM courses ORDER BY publish_date DESC, id"
            ))
            .fetch_all(db)
            .await
        }
    }
}

/// The `limit` most recently published courses.
pub async fn fetch_latest_courses<'e, E>(db: E, limit: i64) -> Result<Vec<Course>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses ORDER BY publish_date DESC, id LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(db)
    .await
}

/// The `limit` courses with the most enrollments; ties go to the newer course.
pub async fn fetch_popular_courses<'e, E>(db: E, limit: i64) -> Result<Vec<Course>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses ORDER BY enrolled_count DESC, publish_date DESC, id LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn find_course_by_id<'e, E>(db: E, id: &str) -> Result<Option<Course>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Inserts a course with a fresh id and a zero counter and returns the stored row.
pub async fn insert_course<'e, E>(
    db: E,
    req: NewCourseRequest,
    published_at: DateTime<Utc>,
) -> Result<Course, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO courses
            (id, title, instructor_name, instructor_email, duration,
            total_seats, enrolled_count, publish_date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
        "#,
    )
    .bind(&id)
    .bind(&req.title)
    .bind(&req.instructor_name)
    .bind(&req.instructor_email)
    .bind(&req.duration)
    .bind(req.total_seats)
    .bind(published_at)
    .execute(db)
    .await?;

    Ok(Course {
        id,
        title: req.title,
        instructor_name: req.instructor_name,
        instructor_email: req.instructor_email,
        duration: req.duration,
        total_seats: req.total_seats,
        enrolled_count: 0,
        publish_date: published_at,
    })
}

/// Writes the editable columns of `course`. The counter and publish date are
/// left alone.
pub async fn update_course<'e, E>(db: E, course: &Course) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET title = ?1,
            instructor_name = ?2,
            duration = ?3,
            total_seats = ?4
        WHERE id = ?5
        "#,
    )
    .bind(&course.title)
    .bind(&course.instructor_name)
    .bind(&course.duration)
    .bind(course.total_seats)
    .bind(&course.id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn delete_course<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Returns false when the course does not exist.
pub async fn increment_enrolled_count<'e, E>(db: E, course_id: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE courses SET enrolled_count = enrolled_count + 1 WHERE id = ?")
        .bind(course_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Returns false when the course is missing or its counter is already zero.
pub async fn decrement_enrolled_count<'e, E>(db: E, course_id: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE courses SET enrolled_count = enrolled_count - 1 WHERE id = ? AND enrolled_count > 0",
    )
    .bind(course_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Recomputes every drifted `enrolled_count` from the enrollment rows and
/// returns how many courses were corrected.
pub async fn reconcile_enrolled_counts<'e, E>(db: E) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET enrolled_count = (
            SELECT COUNT(*) FROM enrollments e
            WHERE e.course_id = courses.id AND e.status = 'Active'
        )
        WHERE enrolled_count != (
            SELECT COUNT(*) FROM enrollments e
            WHERE e.course_id = courses.id AND e.status = 'Active'
        )
        "#,
    )
    .execute(db)
    .await?
    .rows_affected();

    Ok(result)
}

/// A student's enrollments, most recent first.
pub async fn fetch_enrollments_by_student<'e, E>(
    db: E,
    student: &str,
) -> Result<Vec<Enrollment>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE student = ? ORDER BY enrolled_at DESC, id"
    ))
    .bind(student)
    .fetch_all(db)
    .await
}

pub async fn find_enrollment_by_id<'e, E>(db: E, id: &str) -> Result<Option<Enrollment>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// The enrollment of `student` in `course_id`, if any.
pub async fn find_enrollment<'e, E>(
    db: E,
    student: &str,
    course_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE student = ? AND course_id = ?"
    ))
    .bind(student)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

pub async fn count_active_enrollments<'e, E>(db: E, student: &str) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments WHERE student = ? AND status = 'Active'",
    )
    .bind(student)
    .fetch_one(db)
    .await
}

/// Inserts an `Active` enrollment. A second row for the same student and
/// course fails with a unique violation.
pub async fn insert_enrollment<'e, E>(
    db: E,
    req: NewEnrollmentRequest,
    enrolled_at: DateTime<Utc>,
) -> Result<Enrollment, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let id = Uuid::new_v4().to_string();
    let status = EnrollmentStatus::Active;

    sqlx::query(
        r#"
        INSERT INTO enrollments (id, student, course_id, enrolled_at, status)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&id)
    .bind(&req.student)
    .bind(&req.course_id)
    .bind(enrolled_at)
    .bind(status)
    .execute(db)
    .await?;

    Ok(Enrollment {
        id,
        student: req.student,
        course_id: req.course_id,
        enrolled_at,
        status,
    })
}

pub async fn delete_enrollment<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM enrollments WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Returns how many enrollments were removed.
pub async fn delete_enrollments_for_course<'e, E>(db: E, course_id: &str) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM enrollments WHERE course_id = ?")
        .bind(course_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result)
}
