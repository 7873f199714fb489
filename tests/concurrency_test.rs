use chrono::Utc;
use edulearn::auth::Caller;
use edulearn::db::{self, repository};
use edulearn::error::AppError;
use edulearn::models::{NewCourseRequest, NewEnrollmentRequest, UpdateCourseRequest};
use edulearn::services::{CourseService, EnrollmentService};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// File-backed pool with several connections, like the server runs with.
async fn file_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("edulearn.db").display());
    let pool = db::connect(&url).await.expect("Failed to open database");
    (dir, pool)
}

async fn seed_course(pool: &SqlitePool, seats: i64) -> String {
    repository::insert_course(
        pool,
        NewCourseRequest {
            title: "Rust 101".to_string(),
            instructor_name: "Ada Lovelace".to_string(),
            instructor_email: "ada@example.com".to_string(),
            duration: "6 weeks".to_string(),
            total_seats: seats,
        },
        Utc::now(),
    )
    .await
    .expect("Failed to insert course")
    .id
}

fn enroll_task(
    pool: &SqlitePool,
    student: String,
    course_id: String,
) -> tokio::task::JoinHandle<Result<String, AppError>> {
    let service = EnrollmentService::new(pool.clone());
    tokio::spawn(async move {
        service
            .enroll(&Caller::anonymous(), NewEnrollmentRequest { student, course_id })
            .await
            .map(|enrollment| enrollment.id)
    })
}

async fn enrolled_count(pool: &SqlitePool, course_id: &str) -> i64 {
    repository::find_course_by_id(pool, course_id)
        .await
        .expect("query")
        .expect("course exists")
        .enrolled_count
}

#[tokio::test]
async fn test_parallel_enrollments_all_succeed() {
    let (_dir, pool) = file_pool().await;
    let course_id = seed_course(&pool, 100).await;

    let tasks: Vec<_> = (0..10)
        .map(|i| enroll_task(&pool, format!("student{i}@example.com"), course_id.clone()))
        .collect();

    for task in tasks {
        let result = task.await.expect("task panicked");
        assert!(result.is_ok(), "enroll failed: {:?}", result.err());
    }

    assert_eq!(enrolled_count(&pool, &course_id).await, 10);
}

#[tokio::test]
async fn test_parallel_duplicates_admit_one() {
    let (_dir, pool) = file_pool().await;
    let course_id = seed_course(&pool, 100).await;

    let tasks: Vec<_> = (0..5)
        .map(|_| enroll_task(&pool, "sam@example.com".to_string(), course_id.clone()))
        .collect();

    let mut enrolled = 0;
    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(_) => enrolled += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    assert_eq!(enrolled, 1);
    assert_eq!(enrolled_count(&pool, &course_id).await, 1);
}

#[tokio::test]
async fn test_parallel_withdrawals_and_course_update() {
    let (_dir, pool) = file_pool().await;
    let course_id = seed_course(&pool, 100).await;

    let mut ids = Vec::new();
    for i in 0..6 {
        let id = enroll_task(&pool, format!("student{i}@example.com"), course_id.clone())
            .await
            .expect("task panicked")
            .expect("enroll");
        ids.push(id);
    }

    let withdrawals: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let service = EnrollmentService::new(pool.clone());
            tokio::spawn(async move { service.withdraw(&Caller::anonymous(), &id).await })
        })
        .collect();

    let courses = CourseService::new(pool.clone());
    let update_course_id = course_id.clone();
    let update = tokio::spawn(async move {
        courses
            .update(
                &Caller::anonymous(),
                &update_course_id,
                UpdateCourseRequest {
                    duration: Some("8 weeks".to_string()),
                    ..Default::default()
                },
            )
            .await
    });

    for task in withdrawals {
        assert!(task.await.expect("task panicked").is_ok());
    }
    assert!(update.await.expect("task panicked").is_ok());

    assert_eq!(enrolled_count(&pool, &course_id).await, 0);
}
