use std::time::Duration;

use chrono::Utc;
use edulearn::db::{self, repository};
use edulearn::models::{NewCourseRequest, NewEnrollmentRequest};
use edulearn::services::CounterReconciler;
use sqlx::SqlitePool;

async fn seed_drifted_course(pool: &SqlitePool) -> String {
    let course = repository::insert_course(
        pool,
        NewCourseRequest {
            title: "Rust 101".to_string(),
            instructor_name: "Ada Lovelace".to_string(),
            instructor_email: "ada@example.com".to_string(),
            duration: "6 weeks".to_string(),
            total_seats: 10,
        },
        Utc::now(),
    )
    .await
    .expect("Failed to insert course");

    // Enrollment row written without the counter update.
    repository::insert_enrollment(
        pool,
        NewEnrollmentRequest {
            student: "sam@example.com".to_string(),
            course_id: course.id.clone(),
        },
        Utc::now(),
    )
    .await
    .expect("Failed to insert enrollment");

    course.id
}

async fn enrolled_count(pool: &SqlitePool, course_id: &str) -> i64 {
    repository::find_course_by_id(pool, course_id)
        .await
        .expect("query")
        .expect("course exists")
        .enrolled_count
}

#[tokio::test]
async fn test_run_once_repairs_counter() {
    let pool = db::connect_in_memory().await.expect("Failed to create database");
    let course_id = seed_drifted_course(&pool).await;
    assert_eq!(enrolled_count(&pool, &course_id).await, 0);

    let reconciler = CounterReconciler::new(pool.clone(), 60);
    assert_eq!(reconciler.run_once().await.expect("reconcile"), 1);
    assert_eq!(enrolled_count(&pool, &course_id).await, 1);

    assert_eq!(reconciler.run_once().await.expect("reconcile"), 0);
}

#[tokio::test]
async fn test_reconciler_loop_short_interval() {
    let pool = db::connect_in_memory().await.expect("Failed to create database");
    let course_id = seed_drifted_course(&pool).await;

    let reconciler = CounterReconciler::new(pool.clone(), 1);
    let task = tokio::spawn(async move {
        reconciler.start().await;
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    task.abort();

    assert_eq!(enrolled_count(&pool, &course_id).await, 1);
}
