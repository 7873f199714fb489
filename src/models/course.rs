use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub instructor_name: String,
    pub instructor_email: String,
    pub duration: String,
    pub total_seats: i64,
    #[serde(default)]
    pub enrolled_count: i64,
    pub publish_date: DateTime<Utc>,
}

impl Course {
    pub fn seats_left(&self) -> i64 {
        self.total_seats - self.enrolled_count
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseRequest {
    pub title: String,
    pub instructor_name: String,
    pub instructor_email: String,
    pub duration: String,
    pub total_seats: i64,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub instructor_name: Option<String>,
    pub duration: Option<String>,
    pub total_seats: Option<i64>,
}

/// Single-course lookup response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub seats_left: i64,
}

impl From<Course> for CourseDetail {
    fn from(course: Course) -> Self {
        let seats_left = course.seats_left();
        Self { course, seats_left }
    }
}

/// Per-course enrollment numbers shown on an instructor's dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseEnrollmentSummary {
    pub course_id: String,
    pub title: String,
    pub enrolled_count: i64,
    pub total_seats: i64,
    pub seats_left: i64,
}

impl From<Course> for CourseEnrollmentSummary {
    fn from(course: Course) -> Self {
        let seats_left = course.seats_left();
        Self {
            course_id: course.id,
            title: course.title,
            enrolled_count: course.enrolled_count,
            total_seats: course.total_seats,
            seats_left,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCourseResponse {
    pub deleted_count: u64,
    pub removed_enrollments: u64,
}
