pub mod course_service;
pub mod enrollment_service;
pub mod reconciler;

pub use course_service::CourseService;
pub use enrollment_service::{EnrollmentService, MAX_ACTIVE_ENROLLMENTS};
pub use reconciler::CounterReconciler;
