pub mod course;
pub mod enrollment;

pub use course::{
    Course, CourseDetail, CourseEnrollmentSummary, DeleteCourseResponse, NewCourseRequest,
    UpdateCourseRequest,
};
pub use enrollment::{
    Enrollment, EnrollmentCheck, EnrollmentCount, EnrollmentStatus, EnrollmentWithCourse,
    NewEnrollmentRequest,
};
