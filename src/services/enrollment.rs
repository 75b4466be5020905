// src/services/enrollment.rs

use crate::{
    error::AppError,
    models::enrollment::Enrollment,
    store::Store,
};

pub const NOT_ENROLLED: &str = "You must enroll in the course to take this quiz";

pub async fn is_enrolled(store: &dyn Store, user_id: i64, course_id: i64) -> Result<bool, AppError> {
    Ok(store.find_enrollment(user_id, course_id).await?.is_some())
}

/// Gate in front of quiz access. A missing enrollment is `Forbidden`,
/// never `NotFound`, so callers can tell "no such quiz" from "not yours".
pub async fn require_enrollment(
    store: &dyn Store,
    user_id: i64,
    course_id: i64,
) -> Result<Enrollment, AppError> {
    store
        .find_enrollment(user_id, course_id)
        .await?
        .ok_or_else(|| AppError::Forbidden(NOT_ENROLLED.to_string()))
}

/// Enrolls the user. Missing course → `NotFound`, second enrollment → `Conflict`.
pub async fn enroll(store: &dyn Store, user_id: i64, course_id: i64) -> Result<Enrollment, AppError> {
    store
        .find_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if store.find_enrollment(user_id, course_id).await?.is_some() {
        return Err(AppError::Conflict(
            "Already enrolled in this course".to_string(),
        ));
    }

    let enrollment = store.create_enrollment(user_id, course_id).await?;
    tracing::info!(user_id, course_id, "User enrolled in course");
    Ok(enrollment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::course::{CourseLevel, NewCourse},
        store::{CourseStore, MemoryStore},
    };

    async fn store_with_course() -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let course = store
            .create_course(NewCourse {
                title: "Fundamentals of Nursing Practice".into(),
                description: "Basics".into(),
                price: 0.0,
                duration_minutes: 120,
                level: CourseLevel::Beginner,
                image_url: None,
                instructor_id: None,
            })
            .await
            .unwrap();
        (store, course.id)
    }

    #[tokio::test]
    async fn gate_is_forbidden_until_enrolled() {
        let (store, course_id) = store_with_course().await;

        assert!(!is_enrolled(&store, 7, course_id).await.unwrap());
        let err = require_enrollment(&store, 7, course_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        enroll(&store, 7, course_id).await.unwrap();
        assert!(is_enrolled(&store, 7, course_id).await.unwrap());
        assert_eq!(require_enrollment(&store, 7, course_id).await.unwrap().progress, 0);
    }

    #[tokio::test]
    async fn enroll_distinguishes_missing_and_duplicate() {
        let (store, course_id) = store_with_course().await;

        let missing = enroll(&store, 7, course_id + 100).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        enroll(&store, 7, course_id).await.unwrap();
        let duplicate = enroll(&store, 7, course_id).await.unwrap_err();
        assert!(matches!(duplicate, AppError::Conflict(_)));
    }
}
