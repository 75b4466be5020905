// src/handlers/courses.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        course::{
            CourseDetail, CourseListParams, CourseSummary, CreateCourseRequest,
            CreateModuleRequest, ModuleOutline, NewCourse,
        },
        enrollment::{
            EnrollRequest, EnrolledCourse, EnrollmentWithCourse, UpdateProgressRequest,
        },
        quiz::QuizSummary,
    },
    services::enrollment,
    store::DynStore,
    utils::{
        html::sanitize_content,
        jwt::{Claims, MaybeClaims},
    },
};

/// Lists the catalog, newest first, optionally filtered by keyword, level and price.
pub async fn list_courses(
    State(store): State<DynStore>,
    caller: MaybeClaims,
    Query(params): Query<CourseListParams>,
) -> Result<impl IntoResponse, AppError> {
    let caller = caller.user_id()?;
    let courses = store.list_courses(&params).await?;

    let mut summaries = Vec::with_capacity(courses.len());
    for course in courses {
        let modules = store.list_modules(course.id).await?;
        let enrollment_count = store.count_enrollments(course.id).await?;
        let is_enrolled = match caller {
            Some(user_id) => enrollment::is_enrolled(store.as_ref(), user_id, course.id).await?,
            None => false,
        };
        summaries.push(CourseSummary {
            modules: modules.iter().map(ModuleOutline::from).collect(),
            course,
            enrollment_count,
            is_enrolled,
        });
    }

    Ok(Json(json!({ "courses": summaries })))
}

/// Retrieves a single course with its modules and quizzes.
pub async fn get_course(
    State(store): State<DynStore>,
    caller: MaybeClaims,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = store
        .find_course(id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    let modules = store.list_modules(course.id).await?;
    let enrollment_count = store.count_enrollments(course.id).await?;

    let mut quizzes = Vec::new();
    for quiz in store.list_quizzes(course.id).await? {
        let question_count = store.count_questions(quiz.id).await?;
        quizzes.push(QuizSummary {
            quiz,
            question_count,
        });
    }

    let is_enrolled = match caller.user_id()? {
        Some(user_id) => enrollment::is_enrolled(store.as_ref(), user_id, course.id).await?,
        None => false,
    };

    Ok(Json(json!({
        "course": CourseDetail {
            course,
            modules,
            quizzes,
            enrollment_count,
            is_enrolled,
        }
    })))
}

/// Creates a course owned by the calling instructor.
pub async fn create_course(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let course = store
        .create_course(NewCourse {
            title: payload.title.trim().to_string(),
            description: sanitize_content(&payload.description),
            price: payload.price,
            duration_minutes: payload.duration_minutes,
            level: payload.level,
            image_url: payload.image_url,
            instructor_id: Some(claims.user_id()?),
        })
        .await?;

    tracing::info!(course_id = course.id, "Course created");

    Ok((StatusCode::CREATED, Json(json!({ "course": course }))))
}

/// Adds a module to a course. Content is sanitized before it is stored.
pub async fn create_module(
    State(store): State<DynStore>,
    Path(course_id): Path<i64>,
    Json(mut payload): Json<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    store
        .find_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    payload.content = sanitize_content(&payload.content);
    let module = store.create_module(course_id, payload).await?;

    Ok((StatusCode::CREATED, Json(json!({ "module": module }))))
}

pub async fn enroll(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let enrollment = enrollment::enroll(store.as_ref(), user_id, payload.course_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Successfully enrolled in course",
            "enrollment": enrollment,
        })),
    ))
}

/// Lists the caller's enrollments, newest first, with course outlines.
pub async fn list_my_enrollments(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut items = Vec::new();
    for enrollment in store.list_enrollments(user_id).await? {
        let Some(course) = store.find_course(enrollment.course_id).await? else {
            continue;
        };
        let modules = store.list_modules(course.id).await?;
        let quiz_count = store.list_quizzes(course.id).await?.len() as i64;
        items.push(EnrollmentWithCourse {
            enrollment,
            course: EnrolledCourse {
                course,
                module_count: modules.len() as i64,
                modules: modules.iter().map(ModuleOutline::from).collect(),
                quiz_count,
            },
        });
    }

    Ok(Json(json!({ "enrollments": items })))
}

pub async fn update_progress(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    store
        .find_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    let enrollment = store
        .update_progress(user_id, course_id, payload.progress)
        .await?
        .ok_or_else(|| AppError::Forbidden("You are not enrolled in this course".to_string()))?;

    Ok(Json(json!({ "enrollment": enrollment })))
}
