// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{
            StartAttemptRequest, StartAttemptResponse, SubmitAttemptRequest,
            SubmitAttemptResponse,
        },
        question::CreateQuestionRequest,
        quiz::CreateQuizRequest,
    },
    services::attempt,
    session::QuizSession,
    store::DynStore,
    utils::jwt::{Claims, MaybeClaims},
};

/// Lists the quizzes of a course with the caller's latest attempt, if any.
pub async fn list_course_quizzes(
    State(store): State<DynStore>,
    caller: MaybeClaims,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes =
        attempt::list_course_quizzes(store.as_ref(), course_id, caller.user_id()?).await?;

    Ok(Json(json!({ "quizzes": quizzes })))
}

/// Fetches a quiz and its questions without the correct answers.
///
/// Anonymous callers get a preview; authenticated callers must be enrolled.
pub async fn get_quiz(
    State(store): State<DynStore>,
    caller: MaybeClaims,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = attempt::get_quiz(store.as_ref(), id, caller.user_id()?).await?;

    Ok(Json(json!({ "quiz": quiz })))
}

/// Starts a quiz attempt, or resumes the one in progress.
///
/// 201 for a new attempt, 200 when resuming. The deadline in the response is
/// advisory; submissions are accepted after it passes.
pub async fn start_attempt(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let started = attempt::start_attempt(store.as_ref(), user_id, req.quiz_id).await?;

    let session = QuizSession::for_attempt(&started.attempt, &started.quiz);
    let status = if started.resumed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let message = if started.resumed {
        "Resuming existing attempt"
    } else {
        "Quiz attempt started"
    };

    Ok((
        status,
        Json(StartAttemptResponse {
            expires_at: session.deadline(),
            remaining_seconds: session.remaining(Utc::now()).num_seconds(),
            attempt: started.attempt,
            message,
            resumed: started.resumed,
        }),
    ))
}

/// Scores and completes the caller's in-progress attempt.
pub async fn submit_attempt(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let user_id = claims.user_id()?;

    let submitted =
        attempt::submit_attempt(store.as_ref(), user_id, req.quiz_id, req.answers).await?;

    Ok(Json(SubmitAttemptResponse {
        message: "Quiz submitted successfully",
        attempt: submitted.attempt,
        score: submitted.score,
        total: submitted.total,
        percentage: submitted.percentage,
    }))
}

/// Lists the caller's completed attempts for a quiz, newest first.
pub async fn get_results(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let results = attempt::get_results(store.as_ref(), user_id, quiz_id).await?;

    Ok(Json(results))
}

/// Creates a quiz with its questions.
/// Instructor only.
pub async fn create_quiz(
    State(store): State<DynStore>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    store
        .find_course(payload.course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    let quiz = store.create_quiz(payload).await?;
    let question_count = store.count_questions(quiz.id).await?;
    tracing::info!(quiz_id = quiz.id, question_count, "Quiz created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "quiz": quiz, "questionCount": question_count })),
    ))
}

/// Appends a question to a quiz. Attempts already started keep their total.
/// Instructor only.
pub async fn add_question(
    State(store): State<DynStore>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    store
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let question = store.add_question(quiz_id, payload).await?;

    Ok((StatusCode::CREATED, Json(json!({ "question": question }))))
}

/// Removes a question. Completed attempts keep their recorded score and total.
/// Instructor only.
pub async fn delete_question(
    State(store): State<DynStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = store
        .find_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if store.delete_question(question.id).await? {
        tracing::info!(question_id = id, quiz_id = question.quiz_id, "Question deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}
