// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{
    attempt::QuizAttempt,
    question::{CreateQuestionRequest, PublicQuestion},
};

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    /// Time limit in seconds. Advisory only: the client counts it down,
    /// the server accepts late submissions.
    pub duration_seconds: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Quiz entry on a course page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub question_count: i64,
}

/// Quiz entry in the per-course quiz list, with the caller's latest attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizListItem {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub question_count: i64,
    pub attempt_count: i64,
    /// In-progress attempt if one exists, else the most recently completed one.
    pub latest_attempt: Option<QuizAttempt>,
}

/// Minimal course reference embedded in quiz payloads.
#[derive(Debug, Serialize)]
pub struct CourseRef {
    pub id: i64,
    pub title: String,
}

/// A quiz ready to be taken: questions in order, answers hidden.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizWithQuestions {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub course: CourseRef,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating a quiz together with its questions.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(range(min = 1, message = "Duration must be at least 1 second"))]
    pub duration_seconds: i32,
    #[validate(nested)]
    #[serde(default)]
    pub questions: Vec<CreateQuestionRequest>,
}
