// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::models::question::Question;

/// Represents the 'quiz_attempts' table.
///
/// An attempt is in progress while `completed_at` is null. It is written once
/// more at submission (score, answers, completion time) and never again.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub score: i32,
    /// Question count when the attempt started. Never recomputed.
    pub total: i32,
    /// Chosen option per question position; `None` marks an unanswered slot.
    pub answers: Json<Vec<Option<i32>>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl QuizAttempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    pub quiz_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    pub quiz_id: i64,
    #[validate(length(max = 1000, message = "Too many answers"))]
    pub answers: Vec<Option<i32>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt: QuizAttempt,
    pub message: &'static str,
    pub resumed: bool,
    /// Advisory deadline derived from the attempt start and the quiz duration.
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub remaining_seconds: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptResponse {
    pub message: &'static str,
    pub attempt: QuizAttempt,
    pub score: i32,
    pub total: i32,
    pub percentage: i32,
}

/// A completed attempt with its frozen percentage.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub percentage: i32,
}

/// Quiz content shown next to results, correct answers included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizReview {
    pub id: i64,
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultsResponse {
    pub quiz: QuizReview,
    /// Newest first.
    pub attempts: Vec<AttemptResult>,
}
