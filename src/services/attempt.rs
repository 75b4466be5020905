// src/services/attempt.rs

//! Quiz attempt lifecycle: NotStarted → InProgress → Completed.
//!
//! Completion is write-once. The store completes an attempt with a single
//! conditional write on `completed_at IS NULL`, so a second submission finds
//! nothing in progress and fails with `NotFound` instead of re-scoring.
//! Scoring covers the first `total` questions, the count frozen at start, so
//! a stored score never exceeds its total.

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptResult, QuizAttempt, QuizResultsResponse, QuizReview},
        question::Question,
        quiz::{CourseRef, Quiz, QuizListItem, QuizWithQuestions},
    },
    services::enrollment::require_enrollment,
    store::Store,
};

pub const NO_ACTIVE_ATTEMPT: &str = "No active quiz attempt found";

/// Counts positions where the chosen option equals the correct one.
///
/// `questions` must already be in position order. Short, sparse (`None`) or
/// overlong answer lists are tolerated; anything unmatched scores zero.
pub fn score_answers(questions: &[Question], answers: &[Option<i32>]) -> i32 {
    questions
        .iter()
        .enumerate()
        .filter(|(idx, question)| {
            answers.get(*idx).copied().flatten() == Some(question.correct_answer)
        })
        .count() as i32
}

/// round(score / total × 100), 0 for an empty quiz, capped at 100.
pub fn percentage(score: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    let pct = (f64::from(score) / f64::from(total) * 100.0).round() as i32;
    pct.clamp(0, 100)
}

#[derive(Debug)]
pub struct StartedAttempt {
    pub quiz: Quiz,
    pub attempt: QuizAttempt,
    /// True when an existing in-progress attempt was returned.
    pub resumed: bool,
}

#[derive(Debug)]
pub struct SubmittedAttempt {
    pub attempt: QuizAttempt,
    pub score: i32,
    pub total: i32,
    pub percentage: i32,
}

async fn load_quiz(store: &dyn Store, quiz_id: i64) -> Result<Quiz, AppError> {
    store
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Starts an attempt, or resumes the one already in progress unchanged.
pub async fn start_attempt(
    store: &dyn Store,
    user_id: i64,
    quiz_id: i64,
) -> Result<StartedAttempt, AppError> {
    let quiz = load_quiz(store, quiz_id).await?;
    require_enrollment(store, user_id, quiz.course_id).await?;

    let total = store.count_questions(quiz.id).await?;
    let total = i32::try_from(total)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let (attempt, created) = store
        .start_or_resume_attempt(user_id, quiz.id, total)
        .await?;

    if created {
        tracing::info!(user_id, quiz_id, attempt_id = attempt.id, "Quiz attempt started");
    } else {
        tracing::debug!(user_id, quiz_id, attempt_id = attempt.id, "Resuming quiz attempt");
    }

    Ok(StartedAttempt {
        quiz,
        attempt,
        resumed: !created,
    })
}

/// Scores and completes the in-progress attempt.
///
/// Elapsed time is not checked: the countdown is a client-side policy.
pub async fn submit_attempt(
    store: &dyn Store,
    user_id: i64,
    quiz_id: i64,
    answers: Vec<Option<i32>>,
) -> Result<SubmittedAttempt, AppError> {
    let quiz = load_quiz(store, quiz_id).await?;
    require_enrollment(store, user_id, quiz.course_id).await?;

    let not_found = || AppError::NotFound(NO_ACTIVE_ATTEMPT.to_string());
    let active = store
        .find_active_attempt(user_id, quiz.id)
        .await?
        .ok_or_else(not_found)?;

    // Only the positions counted at start are scored.
    let questions = store.list_questions(quiz.id).await?;
    let scored = usize::try_from(active.total)
        .unwrap_or(0)
        .min(questions.len());
    let score = score_answers(&questions[..scored], &answers);

    let attempt = store
        .complete_attempt(active.id, score, answers)
        .await?
        .ok_or_else(not_found)?;

    let total = attempt.total;
    let percentage = percentage(score, total);
    tracing::info!(user_id, quiz_id, score, total, "Quiz attempt submitted");

    Ok(SubmittedAttempt {
        attempt,
        score,
        total,
        percentage,
    })
}

/// Completed attempts, newest first, each with the score and total frozen at
/// submission time, alongside the quiz's current questions for review.
pub async fn get_results(
    store: &dyn Store,
    user_id: i64,
    quiz_id: i64,
) -> Result<QuizResultsResponse, AppError> {
    let quiz = load_quiz(store, quiz_id).await?;
    require_enrollment(store, user_id, quiz.course_id).await?;

    let questions = store.list_questions(quiz.id).await?;
    let attempts = store
        .list_completed_attempts(user_id, quiz.id)
        .await?
        .into_iter()
        .map(|attempt| AttemptResult {
            percentage: percentage(attempt.score, attempt.total),
            attempt,
        })
        .collect();

    Ok(QuizResultsResponse {
        quiz: QuizReview {
            id: quiz.id,
            title: quiz.title,
            questions,
        },
        attempts,
    })
}

/// Fetches a quiz for taking. Anonymous callers may preview it; an
/// authenticated caller must be enrolled in the quiz's course.
pub async fn get_quiz(
    store: &dyn Store,
    quiz_id: i64,
    caller: Option<i64>,
) -> Result<QuizWithQuestions, AppError> {
    let quiz = load_quiz(store, quiz_id).await?;

    if let Some(user_id) = caller {
        require_enrollment(store, user_id, quiz.course_id).await?;
    }

    let course = store
        .find_course(quiz.course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    let questions = store
        .list_questions(quiz.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(QuizWithQuestions {
        quiz,
        course: CourseRef {
            id: course.id,
            title: course.title,
        },
        questions,
    })
}

/// Quizzes of a course, oldest first, with the caller's latest attempt.
pub async fn list_course_quizzes(
    store: &dyn Store,
    course_id: i64,
    caller: Option<i64>,
) -> Result<Vec<QuizListItem>, AppError> {
    let quizzes = store.list_quizzes(course_id).await?;

    let mut items = Vec::with_capacity(quizzes.len());
    for quiz in quizzes {
        let question_count = store.count_questions(quiz.id).await?;
        let attempt_count = store.count_attempts(quiz.id).await?;
        let latest_attempt = match caller {
            Some(user_id) => store.latest_attempt(user_id, quiz.id).await?,
            None => None,
        };
        items.push(QuizListItem {
            quiz,
            question_count,
            attempt_count,
            latest_attempt,
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            course::{CourseLevel, NewCourse},
            question::CreateQuestionRequest,
            quiz::CreateQuizRequest,
        },
        store::{CourseStore, MemoryStore, QuizStore},
    };
    use sqlx::types::Json;

    fn questions(correct: &[i32]) -> Vec<Question> {
        correct
            .iter()
            .enumerate()
            .map(|(idx, &correct_answer)| Question {
                id: idx as i64 + 1,
                quiz_id: 1,
                text: format!("Question {}", idx + 1),
                options: Json(vec!["A".into(), "B".into(), "C".into()]),
                correct_answer,
                position: idx as i32 + 1,
            })
            .collect()
    }

    #[test]
    fn perfect_score() {
        let qs = questions(&[1, 0, 0]);
        let score = score_answers(&qs, &[Some(1), Some(0), Some(0)]);
        assert_eq!(score, 3);
        assert_eq!(percentage(score, 3), 100);
    }

    #[test]
    fn short_answers_score_missing_as_wrong() {
        let qs = questions(&[1, 0, 2]);
        assert_eq!(score_answers(&qs, &[Some(1), Some(0)]), 2);
        assert_eq!(score_answers(&qs, &[]), 0);
    }

    #[test]
    fn sparse_and_out_of_range_answers_never_score() {
        let qs = questions(&[1, 0, 2]);
        assert_eq!(score_answers(&qs, &[None, Some(0), Some(99)]), 1);
        assert_eq!(score_answers(&qs, &[Some(-1), None, Some(2), Some(1), Some(1)]), 1);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 4), 0);
    }

    #[test]
    fn percentage_of_empty_quiz_is_zero() {
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn percentage_is_capped_when_questions_were_added() {
        assert_eq!(percentage(3, 2), 100);
    }

    fn question(correct_answer: i32) -> CreateQuestionRequest {
        CreateQuestionRequest {
            text: "Which option?".into(),
            options: vec!["A".into(), "B".into()],
            correct_answer,
            position: None,
        }
    }

    #[tokio::test]
    async fn question_added_mid_attempt_is_not_scored() {
        let store = MemoryStore::new();
        let course = store
            .create_course(NewCourse {
                title: "Wound Care".into(),
                description: "Dressings".into(),
                price: 0.0,
                duration_minutes: 30,
                level: CourseLevel::Beginner,
                image_url: None,
                instructor_id: None,
            })
            .await
            .unwrap();
        let quiz = store
            .create_quiz(CreateQuizRequest {
                course_id: course.id,
                title: "Wound Care Quiz".into(),
                duration_seconds: 600,
                questions: vec![question(0), question(0)],
            })
            .await
            .unwrap();
        store.create_enrollment(7, course.id).await.unwrap();

        let started = start_attempt(&store, 7, quiz.id).await.unwrap();
        assert_eq!(started.attempt.total, 2);

        store.add_question(quiz.id, question(1)).await.unwrap();

        let submitted = submit_attempt(&store, 7, quiz.id, vec![Some(0), Some(0), Some(1)])
            .await
            .unwrap();
        assert_eq!(submitted.score, 2);
        assert_eq!(submitted.total, 2);
        assert_eq!(submitted.percentage, 100);

        let results = get_results(&store, 7, quiz.id).await.unwrap();
        let stored = &results.attempts[0].attempt;
        assert!(stored.score <= stored.total);
        assert_eq!((stored.score, stored.total), (2, 2));
    }

    #[tokio::test]
    async fn submit_and_results_require_enrollment() {
        let store = MemoryStore::new();
        let quiz = store
            .create_quiz(CreateQuizRequest {
                course_id: 1,
                title: "Triage".into(),
                duration_seconds: 60,
                questions: vec![question(0)],
            })
            .await
            .unwrap();

        assert!(matches!(
            submit_attempt(&store, 7, quiz.id, vec![Some(0)]).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            get_results(&store, 7, quiz.id).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
