// src/store/mod.rs

//! Persistence boundary.
//!
//! Handlers and services talk to storage only through these traits. The
//! attempt operations carry the "one in-progress attempt per (user, quiz)"
//! guarantee: implementations must make `start_or_resume_attempt` and
//! `complete_attempt` atomic with respect to each other.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        attempt::QuizAttempt,
        course::{Course, CourseListParams, CourseModule, CreateModuleRequest, NewCourse},
        enrollment::Enrollment,
        question::{CreateQuestionRequest, Question},
        quiz::{CreateQuizRequest, Quiz},
        user::{NewUser, User},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, AppError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Replaces the password hash and clears any outstanding reset token.
    async fn update_password(&self, user_id: i64, password_hash: &str) -> StoreResult<()>;
    async fn set_reset_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Newest first.
    async fn list_courses(&self, params: &CourseListParams) -> StoreResult<Vec<Course>>;
    async fn find_course(&self, id: i64) -> StoreResult<Option<Course>>;
    async fn create_course(&self, new: NewCourse) -> StoreResult<Course>;
    /// Ordered by position.
    async fn list_modules(&self, course_id: i64) -> StoreResult<Vec<CourseModule>>;
    async fn create_module(
        &self,
        course_id: i64,
        new: CreateModuleRequest,
    ) -> StoreResult<CourseModule>;
    async fn count_enrollments(&self, course_id: i64) -> StoreResult<i64>;
    async fn find_enrollment(&self, user_id: i64, course_id: i64)
    -> StoreResult<Option<Enrollment>>;
    /// Fails with `Conflict` when the pair is already enrolled.
    async fn create_enrollment(&self, user_id: i64, course_id: i64) -> StoreResult<Enrollment>;
    /// Newest first.
    async fn list_enrollments(&self, user_id: i64) -> StoreResult<Vec<Enrollment>>;
    async fn update_progress(
        &self,
        user_id: i64,
        course_id: i64,
        progress: i32,
    ) -> StoreResult<Option<Enrollment>>;
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn find_quiz(&self, id: i64) -> StoreResult<Option<Quiz>>;
    /// Oldest first.
    async fn list_quizzes(&self, course_id: i64) -> StoreResult<Vec<Quiz>>;
    /// Creates the quiz and its questions in one unit.
    async fn create_quiz(&self, new: CreateQuizRequest) -> StoreResult<Quiz>;
    /// Ordered by position, then id.
    async fn list_questions(&self, quiz_id: i64) -> StoreResult<Vec<Question>>;
    async fn count_questions(&self, quiz_id: i64) -> StoreResult<i64>;
    async fn add_question(&self, quiz_id: i64, new: CreateQuestionRequest)
    -> StoreResult<Question>;
    async fn find_question(&self, id: i64) -> StoreResult<Option<Question>>;
    async fn delete_question(&self, id: i64) -> StoreResult<bool>;

    /// Returns the in-progress attempt for the pair if there is one, otherwise
    /// creates it with the given total. The flag is true when a row was created.
    async fn start_or_resume_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        total: i32,
    ) -> StoreResult<(QuizAttempt, bool)>;
    /// The pair's in-progress attempt, if any.
    async fn find_active_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> StoreResult<Option<QuizAttempt>>;
    /// Completes the attempt in a single conditional write on
    /// `completed_at IS NULL`. `None` means it was no longer in progress.
    async fn complete_attempt(
        &self,
        attempt_id: i64,
        score: i32,
        answers: Vec<Option<i32>>,
    ) -> StoreResult<Option<QuizAttempt>>;
    /// Completed attempts, newest first.
    async fn list_completed_attempts(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> StoreResult<Vec<QuizAttempt>>;
    /// In-progress attempt if any, else the most recently completed one.
    async fn latest_attempt(&self, user_id: i64, quiz_id: i64)
    -> StoreResult<Option<QuizAttempt>>;
    /// Attempts by every user.
    async fn count_attempts(&self, quiz_id: i64) -> StoreResult<i64>;
    /// Every completed attempt of a user across all quizzes.
    async fn list_user_completed_attempts(&self, user_id: i64) -> StoreResult<Vec<QuizAttempt>>;
}

pub trait Store: UserStore + CourseStore + QuizStore {}

impl<T: UserStore + CourseStore + QuizStore> Store for T {}

/// Shared handle placed in the application state.
pub type DynStore = Arc<dyn Store>;
