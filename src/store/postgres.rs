// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, types::Json};

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
    store::{CourseStore, QuizStore, StoreResult, UserStore},
};

const USER_COLUMNS: &str =
    "id, email, name, password, role, reset_token_hash, reset_token_expires_at, created_at";
const COURSE_COLUMNS: &str =
    "id, title, description, price, duration_minutes, level, image_url, instructor_id, created_at";
const MODULE_COLUMNS: &str = "id, course_id, title, content, position, created_at";
const ENROLLMENT_COLUMNS: &str = "id, user_id, course_id, progress, enrolled_at";
const QUIZ_COLUMNS: &str = "id, course_id, title, duration_seconds, created_at";
const QUESTION_COLUMNS: &str = "id, quiz_id, text, options, correct_answer, position";
const ATTEMPT_COLUMNS: &str =
    "id, user_id, quiz_id, score, total, answers, started_at, completed_at";

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escapes `LIKE` metacharacters so user input matches literally.
/// Backslash is the default escape character in PostgreSQL.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(new.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User already exists with this email".to_string())
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password = $1, reset_token_hash = NULL, reset_token_expires_at = NULL
            WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET reset_token_hash = $1, reset_token_expires_at = $2 WHERE id = $3",
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CourseStore for PgStore {
    async fn list_courses(&self, params: &CourseListParams) -> StoreResult<Vec<Course>> {
        let search_pattern = params
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)));

        let courses = sqlx::query_as::<_, Course>(&format!(
            r#"
            SELECT {COURSE_COLUMNS}
            FROM courses
            WHERE ($1::TEXT IS NULL OR title ILIKE $1 OR description ILIKE $1)
              AND ($2::course_level IS NULL OR level = $2)
              AND ($3::DOUBLE PRECISION IS NULL OR price <= $3)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(search_pattern)
        .bind(params.level)
        .bind(params.max_price)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn find_course(&self, id: i64) -> StoreResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn create_course(&self, new: NewCourse) -> StoreResult<Course> {
        let course = sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (title, description, price, duration_minutes, level, image_url, instructor_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.duration_minutes)
        .bind(new.level)
        .bind(&new.image_url)
        .bind(new.instructor_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(course)
    }

    async fn list_modules(&self, course_id: i64) -> StoreResult<Vec<CourseModule>> {
        let modules = sqlx::query_as::<_, CourseModule>(&format!(
            "SELECT {MODULE_COLUMNS} FROM modules WHERE course_id = $1 ORDER BY position ASC, id ASC"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(modules)
    }

    async fn create_module(
        &self,
        course_id: i64,
        new: CreateModuleRequest,
    ) -> StoreResult<CourseModule> {
        let module = sqlx::query_as::<_, CourseModule>(&format!(
            r#"
            INSERT INTO modules (course_id, title, content, position)
            VALUES (
                $1, $2, $3,
                COALESCE($4, (SELECT COALESCE(MAX(position), 0) + 1 FROM modules WHERE course_id = $1))
            )
            RETURNING {MODULE_COLUMNS}
            "#
        ))
        .bind(course_id)
        .bind(&new.title)
        .bind(&new.content)
        .bind(new.position)
        .fetch_one(&self.pool)
        .await?;
        Ok(module)
    }

    async fn count_enrollments(&self, course_id: i64) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_enrollment(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> StoreResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = $1 AND course_id = $2"
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }

    async fn create_enrollment(&self, user_id: i64, course_id: i64) -> StoreResult<Enrollment> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2) RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Already enrolled in this course".to_string())
            } else {
                tracing::error!("Failed to create enrollment: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn list_enrollments(&self, user_id: i64) -> StoreResult<Vec<Enrollment>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = $1 ORDER BY enrolled_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(enrollments)
    }

    async fn update_progress(
        &self,
        user_id: i64,
        course_id: i64,
        progress: i32,
    ) -> StoreResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            r#"
            UPDATE enrollments SET progress = $3
            WHERE user_id = $1 AND course_id = $2
            RETURNING {ENROLLMENT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(course_id)
        .bind(progress)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn find_quiz(&self, id: i64) -> StoreResult<Option<Quiz>> {
        let quiz = sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(quiz)
    }

    async fn list_quizzes(&self, course_id: i64) -> StoreResult<Vec<Quiz>> {
        let quizzes = sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE course_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }

    async fn create_quiz(&self, new: CreateQuizRequest) -> StoreResult<Quiz> {
        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(&format!(
            "INSERT INTO quizzes (course_id, title, duration_seconds) VALUES ($1, $2, $3) RETURNING {QUIZ_COLUMNS}"
        ))
        .bind(new.course_id)
        .bind(&new.title)
        .bind(new.duration_seconds)
        .fetch_one(&mut *tx)
        .await?;

        for (idx, question) in new.questions.iter().enumerate() {
            let position = question.position.unwrap_or(idx as i32 + 1);
            sqlx::query(
                r#"
                INSERT INTO questions (quiz_id, text, options, correct_answer, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(quiz.id)
            .bind(&question.text)
            .bind(Json(&question.options))
            .bind(question.correct_answer)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(quiz)
    }

    async fn list_questions(&self, quiz_id: i64) -> StoreResult<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1 ORDER BY position ASC, id ASC"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn count_questions(&self, quiz_id: i64) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn add_question(
        &self,
        quiz_id: i64,
        new: CreateQuestionRequest,
    ) -> StoreResult<Question> {
        let question = sqlx::query_as::<_, Question>(&format!(
            r#"
            INSERT INTO questions (quiz_id, text, options, correct_answer, position)
            VALUES (
                $1, $2, $3, $4,
                COALESCE($5, (SELECT COALESCE(MAX(position), 0) + 1 FROM questions WHERE quiz_id = $1))
            )
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(quiz_id)
        .bind(&new.text)
        .bind(Json(&new.options))
        .bind(new.correct_answer)
        .bind(new.position)
        .fetch_one(&self.pool)
        .await?;
        Ok(question)
    }

    async fn find_question(&self, id: i64) -> StoreResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn start_or_resume_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        total: i32,
    ) -> StoreResult<(QuizAttempt, bool)> {
        // The partial unique index turns a concurrent duplicate start into a no-op
        // insert; the loser then reads the winner's row. A second round covers the
        // case where that row was completed between the two statements.
        for _ in 0..2 {
            let inserted = sqlx::query_as::<_, QuizAttempt>(&format!(
                r#"
                INSERT INTO quiz_attempts (user_id, quiz_id, score, total, answers)
                VALUES ($1, $2, 0, $3, '[]'::jsonb)
                ON CONFLICT (user_id, quiz_id) WHERE completed_at IS NULL DO NOTHING
                RETURNING {ATTEMPT_COLUMNS}
                "#
            ))
            .bind(user_id)
            .bind(quiz_id)
            .bind(total)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(attempt) = inserted {
                return Ok((attempt, true));
            }

            if let Some(attempt) = self.find_active_attempt(user_id, quiz_id).await? {
                return Ok((attempt, false));
            }
        }

        Err(AppError::Conflict(
            "Quiz attempt changed concurrently, please retry".to_string(),
        ))
    }

    async fn find_active_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> StoreResult<Option<QuizAttempt>> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS}
            FROM quiz_attempts
            WHERE user_id = $1 AND quiz_id = $2 AND completed_at IS NULL
            "#
        ))
        .bind(user_id)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn complete_attempt(
        &self,
        attempt_id: i64,
        score: i32,
        answers: Vec<Option<i32>>,
    ) -> StoreResult<Option<QuizAttempt>> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            r#"
            UPDATE quiz_attempts
            SET score = $2, answers = $3, completed_at = NOW()
            WHERE id = $1 AND completed_at IS NULL
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(attempt_id)
        .bind(score)
        .bind(Json(answers))
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn list_completed_attempts(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> StoreResult<Vec<QuizAttempt>> {
        let attempts = sqlx::query_as::<_, QuizAttempt>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS}
            FROM quiz_attempts
            WHERE user_id = $1 AND quiz_id = $2 AND completed_at IS NOT NULL
            ORDER BY completed_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn latest_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> StoreResult<Option<QuizAttempt>> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS}
            FROM quiz_attempts
            WHERE user_id = $1 AND quiz_id = $2
            ORDER BY completed_at DESC NULLS FIRST, id DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn count_attempts(&self, quiz_id: i64) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_user_completed_attempts(&self, user_id: i64) -> StoreResult<Vec<QuizAttempt>> {
        let attempts = sqlx::query_as::<_, QuizAttempt>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS}
            FROM quiz_attempts
            WHERE user_id = $1 AND completed_at IS NOT NULL
            ORDER BY completed_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }
}
