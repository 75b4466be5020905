// src/store/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::RwLock;

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

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    courses: Vec<Course>,
    modules: Vec<CourseModule>,
    enrollments: Vec<Enrollment>,
    quizzes: Vec<Quiz>,
    questions: Vec<Question>,
    attempts: Vec<QuizAttempt>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn next_question_position(&self, quiz_id: i64) -> i32 {
        self.questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .map(|q| q.position)
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// In-process store used when no database is configured and by the tests.
///
/// Every mutation runs under a single write lock, which is what makes the
/// check-then-insert in `start_or_resume_attempt` atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest completion first, id as tiebreak.
fn newest_completed_first(a: &QuizAttempt, b: &QuizAttempt) -> std::cmp::Ordering {
    b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::Conflict(
                "User already exists with this email".to_string(),
            ));
        }
        let user = User {
            id: tables.next_id(),
            email: new.email,
            name: new.name,
            password: new.password_hash,
            role: new.role,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.password = password_hash.to_string();
            user.reset_token_hash = None;
            user.reset_token_expires_at = None;
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.reset_token_hash = Some(token_hash.to_string());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn list_courses(&self, params: &CourseListParams) -> StoreResult<Vec<Course>> {
        let tables = self.tables.read().await;
        let mut courses: Vec<Course> = tables
            .courses
            .iter()
            .filter(|c| params.matches(c))
            .cloned()
            .collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(courses)
    }

    async fn find_course(&self, id: i64) -> StoreResult<Option<Course>> {
        let tables = self.tables.read().await;
        Ok(tables.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn create_course(&self, new: NewCourse) -> StoreResult<Course> {
        let mut tables = self.tables.write().await;
        let course = Course {
            id: tables.next_id(),
            title: new.title,
            description: new.description,
            price: new.price,
            duration_minutes: new.duration_minutes,
            level: new.level,
            image_url: new.image_url,
            instructor_id: new.instructor_id,
            created_at: Utc::now(),
        };
        tables.courses.push(course.clone());
        Ok(course)
    }

    async fn list_modules(&self, course_id: i64) -> StoreResult<Vec<CourseModule>> {
        let tables = self.tables.read().await;
        let mut modules: Vec<CourseModule> = tables
            .modules
            .iter()
            .filter(|m| m.course_id == course_id)
            .cloned()
            .collect();
        modules.sort_by_key(|m| (m.position, m.id));
        Ok(modules)
    }

    async fn create_module(
        &self,
        course_id: i64,
        new: CreateModuleRequest,
    ) -> StoreResult<CourseModule> {
        let mut tables = self.tables.write().await;
        let position = new.position.unwrap_or_else(|| {
            tables
                .modules
                .iter()
                .filter(|m| m.course_id == course_id)
                .map(|m| m.position)
                .max()
                .unwrap_or(0)
                + 1
        });
        let module = CourseModule {
            id: tables.next_id(),
            course_id,
            title: new.title,
            content: new.content,
            position,
            created_at: Utc::now(),
        };
        tables.modules.push(module.clone());
        Ok(module)
    }

    async fn count_enrollments(&self, course_id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .count() as i64)
    }

    async fn find_enrollment(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> StoreResult<Option<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned())
    }

    async fn create_enrollment(&self, user_id: i64, course_id: i64) -> StoreResult<Enrollment> {
        let mut tables = self.tables.write().await;
        if tables
            .enrollments
            .iter()
            .any(|e| e.user_id == user_id && e.course_id == course_id)
        {
            return Err(AppError::Conflict(
                "Already enrolled in this course".to_string(),
            ));
        }
        let enrollment = Enrollment {
            id: tables.next_id(),
            user_id,
            course_id,
            progress: 0,
            enrolled_at: Utc::now(),
        };
        tables.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn list_enrollments(&self, user_id: i64) -> StoreResult<Vec<Enrollment>> {
        let tables = self.tables.read().await;
        let mut enrollments: Vec<Enrollment> = tables
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at).then(b.id.cmp(&a.id)));
        Ok(enrollments)
    }

    async fn update_progress(
        &self,
        user_id: i64,
        course_id: i64,
        progress: i32,
    ) -> StoreResult<Option<Enrollment>> {
        let mut tables = self.tables.write().await;
        let enrollment = tables
            .enrollments
            .iter_mut()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .map(|e| {
                e.progress = progress;
                e.clone()
            });
        Ok(enrollment)
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn find_quiz(&self, id: i64) -> StoreResult<Option<Quiz>> {
        let tables = self.tables.read().await;
        Ok(tables.quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn list_quizzes(&self, course_id: i64) -> StoreResult<Vec<Quiz>> {
        let tables = self.tables.read().await;
        let mut quizzes: Vec<Quiz> = tables
            .quizzes
            .iter()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect();
        quizzes.sort_by_key(|q| (q.created_at, q.id));
        Ok(quizzes)
    }

    async fn create_quiz(&self, new: CreateQuizRequest) -> StoreResult<Quiz> {
        let mut tables = self.tables.write().await;
        let quiz = Quiz {
            id: tables.next_id(),
            course_id: new.course_id,
            title: new.title,
            duration_seconds: new.duration_seconds,
            created_at: Utc::now(),
        };
        for (idx, question) in new.questions.into_iter().enumerate() {
            let question = Question {
                id: tables.next_id(),
                quiz_id: quiz.id,
                text: question.text,
                options: Json(question.options),
                correct_answer: question.correct_answer,
                position: question.position.unwrap_or(idx as i32 + 1),
            };
            tables.questions.push(question);
        }
        tables.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn list_questions(&self, quiz_id: i64) -> StoreResult<Vec<Question>> {
        let tables = self.tables.read().await;
        let mut questions: Vec<Question> = tables
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.position, q.id));
        Ok(questions)
    }

    async fn count_questions(&self, quiz_id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().filter(|q| q.quiz_id == quiz_id).count() as i64)
    }

    async fn add_question(
        &self,
        quiz_id: i64,
        new: CreateQuestionRequest,
    ) -> StoreResult<Question> {
        let mut tables = self.tables.write().await;
        let position = match new.position {
            Some(position) => position,
            None => tables.next_question_position(quiz_id),
        };
        let question = Question {
            id: tables.next_id(),
            quiz_id,
            text: new.text,
            options: Json(new.options),
            correct_answer: new.correct_answer,
            position,
        };
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn find_question(&self, id: i64) -> StoreResult<Option<Question>> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn delete_question(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != id);
        Ok(tables.questions.len() < before)
    }

    async fn start_or_resume_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        total: i32,
    ) -> StoreResult<(QuizAttempt, bool)> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .attempts
            .iter()
            .find(|a| a.user_id == user_id && a.quiz_id == quiz_id && !a.is_completed())
        {
            return Ok((existing.clone(), false));
        }
        let attempt = QuizAttempt {
            id: tables.next_id(),
            user_id,
            quiz_id,
            score: 0,
            total,
            answers: Json(Vec::new()),
            started_at: Utc::now(),
            completed_at: None,
        };
        tables.attempts.push(attempt.clone());
        Ok((attempt, true))
    }

    async fn find_active_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> StoreResult<Option<QuizAttempt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .find(|a| a.user_id == user_id && a.quiz_id == quiz_id && !a.is_completed())
            .cloned())
    }

    async fn complete_attempt(
        &self,
        attempt_id: i64,
        score: i32,
        answers: Vec<Option<i32>>,
    ) -> StoreResult<Option<QuizAttempt>> {
        let mut tables = self.tables.write().await;
        let attempt = tables
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && !a.is_completed())
            .map(|a| {
                a.score = score;
                a.answers = Json(answers);
                a.completed_at = Some(Utc::now());
                a.clone()
            });
        Ok(attempt)
    }

    async fn list_completed_attempts(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> StoreResult<Vec<QuizAttempt>> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<QuizAttempt> = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id && a.is_completed())
            .cloned()
            .collect();
        attempts.sort_by(newest_completed_first);
        Ok(attempts)
    }

    async fn latest_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> StoreResult<Option<QuizAttempt>> {
        let tables = self.tables.read().await;
        let mine = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id);

        if let Some(in_progress) = mine.clone().find(|a| !a.is_completed()) {
            return Ok(Some(in_progress.clone()));
        }
        Ok(mine.min_by(|a, b| newest_completed_first(a, b)).cloned())
    }

    async fn count_attempts(&self, quiz_id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.attempts.iter().filter(|a| a.quiz_id == quiz_id).count() as i64)
    }

    async fn list_user_completed_attempts(&self, user_id: i64) -> StoreResult<Vec<QuizAttempt>> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<QuizAttempt> = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.is_completed())
            .cloned()
            .collect();
        attempts.sort_by(newest_completed_first);
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_request(course_id: i64, answers: &[i32]) -> CreateQuizRequest {
        CreateQuizRequest {
            course_id,
            title: "Vital signs".into(),
            duration_seconds: 600,
            questions: answers
                .iter()
                .map(|&correct_answer| CreateQuestionRequest {
                    text: "?".into(),
                    options: vec!["a".into(), "b".into(), "c".into()],
                    correct_answer,
                    position: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn start_twice_returns_same_attempt() {
        let store = MemoryStore::new();
        let (first, created) = store.start_or_resume_attempt(1, 2, 3).await.unwrap();
        assert!(created);
        let (second, created) = store.start_or_resume_attempt(1, 2, 5).await.unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(second.total, 3);
    }

    #[tokio::test]
    async fn complete_is_write_once() {
        let store = MemoryStore::new();
        let (started, _) = store.start_or_resume_attempt(1, 2, 2).await.unwrap();
        let active = store.find_active_attempt(1, 2).await.unwrap().unwrap();
        assert_eq!(active.id, started.id);

        let done = store
            .complete_attempt(started.id, 2, vec![Some(0), Some(1)])
            .await
            .unwrap()
            .expect("attempt in progress");
        assert!(done.is_completed());
        assert_eq!(done.score, 2);

        let again = store.complete_attempt(started.id, 0, vec![]).await.unwrap();
        assert!(again.is_none());
        assert!(store.find_active_attempt(1, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_starts_create_one_attempt() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.start_or_resume_attempt(9, 4, 1).await.unwrap() })
            })
            .collect();

        let mut created = 0;
        let mut ids = Vec::new();
        for handle in handles {
            let (attempt, was_created) = handle.await.unwrap();
            created += was_created as usize;
            ids.push(attempt.id);
        }
        ids.dedup();
        assert_eq!(created, 1);
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn questions_follow_position_order() {
        let store = MemoryStore::new();
        let quiz = store.create_quiz(quiz_request(1, &[0, 1])).await.unwrap();
        store
            .add_question(
                quiz.id,
                CreateQuestionRequest {
                    text: "first".into(),
                    options: vec!["x".into(), "y".into()],
                    correct_answer: 0,
                    position: Some(0),
                },
            )
            .await
            .unwrap();

        let questions = store.list_questions(quiz.id).await.unwrap();
        let positions: Vec<i32> = questions.iter().map(|q| q.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(questions[0].text, "first");
    }

    #[tokio::test]
    async fn latest_attempt_prefers_in_progress() {
        let store = MemoryStore::new();
        let (first, _) = store.start_or_resume_attempt(1, 2, 1).await.unwrap();
        store.complete_attempt(first.id, 1, vec![Some(0)]).await.unwrap();
        let (open, _) = store.start_or_resume_attempt(1, 2, 1).await.unwrap();

        let latest = store.latest_attempt(1, 2).await.unwrap().unwrap();
        assert_eq!(latest.id, open.id);
        assert!(!latest.is_completed());
    }

    #[tokio::test]
    async fn duplicate_enrollment_conflicts() {
        let store = MemoryStore::new();
        store.create_enrollment(1, 1).await.unwrap();
        let err = store.create_enrollment(1, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
