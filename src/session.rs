// src/session.rs

//! Timed quiz session as the client runs it.
//!
//! The countdown is advisory: the server stamps `started_at` on the attempt
//! and reports the deadline, but accepts a submission at any time. The only
//! guard against re-submission is the attempt's completion state.

use chrono::{DateTime, Duration, Utc};

use crate::models::{attempt::QuizAttempt, quiz::Quiz};

/// Per-session state: when the countdown started, how long it runs, and the
/// answers recorded so far (one slot per question position).
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    started_at: DateTime<Utc>,
    duration: Duration,
    answers: Vec<Option<i32>>,
}

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining_seconds: i64 },
    /// Time is up; the client submits whatever has been recorded.
    Expired,
}

impl QuizSession {
    pub fn new(question_count: usize, duration_seconds: i32, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration: Duration::seconds(i64::from(duration_seconds.max(0))),
            answers: vec![None; question_count],
        }
    }

    /// Rebuilds the session for an attempt so a resumed attempt keeps its
    /// original deadline instead of restarting the clock.
    pub fn for_attempt(attempt: &QuizAttempt, quiz: &Quiz) -> Self {
        let slots = usize::try_from(attempt.total).unwrap_or(0);
        let mut session = Self::new(slots, quiz.duration_seconds, attempt.started_at);
        for (position, choice) in attempt.answers.0.iter().enumerate() {
            if let Some(choice) = choice {
                session.record(position, *choice);
            }
        }
        session
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + self.duration
    }

    /// Time left, never negative.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline() - now).max(Duration::zero())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }

    pub fn tick(&self, now: DateTime<Utc>) -> Tick {
        if self.is_expired(now) {
            Tick::Expired
        } else {
            Tick::Running {
                remaining_seconds: self.remaining(now).num_seconds(),
            }
        }
    }

    /// Records a choice; returns false when the position is outside the quiz.
    pub fn record(&mut self, position: usize, choice: i32) -> bool {
        match self.answers.get_mut(position) {
            Some(slot) => {
                *slot = Some(choice);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, position: usize) {
        if let Some(slot) = self.answers.get_mut(position) {
            *slot = None;
        }
    }

    pub fn answers(&self) -> &[Option<i32>] {
        &self.answers
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    /// Answers to submit. Trailing unanswered slots are dropped; the scorer
    /// treats missing and unanswered positions the same way.
    pub fn into_answers(mut self) -> Vec<Option<i32>> {
        while matches!(self.answers.last(), Some(None)) {
            self.answers.pop();
        }
        self.answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::question::Question, services::attempt::score_answers};
    use sqlx::types::Json;

    fn question(id: i64, correct_answer: i32) -> Question {
        Question {
            id,
            quiz_id: 1,
            text: format!("Q{id}"),
            options: Json(vec!["a".into(), "b".into(), "c".into()]),
            correct_answer,
            position: id as i32,
        }
    }

    #[test]
    fn countdown_runs_then_expires() {
        let start = Utc::now();
        let session = QuizSession::new(3, 30, start);

        assert_eq!(session.deadline(), start + Duration::seconds(30));
        assert_eq!(
            session.tick(start + Duration::seconds(10)),
            Tick::Running { remaining_seconds: 20 }
        );
        assert_eq!(session.tick(start + Duration::seconds(30)), Tick::Expired);
        assert_eq!(session.remaining(start + Duration::seconds(90)), Duration::zero());
    }

    #[test]
    fn record_ignores_positions_outside_quiz() {
        let mut session = QuizSession::new(2, 60, Utc::now());
        assert!(session.record(0, 1));
        assert!(!session.record(5, 1));
        session.record(1, 2);
        session.clear(1);
        assert_eq!(session.answers(), &[Some(1), None]);
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn expiry_submits_partial_answers() {
        let questions = vec![question(1, 1), question(2, 0), question(3, 2)];
        let start = Utc::now();
        let mut session = QuizSession::new(questions.len(), 5, start);
        session.record(0, 1);
        session.record(1, 2);

        assert!(session.is_expired(start + Duration::seconds(5)));
        let answers = session.into_answers();
        assert_eq!(answers, vec![Some(1), Some(2)]);
        assert_eq!(score_answers(&questions, &answers), 1);
    }

    #[test]
    fn resumed_attempt_keeps_original_deadline() {
        let started_at = Utc::now() - Duration::seconds(40);
        let attempt = QuizAttempt {
            id: 1,
            user_id: 1,
            quiz_id: 1,
            score: 0,
            total: 3,
            answers: Json(vec![]),
            started_at,
            completed_at: None,
        };
        let quiz = Quiz {
            id: 1,
            course_id: 1,
            title: "Vitals".into(),
            duration_seconds: 60,
            created_at: started_at,
        };
        let session = QuizSession::for_attempt(&attempt, &quiz);
        assert_eq!(session.deadline(), started_at + Duration::seconds(60));
        assert_eq!(session.answers().len(), 3);
    }
}
