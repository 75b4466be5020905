// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    pub quiz_id: i64,

    /// The text content of the question.
    pub text: String,

    /// Answer options in display order.
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Zero-based index into `options`.
    pub correct_answer: i32,

    /// Ordering key within the quiz. Answers are matched to questions by this order.
    pub position: i32,
}

/// DTO for sending a question to a quiz taker (excludes the correct answer).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub position: i32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            text: q.text,
            options: q.options.0,
            position: q.position,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_answer_index, skip_on_field_errors = false))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000, message = "Question text is required"))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(min = 0, message = "Correct answer index is required"))]
    pub correct_answer: i32,
    /// Appended after the last question when omitted.
    #[validate(range(min = 1, message = "Question order must start at 1"))]
    pub position: Option<i32>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// The correct answer must point at one of the options.
fn validate_answer_index(req: &CreateQuestionRequest) -> Result<(), validator::ValidationError> {
    let in_bounds = usize::try_from(req.correct_answer)
        .map(|idx| idx < req.options.len())
        .unwrap_or(false);
    if !in_bounds {
        return Err(validator::ValidationError::new("correct_answer_out_of_bounds"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: &[&str], correct_answer: i32) -> CreateQuestionRequest {
        CreateQuestionRequest {
            text: "Normal adult resting heart rate?".into(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer,
            position: None,
        }
    }

    #[test]
    fn accepts_in_bounds_answer() {
        assert!(request(&["40-60", "60-100", "100-140"], 1).validate().is_ok());
        assert!(request(&["40-60", "60-100"], 0).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_bounds_answer() {
        assert!(request(&["40-60", "60-100"], 2).validate().is_err());
        assert!(request(&["40-60", "60-100"], -1).validate().is_err());
    }

    #[test]
    fn rejects_single_option() {
        assert!(request(&["only"], 0).validate().is_err());
    }

    #[test]
    fn public_question_hides_answer() {
        let q = Question {
            id: 7,
            quiz_id: 1,
            text: "?".into(),
            options: Json(vec!["a".into(), "b".into()]),
            correct_answer: 1,
            position: 1,
        };
        let json = serde_json::to_value(PublicQuestion::from(q)).unwrap();
        assert!(json.get("correctAnswer").is_none());
        assert_eq!(json["options"][1], "b");
    }
}
