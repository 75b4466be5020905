// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

use crate::models::quiz::QuizSummary;

/// Difficulty level of a course. Stored as the `course_level` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "course_level", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: f64,
    /// Course length in minutes.
    pub duration_minutes: i32,
    pub level: CourseLevel,
    pub image_url: Option<String>,
    pub instructor_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'modules' table: one ordered unit of course content.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    /// Sanitized HTML body.
    pub content: String,
    pub position: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Module outline used in catalog listings (no content body).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOutline {
    pub id: i64,
    pub title: String,
    pub position: i32,
}

impl From<&CourseModule> for ModuleOutline {
    fn from(module: &CourseModule) -> Self {
        Self {
            id: module.id,
            title: module.title.clone(),
            position: module.position,
        }
    }
}

/// Catalog entry returned by the course listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleOutline>,
    pub enrollment_count: i64,
    /// Whether the caller is enrolled; always false for anonymous callers.
    pub is_enrolled: bool,
}

/// Full course page: modules with content plus its quizzes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<CourseModule>,
    pub quizzes: Vec<QuizSummary>,
    pub enrollment_count: i64,
    pub is_enrolled: bool,
}

/// Query parameters for listing courses.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseListParams {
    /// Case-insensitive keyword matched against title and description.
    pub q: Option<String>,
    pub level: Option<CourseLevel>,
    pub max_price: Option<f64>,
}

impl CourseListParams {
    /// In-process equivalent of the SQL filter, used by the memory store.
    pub fn matches(&self, course: &Course) -> bool {
        if let Some(level) = self.level {
            if course.level != level {
                return false;
            }
        }
        if let Some(max_price) = self.max_price {
            if course.price > max_price {
                return false;
            }
        }
        match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                course.title.to_lowercase().contains(&q)
                    || course.description.to_lowercase().contains(&q)
            }
            _ => true,
        }
    }
}

/// DTO for creating a new course.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 20000, message = "Description is required"))]
    pub description: String,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration_minutes: i32,
    pub level: CourseLevel,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
}

/// Insert payload for a course, carrying the creating instructor.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub duration_minutes: i32,
    pub level: CourseLevel,
    pub image_url: Option<String>,
    pub instructor_id: Option<i64>,
}

/// DTO for adding a module to a course.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100000))]
    pub content: String,
    /// 1-based position; appended after the last module when omitted.
    #[validate(range(min = 1))]
    pub position: Option<i32>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(title: &str, price: f64, level: CourseLevel) -> Course {
        Course {
            id: 1,
            title: title.into(),
            description: "Patient assessment and care".into(),
            price,
            duration_minutes: 120,
            level,
            image_url: None,
            instructor_id: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn filter_matches_keyword_level_and_price() {
        let c = course("Critical Care Nursing", 199.99, CourseLevel::Advanced);

        assert!(CourseListParams::default().matches(&c));
        assert!(CourseListParams { q: Some("critical".into()), ..Default::default() }.matches(&c));
        assert!(CourseListParams { q: Some("ASSESSMENT".into()), ..Default::default() }.matches(&c));
        assert!(!CourseListParams { q: Some("pediatrics".into()), ..Default::default() }.matches(&c));
        assert!(!CourseListParams { level: Some(CourseLevel::Beginner), ..Default::default() }.matches(&c));
        assert!(!CourseListParams { max_price: Some(100.0), ..Default::default() }.matches(&c));
    }

    #[test]
    fn keyword_wildcards_are_literal() {
        let c = course("Critical Care Nursing", 0.0, CourseLevel::Advanced);
        let search = |q: &str| CourseListParams { q: Some(q.into()), ..Default::default() };

        assert!(!search("%").matches(&c));
        assert!(!search("Critical_Care").matches(&c));
        assert!(search("Critical Care").matches(&c));
    }

    #[test]
    fn create_course_validation() {
        let mut req = CreateCourseRequest {
            title: "Wound Care".into(),
            description: "Dressings".into(),
            price: 0.0,
            duration_minutes: 60,
            level: CourseLevel::Beginner,
            image_url: Some("https://images.example.com/wound.png".into()),
        };
        assert!(req.validate().is_ok());

        req.price = -1.0;
        req.image_url = Some("not a url".into());
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
        assert!(errors.field_errors().contains_key("image_url"));
    }
}
