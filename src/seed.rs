// src/seed.rs

//! Startup seeding: an optional instructor account and the demo nursing catalog.

use crate::{
    config::Config,
    error::AppError,
    models::{
        course::{CourseLevel, CreateModuleRequest, NewCourse},
        question::CreateQuestionRequest,
        quiz::CreateQuizRequest,
        user::{NewUser, Role},
    },
    store::Store,
    utils::hash::hash_password,
};

/// Creates the instructor from `INSTRUCTOR_EMAIL` / `INSTRUCTOR_PASSWORD` if
/// both are set and the account does not exist yet. Returns its id.
pub async fn seed_instructor(store: &dyn Store, config: &Config) -> Result<Option<i64>, AppError> {
    let (Some(email), Some(password)) = (&config.instructor_email, &config.instructor_password)
    else {
        return Ok(None);
    };

    let email = email.trim().to_lowercase();
    if let Some(existing) = store.find_user_by_email(&email).await? {
        return Ok(Some(existing.id));
    }

    tracing::info!("Seeding instructor user: {}", email);
    let user = store
        .create_user(NewUser {
            email,
            name: "Course Instructor".to_string(),
            password_hash: hash_password(password)?,
            role: Role::Instructor,
        })
        .await?;
    tracing::info!("Instructor user created successfully.");

    Ok(Some(user.id))
}

struct DemoQuestion {
    text: &'static str,
    options: [&'static str; 4],
    correct_answer: i32,
}

struct DemoCourse {
    title: &'static str,
    description: &'static str,
    price: f64,
    duration_minutes: i32,
    level: CourseLevel,
    image_url: &'static str,
    modules: &'static [(&'static str, &'static str)],
    quiz: Option<(&'static str, i32, &'static [DemoQuestion])>,
}

const DEMO_CATALOG: &[DemoCourse] = &[
    DemoCourse {
        title: "Fundamentals of Nursing Practice",
        description: "Learn the essential principles and practices of professional nursing care, including patient assessment, medication administration, and therapeutic communication.",
        price: 0.0,
        duration_minutes: 120,
        level: CourseLevel::Beginner,
        image_url: "https://images.unsplash.com/photo-1559757148-5c350d0d3c56?w=400",
        modules: &[
            ("Introduction to Nursing", "Overview of nursing profession, ethics, and professional standards."),
            ("Patient Assessment", "Comprehensive guide to patient assessment techniques and documentation."),
            ("Medication Administration", "Safe medication administration practices and dosage calculations."),
        ],
        quiz: Some((
            "Nursing Fundamentals Quiz",
            1800,
            &[
                DemoQuestion {
                    text: "What is the primary purpose of patient assessment?",
                    options: [
                        "To diagnose the patient",
                        "To gather comprehensive patient information",
                        "To prescribe medication",
                        "To discharge the patient",
                    ],
                    correct_answer: 1,
                },
                DemoQuestion {
                    text: "Which of the 'rights' of medication administration confirms the patient's identity?",
                    options: ["Right patient", "Right time", "Right route", "Right dose"],
                    correct_answer: 0,
                },
                DemoQuestion {
                    text: "What is the normal resting heart rate range for adults?",
                    options: ["60-100 bpm", "40-60 bpm", "100-140 bpm", "20-40 bpm"],
                    correct_answer: 0,
                },
            ],
        )),
    },
    DemoCourse {
        title: "Advanced Patient Care Management",
        description: "Master complex patient care scenarios, critical thinking in nursing practice, and advanced assessment techniques for various patient populations.",
        price: 99.99,
        duration_minutes: 180,
        level: CourseLevel::Intermediate,
        image_url: "https://images.unsplash.com/photo-1576091160399-112ba8d25d1f?w=400",
        modules: &[
            ("Complex Care Planning", "Developing comprehensive care plans for patients with multiple conditions."),
            ("Leadership in Nursing", "Leadership skills and team management in healthcare settings."),
        ],
        quiz: Some((
            "Patient Care Assessment Quiz",
            2700,
            &[
                DemoQuestion {
                    text: "Which step of the nursing process follows assessment?",
                    options: ["Implementation", "Evaluation", "Diagnosis", "Planning"],
                    correct_answer: 2,
                },
                DemoQuestion {
                    text: "Which scale is commonly used to assess level of consciousness?",
                    options: ["Braden Scale", "Glasgow Coma Scale", "Morse Fall Scale", "Apgar Score"],
                    correct_answer: 1,
                },
            ],
        )),
    },
    DemoCourse {
        title: "Critical Care Nursing",
        description: "Specialized training for intensive care units, including advanced life support, monitoring critical patients, and emergency response protocols.",
        price: 199.99,
        duration_minutes: 240,
        level: CourseLevel::Advanced,
        image_url: "https://images.unsplash.com/photo-1582750433449-648ed127bb54?w=400",
        modules: &[],
        quiz: None,
    },
];

/// Seeds the demo catalog unless courses already exist.
pub async fn seed_demo_catalog(store: &dyn Store, instructor_id: Option<i64>) -> Result<(), AppError> {
    if !store.list_courses(&Default::default()).await?.is_empty() {
        tracing::debug!("Catalog already populated, skipping demo seed");
        return Ok(());
    }

    for demo in DEMO_CATALOG {
        let course = store
            .create_course(NewCourse {
                title: demo.title.to_string(),
                description: demo.description.to_string(),
                price: demo.price,
                duration_minutes: demo.duration_minutes,
                level: demo.level,
                image_url: Some(demo.image_url.to_string()),
                instructor_id,
            })
            .await?;

        for (idx, (title, content)) in demo.modules.iter().enumerate() {
            store
                .create_module(
                    course.id,
                    CreateModuleRequest {
                        title: title.to_string(),
                        content: content.to_string(),
                        position: Some(idx as i32 + 1),
                    },
                )
                .await?;
        }

        if let Some((title, duration_seconds, questions)) = demo.quiz {
            store
                .create_quiz(CreateQuizRequest {
                    course_id: course.id,
                    title: title.to_string(),
                    duration_seconds,
                    questions: questions
                        .iter()
                        .map(|q| CreateQuestionRequest {
                            text: q.text.to_string(),
                            options: q.options.iter().map(|o| o.to_string()).collect(),
                            correct_answer: q.correct_answer,
                            position: None,
                        })
                        .collect(),
                })
                .await?;
        }
    }

    tracing::info!("Demo catalog seeded: {} courses", DEMO_CATALOG.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CourseStore, MemoryStore, QuizStore, UserStore};

    #[tokio::test]
    async fn demo_catalog_is_seeded_once() {
        let store = MemoryStore::new();
        seed_demo_catalog(&store, None).await.unwrap();
        seed_demo_catalog(&store, None).await.unwrap();

        let courses = store.list_courses(&Default::default()).await.unwrap();
        assert_eq!(courses.len(), DEMO_CATALOG.len());

        let fundamentals = courses
            .iter()
            .find(|c| c.title == "Fundamentals of Nursing Practice")
            .unwrap();
        assert_eq!(store.list_modules(fundamentals.id).await.unwrap().len(), 3);
        let quizzes = store.list_quizzes(fundamentals.id).await.unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(store.count_questions(quizzes[0].id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn instructor_needs_both_credentials() {
        let store = MemoryStore::new();
        let mut config = Config::for_tests("secret");
        assert_eq!(seed_instructor(&store, &config).await.unwrap(), None);

        config.instructor_email = Some("instructor@example.com".into());
        config.instructor_password = Some("password123".into());
        let id = seed_instructor(&store, &config).await.unwrap().unwrap();
        assert_eq!(seed_instructor(&store, &config).await.unwrap(), Some(id));

        let user = store.find_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Instructor);
    }
}
