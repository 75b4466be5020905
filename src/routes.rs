// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, courses, health, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, instructor_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Each area (auth, courses, quiz) is split into public, optional-auth,
///   authenticated and instructor-only groups, merged under one prefix.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = || middleware::from_fn_with_state(state.clone(), auth_middleware);
    let optional_auth = || middleware::from_fn_with_state(state.clone(), optional_auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .merge(
            Router::new()
                .route("/profile", get(auth::get_profile))
                .route("/change-password", post(auth::change_password))
                .layer(require_auth()),
        );

    let course_routes = Router::new()
        .route("/", get(courses::list_courses))
        .route("/{id}", get(courses::get_course))
        .layer(optional_auth())
        .merge(
            Router::new()
                .route("/enroll", post(courses::enroll))
                .route("/user/enrollments", get(courses::list_my_enrollments))
                .route("/{id}/progress", put(courses::update_progress))
                .layer(require_auth()),
        )
        .merge(
            Router::new()
                .route("/", post(courses::create_course))
                .route("/{id}/modules", post(courses::create_module))
                // Auth first, then the role check
                .layer(middleware::from_fn(instructor_middleware))
                .layer(require_auth()),
        );

    let quiz_routes = Router::new()
        .route("/course/{course_id}", get(quiz::list_course_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        .layer(optional_auth())
        .merge(
            Router::new()
                .route("/start", post(quiz::start_attempt))
                .route("/submit", post(quiz::submit_attempt))
                .route("/results/{quiz_id}", get(quiz::get_results))
                .layer(require_auth()),
        )
        .merge(
            Router::new()
                .route("/", post(quiz::create_quiz))
                .route("/{id}/questions", post(quiz::add_question))
                .route("/questions/{id}", delete(quiz::delete_question))
                .layer(middleware::from_fn(instructor_middleware))
                .layer(require_auth()),
        );

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/quiz", quiz_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
