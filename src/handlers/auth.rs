// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{
        AuthResponse, ChangePasswordRequest, DashboardStats, ForgotPasswordRequest, LoginRequest,
        NewUser, ProfileResponse, RegisterRequest, ResetPasswordRequest, Role, User,
    },
    services::attempt::percentage,
    store::DynStore,
    utils::{
        hash::{generate_reset_token, hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn auth_response(user: User, config: &Config) -> Result<AuthResponse, AppError> {
    let token = sign_jwt(user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;
    Ok(AuthResponse {
        token,
        token_type: "Bearer",
        user,
    })
}

/// Registers a new student account.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with a token so the client is signed in right away.
pub async fn register(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = store
        .create_user(NewUser {
            email: normalize_email(&payload.email),
            name: payload.name.trim().to_string(),
            password_hash: hashed_password,
            role: Role::Student,
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(auth_response(user, &config)?)))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    Ok(Json(auth_response(user, &config)?))
}

/// Returns the current user with dashboard statistics.
pub async fn get_profile(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let enrollments = store.list_enrollments(user_id).await?;
    let attempts = store.list_user_completed_attempts(user_id).await?;

    let average_score = if attempts.is_empty() {
        None
    } else {
        let sum: i64 = attempts
            .iter()
            .map(|a| i64::from(percentage(a.score, a.total)))
            .sum();
        Some((sum as f64 / attempts.len() as f64).round() as i64)
    };

    let stats = DashboardStats {
        enrolled_courses: enrollments.len() as i64,
        completed_courses: enrollments.iter().filter(|e| e.progress >= 100).count() as i64,
        completed_quizzes: attempts.len() as i64,
        average_score,
    };

    Ok(Json(ProfileResponse { user, stats }))
}

pub async fn change_password(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&payload.current_password, &user.password)? {
        return Err(AppError::AuthError(
            "Current password is incorrect".to_string(),
        ));
    }

    let hashed = hash_password(&payload.new_password)?;
    store.update_password(user.id, &hashed).await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// Issues a password reset token.
///
/// Always answers 200 so the endpoint does not reveal which emails exist.
/// There is no mail transport: the reset link is written to the log.
pub async fn forgot_password(
    State(store): State<DynStore>,
    State(config): State<Config>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(user) = store
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
    {
        let token = generate_reset_token();
        let token_hash = hash_password(&token)?;
        let expires_at = Utc::now() + Duration::seconds(config.password_reset_ttl as i64);

        store.set_reset_token(user.id, &token_hash, expires_at).await?;

        tracing::info!(
            user_id = user.id,
            "Password reset requested: /reset-password?token={}&id={}",
            token,
            user.id
        );
    }

    Ok(Json(json!({
        "message": "If an account with that email exists, a password reset link has been sent"
    })))
}

pub async fn reset_password(
    State(store): State<DynStore>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invalid = || AppError::BadRequest("Invalid or expired reset token".to_string());

    let user = store
        .find_user_by_id(payload.user_id)
        .await?
        .ok_or_else(invalid)?;

    let (Some(token_hash), Some(expires_at)) =
        (user.reset_token_hash.as_deref(), user.reset_token_expires_at)
    else {
        return Err(invalid());
    };

    if expires_at < Utc::now() || !verify_password(&payload.token, token_hash)? {
        return Err(invalid());
    }

    let hashed = hash_password(&payload.password)?;
    store.update_password(user.id, &hashed).await?;
    tracing::info!(user_id = user.id, "Password reset completed");

    Ok(Json(json!({ "message": "Password has been reset successfully" })))
}
