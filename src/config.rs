// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Token lifetime used when `JWT_EXPIRATION` is not set (one day).
pub const DEFAULT_JWT_EXPIRATION: u64 = 86_400;

/// Password reset tokens are valid for one hour unless overridden.
pub const DEFAULT_PASSWORD_RESET_TTL: u64 = 3_600;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When absent the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// JWT lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Password reset token lifetime in seconds.
    pub password_reset_ttl: u64,
    pub instructor_email: Option<String>,
    pub instructor_password: Option<String>,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        let password_reset_ttl = env::var("PASSWORD_RESET_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PASSWORD_RESET_TTL);

        let seed_demo_data = env::var("SEED_DEMO_DATA")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            password_reset_ttl,
            instructor_email: env::var("INSTRUCTOR_EMAIL").ok(),
            instructor_password: env::var("INSTRUCTOR_PASSWORD").ok(),
            seed_demo_data,
        }
    }

    /// Configuration used by the test-suites: memory store, short-lived tokens.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            port: 0,
            password_reset_ttl: DEFAULT_PASSWORD_RESET_TTL,
            instructor_email: None,
            instructor_password: None,
            seed_demo_data: false,
        }
    }
}
