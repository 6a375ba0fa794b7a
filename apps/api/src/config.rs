use std::str::FromStr;

use anyhow::{bail, Context, Result};
use jsonwebtoken::Algorithm;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432";
const DEFAULT_DB_NAME: &str = "jobdraft";
const DEFAULT_SECRET_KEY: &str = "unsafe_secret_key_for_dev";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";
/// One year. Keeps `iat + ttl` well inside `i64` seconds.
const MAX_EXPIRE_MINUTES: i64 = 525_600;

/// Application configuration loaded from environment variables.
///
/// `GROQ_API_KEY` and `DATABASE_URL` are required for a working deployment but
/// their absence does not stop startup; see [`Config::missing_required`].
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub database_url: String,
    pub db_name: String,
    pub jwt: JwtConfig,
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub rust_log: String,
    /// Names of required variables that were unset and fell back to a default.
    pub missing_required: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub expire_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let mut missing_required = Vec::new();

        let groq_api_key = optional_env("GROQ_API_KEY").unwrap_or_else(|| {
            missing_required.push("GROQ_API_KEY");
            String::new()
        });
        let database_url = optional_env("DATABASE_URL").unwrap_or_else(|| {
            missing_required.push("DATABASE_URL");
            DEFAULT_DATABASE_URL.to_string()
        });

        let algorithm = parse_algorithm(
            &optional_env("ALGORITHM").unwrap_or_else(|| "HS256".to_string()),
        )?;
        let expire_minutes = optional_env("ACCESS_TOKEN_EXPIRE_MINUTES")
            .map(|v| parse_expire_minutes(&v))
            .transpose()?
            .unwrap_or(30);

        Ok(Config {
            groq_api_key,
            database_url,
            db_name: optional_env("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            jwt: JwtConfig {
                secret: optional_env("SECRET_KEY")
                    .unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string()),
                algorithm,
                expire_minutes,
            },
            cors_origins: parse_origins(
                &optional_env("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            missing_required,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Only HMAC algorithms are usable with a shared secret.
fn parse_algorithm(raw: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::from_str(raw.trim())
        .with_context(|| format!("ALGORITHM '{raw}' is not a known JWT algorithm"))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => bail!("ALGORITHM {other:?} requires a key pair; use HS256, HS384 or HS512"),
    }
}

fn parse_expire_minutes(raw: &str) -> Result<i64> {
    let minutes = raw
        .trim()
        .parse::<i64>()
        .context("ACCESS_TOKEN_EXPIRE_MINUTES must be an integer")?;
    if !(1..=MAX_EXPIRE_MINUTES).contains(&minutes) {
        bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {MAX_EXPIRE_MINUTES}, got {minutes}");
    }
    Ok(minutes)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            groq_api_key: String::new(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_name: DEFAULT_DB_NAME.to_string(),
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                algorithm: Algorithm::HS256,
                expire_minutes: 30,
            },
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            port: 0,
            rust_log: "debug".to_string(),
            missing_required: Vec::new(),
        }
    }
}
