//! Axum route handlers for signup, login and the caller's profile.

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        FromRef, State,
    },
    Form, Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::auth::extractor::CurrentUser;
use crate::auth::jwt::TokenKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::errors::AppError;
use crate::models::user::{LoginForm, NewUser, SignupRequest, TokenResponse, UserResponse};
use crate::state::AppState;
use crate::users::{DUPLICATE_EMAIL, DUPLICATE_USERNAME};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 6;

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_signup(payload: &SignupRequest) -> Result<(), AppError> {
    if !is_valid_email(&payload.email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    let username_len = payload.username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&username_len) {
        return Err(AppError::Validation(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        )));
    }
    if payload.password.chars().count() < PASSWORD_MIN {
        return Err(AppError::Validation(format!(
            "Password must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

/// POST /signup
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();
    if let Err(e) = validate_signup(&payload) {
        warn!(username = %payload.username, error = %e, "signup rejected");
        return Err(e);
    }

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Validation(DUPLICATE_EMAIL.into()));
    }
    if state.users.find_by_username(&payload.username).await?.is_some() {
        warn!(username = %payload.username, "username already taken");
        return Err(AppError::Validation(DUPLICATE_USERNAME.into()));
    }

    let hashed_password = hash_password(&payload.password)
        .map_err(|e| AppError::Internal(e.context("Signup failed")))?;

    let user = state
        .users
        .insert(NewUser {
            email: payload.email,
            username: payload.username,
            hashed_password,
            full_name: payload.full_name,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(UserResponse::from(&user)))
}

/// POST /token
///
/// Form-encoded `username` + `password`; both an unknown username and a wrong
/// password produce the same 401.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Form(form) = form?;
    let Some(user) = state.users.find_by_username(&form.username).await? else {
        warn!(username = %form.username, "login unknown username");
        return Err(AppError::Unauthorized);
    };

    let ok = verify_password(&form.password, &user.hashed_password)
        .map_err(|e| AppError::Internal(e.context("Login failed")))?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized);
    }

    let access_token = TokenKeys::from_ref(&state)
        .issue(&user.email)
        .map_err(|e| AppError::Internal(e.context("Login failed")))?;

    info!(user_id = %user.id, "access token issued");
    Ok(Json(TokenResponse::bearer(access_token)))
}

/// GET /users/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
