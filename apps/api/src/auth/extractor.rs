use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use super::jwt::TokenKeys;
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

/// The caller resolved from a bearer token.
///
/// Every failure (missing header, bad scheme, bad signature, expired token,
/// unknown subject, store error) rejects with the same [`AppError::Unauthorized`].
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                AppError::Unauthorized
            })?;

        let token = bearer_token(header).ok_or_else(|| {
            warn!("invalid auth scheme");
            AppError::Unauthorized
        })?;

        let claims = TokenKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            AppError::Unauthorized
        })?;

        let user = match state.users.find_by_email(&claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(email = %claims.sub, "token subject does not resolve to a user");
                return Err(AppError::Unauthorized);
            }
            Err(e) => {
                warn!(error = %e, email = %claims.sub, "user lookup failed during auth");
                return Err(AppError::Unauthorized);
            }
        };

        debug!(user_id = %user.id, "request authenticated");
        Ok(CurrentUser(user))
    }
}

/// Extracts `<token>` from `Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
