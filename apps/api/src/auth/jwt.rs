use std::time::Duration;

use anyhow::bail;
use axum::extract::FromRef;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JwtConfig;
use crate::state::AppState;

/// Access token payload. `sub` is the user's email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys with the configured algorithm and lifetime.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    pub ttl: Duration,
}

impl TokenKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            ttl: Duration::from_secs((cfg.expire_minutes.max(0) as u64).saturating_mul(60)),
        }
    }

    pub fn issue(&self, email: &str) -> anyhow::Result<String> {
        self.issue_at(email, Utc::now().timestamp())
    }

    /// Signs a token as if issued at `issued_at` (unix seconds).
    pub(crate) fn issue_at(&self, email: &str, issued_at: i64) -> anyhow::Result<String> {
        let claims = Claims {
            sub: email.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(email = %email, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Checks signature and expiry with no leeway, and requires a subject.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if data.claims.sub.is_empty() {
            bail!("token has no subject");
        }
        Ok(data.claims)
    }
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        TokenKeys::from_config(&state.config.jwt)
    }
}
