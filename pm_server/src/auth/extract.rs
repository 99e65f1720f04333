//! Request identity resolved from the bearer token.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::{TrackerError, TrackerResult};
use crate::models::user::{Role, User};
use crate::routes::AppState;

/// The authenticated caller. Extraction fails with 401 when the token is
/// missing, expired or invalid, or its user no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn require_admin(&self, action: &str) -> TrackerResult<()> {
        if self.0.role == Role::Admin {
            Ok(())
        } else {
            Err(TrackerError::Forbidden(format!("Only admins can use {action}")))
        }
    }
}

fn bearer_token(parts: &Parts) -> TrackerResult<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| TrackerError::Unauthorized("Not authenticated".into()))?;
    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| TrackerError::Unauthorized("Invalid authorization header".into()))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = TrackerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.verify(token)?;
        let user = state
            .db
            .users
            .find_one(&claims.sub)
            .await?
            .ok_or_else(|| TrackerError::Unauthorized("User not found".into()))?;
        Ok(CurrentUser(user))
    }
}
