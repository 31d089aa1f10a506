use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;
use crate::users::repo::{self, Role, User};

use super::jwt::JwtKeys;

/// Authenticated request context: the bearer token resolved to a live user
/// row. A token whose subject no longer exists is rejected even when the
/// signature and expiry still validate.
pub struct CurrentUser(pub User);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            AppError::unauthorized("You are not logged in. Please log in to get access.")
        })?;

        // Bad signature, expired and malformed all collapse to one outcome.
        let claims = JwtKeys::from_ref(state).verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::unauthorized("Invalid token. Please log in again.")
        })?;

        let user = repo::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = claims.sub, "token subject no longer exists");
                AppError::unauthorized("The user belonging to this token no longer exists.")
            })?;

        Ok(CurrentUser(user))
    }
}

/// Allow only users whose role is in `roles`. Runs after authentication; a
/// failed check is terminal for the request.
pub fn restrict_to(user: &User, roles: &[Role]) -> Result<(), AppError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "You do not have permission to perform this action.",
        ))
    }
}

/// Officials only.
pub struct RequireOfficial(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireOfficial {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        restrict_to(&user, &[Role::Official])?;
        Ok(Self(user))
    }
}

/// Analysts only.
pub struct RequireAnalyst(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireAnalyst {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        restrict_to(&user, &[Role::Analyst])?;
        Ok(Self(user))
    }
}

/// Officials and analysts.
pub struct RequireStaff(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        restrict_to(&user, &[Role::Official, Role::Analyst])?;
        Ok(Self(user))
    }
}
