use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::extractors::CurrentUser;
use crate::auth::jwt::JwtKeys;
use crate::error::AppError;
use crate::state::AppState;

use super::dto::{
    AccessToken, AuthResponse, AuthTokens, LoginRequest, RegisterForm, UpdateProfileRequest,
};
use super::repo::User;
use super::services;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // three document uploads
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).patch(update_me))
}

#[instrument(skip(state, multipart))]
pub async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let form = RegisterForm::from_multipart(&mut multipart).await?;
    let role = form.validate()?;
    let user = services::register_user(&state, form, role).await?;
    let response = issue_tokens(&state, user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = services::login_user(&state, &payload.identifier, &payload.password).await?;
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[instrument(skip_all, fields(user_id = user.user_id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let user = services::update_profile(&state, user.user_id, body).await?;
    Ok(Json(user))
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let (token, expires_at) = keys.sign_access(user.user_id)?;
    Ok(AuthResponse {
        user,
        tokens: AuthTokens {
            access: AccessToken { token, expires_at },
        },
    })
}
