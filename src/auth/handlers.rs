use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, NewPasswordRequest, PublicUser, RegisterRequest, ResetRequest},
        services,
    },
    error::AppResult,
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/reset-password", post(request_reset))
        .route(
            "/auth/reset-password/:token",
            axum::routing::get(check_reset_token).post(reset_password),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let user = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (user, access_token) = services::login(&state, payload).await?;
    Ok(Json(AuthResponse {
        access_token,
        token_type: "Bearer",
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetRequest>,
) -> AppResult<StatusCode> {
    services::request_password_reset(&state, &payload.email).await?;
    Ok(StatusCode::ACCEPTED)
}

#[instrument(skip(state, token))]
pub async fn check_reset_token(
    State(state): State<AppState>,
    AppPath(token): AppPath<String>,
) -> AppResult<StatusCode> {
    services::check_reset_token(&state, &token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    AppPath(token): AppPath<String>,
    AppJson(payload): AppJson<NewPasswordRequest>,
) -> AppResult<StatusCode> {
    services::reset_password(&state, &token, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
