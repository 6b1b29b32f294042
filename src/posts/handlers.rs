use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{PostForm, PostResponse},
    pagination::{Page, PageQuery},
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(home_feed))
        .route("/posts/:id", get(get_post))
        .route("/users/:username/posts", get(user_posts))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", axum::routing::post(create_post))
        .route(
            "/posts/:id",
            axum::routing::put(update_post).delete(delete_post),
        )
}

#[instrument(skip(state))]
pub async fn home_feed(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<PageQuery>,
) -> AppResult<Json<Page<PostResponse>>> {
    let page = services::feed_page(&state, None, q.number()?).await?;
    Ok(Json(page.map(PostResponse::from)))
}

#[instrument(skip(state))]
pub async fn user_posts(
    State(state): State<AppState>,
    AppPath(username): AppPath<String>,
    AppQuery(q): AppQuery<PageQuery>,
) -> AppResult<Json<Page<PostResponse>>> {
    let user = state
        .store
        .user_by_username(&username)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let page = services::feed_page(&state, Some(user.id), q.number()?).await?;
    Ok(Json(page.map(PostResponse::from)))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<PostResponse>> {
    let post = services::get_post(&state, id).await?;
    Ok(Json(post.into()))
}

#[instrument(skip(state, form))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(form): AppJson<PostForm>,
) -> AppResult<(StatusCode, HeaderMap, Json<PostResponse>)> {
    let post = services::create_post(&state, user_id, form).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/posts/{}", post.id))
        .map_err(|e| AppError::Internal(e.into()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(post.into())))
}

#[instrument(skip(state, form))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(form): AppJson<PostForm>,
) -> AppResult<Json<PostResponse>> {
    let post = services::update_post(&state, user_id, id, form).await?;
    Ok(Json(post.into()))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_post(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
