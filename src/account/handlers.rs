use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::AccountResponse,
    services::{self, AccountUpdate},
};
use crate::{
    auth::{extractors::AuthUser, repo_types::User},
    error::{AppError, AppResult},
    images::services::{picture_url, PictureUpload},
    state::AppState,
};

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/account", get(get_account).put(update_account))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

async fn to_response(state: &AppState, user: User) -> AppResult<AccountResponse> {
    let image_url = picture_url(state, &user.image_file).await?;
    Ok(AccountResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        image_file: user.image_file,
        image_url,
    })
}

#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<AccountResponse>> {
    let user = services::current_user(&state, user_id).await?;
    Ok(Json(to_response(&state, user).await?))
}

/// PUT /account (multipart)
/// Fields: username, email, picture (optional file)
#[instrument(skip(state, mp))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<AccountResponse>> {
    let mut upd = AccountUpdate {
        username: String::new(),
        email: String::new(),
        picture: None,
    };

    while let Some(field) = mp.next_field().await.map_err(|e| {
        warn!(error = %e, "unreadable multipart body");
        AppError::from(e)
    })? {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("username") => upd.username = field.text().await?,
            Some("email") => upd.email = field.text().await?,
            Some("picture") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let body = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if !body.is_empty() {
                    upd.picture = Some(PictureUpload { file_name, body });
                }
            }
            _ => {}
        }
    }

    let user = services::update_account(&state, user_id, upd).await?;
    Ok(Json(to_response(&state, user).await?))
}
