use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        repo_types::{ProfileChanges, User},
        services::{check_email, check_identity_available, check_username},
    },
    error::{AppError, AppResult},
    images::services::{discard_picture, picture_kind, save_picture, PictureUpload, ALLOWED_EXTENSIONS},
    state::AppState,
    validation::{normalize_email, FieldErrors},
};

pub struct AccountUpdate {
    pub username: String,
    pub email: String,
    pub picture: Option<PictureUpload>,
}

pub async fn current_user(st: &AppState, user_id: Uuid) -> AppResult<User> {
    st.store
        .user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))
}

/// Validates everything first, then stores the picture, then the profile.
pub async fn update_account(st: &AppState, user_id: Uuid, upd: AccountUpdate) -> AppResult<User> {
    let current = current_user(st, user_id).await?;
    let username = upd.username.trim().to_string();
    let email = normalize_email(&upd.email);

    let mut errors = FieldErrors::default();
    check_username(&mut errors, &username);
    check_email(&mut errors, &email);
    if let Some(picture) = &upd.picture {
        if picture_kind(&picture.file_name).is_none() {
            errors.add(
                "picture",
                format!("File does not have an approved extension: {}", ALLOWED_EXTENSIONS.join(", ")),
            );
        }
    }
    check_identity_available(st.store.as_ref(), &mut errors, &username, &email, Some(&current)).await?;
    if let Err(errors) = errors.into_result() {
        warn!(%user_id, "account update rejected");
        return Err(errors.into());
    }

    let image_file = match upd.picture {
        Some(picture) => Some(save_picture(st, picture).await?),
        None => None,
    };
    let replaced_picture = image_file.is_some();

    let updated = st
        .store
        .update_profile(
            user_id,
            ProfileChanges {
                username,
                email,
                image_file,
            },
        )
        .await?;

    if replaced_picture {
        discard_picture(st, &current.image_file).await;
    }
    info!(%user_id, "account updated");
    Ok(updated)
}
