use time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, NewPasswordRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_against_dummy, verify_password},
    repo_types::{NewUser, User},
    reset::{issue_reset_token, verify_reset_token},
};
use crate::{
    error::{AppError, AppResult},
    mail::reset_email,
    state::AppState,
    store::Store,
    validation::{normalize_email, FieldErrors},
};

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 20;
/// Width of the `users.email` column.
pub const EMAIL_MAX: usize = 120;

pub(crate) fn check_username(errors: &mut FieldErrors, username: &str) {
    if errors.required("username", username) {
        errors.length("username", username, USERNAME_MIN, USERNAME_MAX);
    }
}

pub(crate) fn check_email(errors: &mut FieldErrors, email: &str) {
    if errors.required("email", email) {
        errors.length("email", email, 1, EMAIL_MAX);
        errors.email("email", email);
    }
}

fn check_new_password(errors: &mut FieldErrors, password: &str, confirm: &str) {
    errors.required("password", password);
    if errors.required("confirm_password", confirm) {
        errors.equal_to("confirm_password", confirm, "password", password);
    }
}

/// Adds "already taken" errors for a username or email held by someone
/// other than `current`. Fields that already failed are skipped.
pub(crate) async fn check_identity_available(
    store: &dyn Store,
    errors: &mut FieldErrors,
    username: &str,
    email: &str,
    current: Option<&User>,
) -> anyhow::Result<()> {
    let unchanged_username = current.is_some_and(|u| u.username == username);
    if !errors.has("username") && !unchanged_username && store.user_by_username(username).await?.is_some() {
        errors.add("username", "That username is already taken, please choose another one.");
    }
    let unchanged_email = current.is_some_and(|u| u.email == email);
    if !errors.has("email") && !unchanged_email && store.user_by_email(email).await?.is_some() {
        errors.add("email", "That email is already taken, please choose another one.");
    }
    Ok(())
}

pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<User> {
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);

    let mut errors = FieldErrors::default();
    check_username(&mut errors, &username);
    check_email(&mut errors, &email);
    check_new_password(&mut errors, &req.password, &req.confirm_password);
    check_identity_available(st.store.as_ref(), &mut errors, &username, &email, None).await?;
    if let Err(errors) = errors.into_result() {
        warn!(%email, "registration rejected");
        return Err(errors.into());
    }

    let password_hash = hash_password(&req.password)?;
    let user = st
        .store
        .create_user(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Returns the user and a fresh access token. Unknown email and wrong
/// password produce the same error.
pub async fn login(st: &AppState, req: LoginRequest) -> AppResult<(User, String)> {
    let email = normalize_email(&req.email);
    let mut errors = FieldErrors::default();
    check_email(&mut errors, &email);
    errors.required("password", &req.password);
    errors.into_result()?;

    let Some(user) = st.store.user_by_email(&email).await? else {
        verify_against_dummy(&req.password);
        warn!(%email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = JwtKeys::from(&st.config.jwt).sign_access(user.id, req.remember)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, token))
}

fn reset_ttl(st: &AppState) -> Duration {
    Duration::seconds(st.config.reset.ttl_seconds)
}

/// Mails a reset link to the owner of `email`.
pub async fn request_password_reset(st: &AppState, email: &str) -> AppResult<()> {
    let email = normalize_email(email);
    let mut errors = FieldErrors::default();
    check_email(&mut errors, &email);
    errors.into_result()?;

    let Some(user) = st.store.user_by_email(&email).await? else {
        let mut errors = FieldErrors::default();
        errors.add("email", "There is no account with that email. You must register first.");
        return Err(errors.into());
    };

    let token = issue_reset_token(user.id, st.config.reset.secret.as_bytes(), reset_ttl(st))?;
    let url = format!(
        "{}/reset-password/{}",
        st.config.mail.public_base_url.trim_end_matches('/'),
        token
    );
    let msg = reset_email(&st.config.mail.sender, &user.email, &url);
    st.mailer.send(msg).await.map_err(|e| {
        error!(error = %e, user_id = %user.id, "reset mail not sent");
        AppError::Internal(e)
    })?;

    info!(user_id = %user.id, "password reset mail sent");
    Ok(())
}

/// Resolves a reset token to the user it was issued for.
pub async fn check_reset_token(st: &AppState, token: &str) -> AppResult<User> {
    let user_id: Uuid = verify_reset_token(token, st.config.reset.secret.as_bytes(), reset_ttl(st))
        .map_err(|e| {
            warn!(error = %e, "reset token rejected");
            AppError::from(e)
        })?;
    // A token for a user that no longer exists is as good as forged.
    st.store
        .user_by_id(user_id)
        .await?
        .ok_or(AppError::TokenInvalid)
}

pub async fn reset_password(st: &AppState, token: &str, req: NewPasswordRequest) -> AppResult<()> {
    let user = check_reset_token(st, token).await?;

    let mut errors = FieldErrors::default();
    check_new_password(&mut errors, &req.password, &req.confirm_password);
    errors.into_result()?;

    let password_hash = hash_password(&req.password)?;
    st.store.set_password(user.id, &password_hash).await?;
    info!(user_id = %user.id, "password reset");
    Ok(())
}
