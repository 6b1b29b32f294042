use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::PostForm,
    pagination::{FeedItem, Page, PageMeta},
    repo_types::Post,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    validation::FieldErrors,
};

pub const TITLE_MAX_CHARS: usize = 100;

impl FeedItem for Post {
    fn posted_at(&self) -> time::OffsetDateTime {
        self.date_posted
    }
    fn feed_id(&self) -> Uuid {
        self.id
    }
}

pub fn validate_post(form: &PostForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    if errors.required("title", &form.title) {
        errors.length("title", form.title.trim(), 1, TITLE_MAX_CHARS);
    }
    errors.required("content", &form.content);
    errors.into_result()
}

/// Fails with `Forbidden` unless `user_id` wrote `post`.
pub fn ensure_owner(post: &Post, user_id: Uuid) -> AppResult<()> {
    if post.is_owned_by(user_id) {
        Ok(())
    } else {
        warn!(post_id = %post.id, owner = %post.user_id, %user_id, "non-owner touched post");
        Err(AppError::Forbidden)
    }
}

pub async fn create_post(st: &AppState, user_id: Uuid, form: PostForm) -> AppResult<Post> {
    validate_post(&form)?;
    let post = st
        .store
        .create_post(user_id, form.title.trim(), &form.content)
        .await?;
    info!(post_id = %post.id, %user_id, "post created");
    Ok(post)
}

pub async fn get_post(st: &AppState, post_id: Uuid) -> AppResult<Post> {
    st.store
        .post_by_id(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))
}

/// Ownership is checked before the payload, so a stranger always gets
/// `Forbidden` whatever they sent.
pub async fn update_post(
    st: &AppState,
    user_id: Uuid,
    post_id: Uuid,
    form: PostForm,
) -> AppResult<Post> {
    let post = get_post(st, post_id).await?;
    ensure_owner(&post, user_id)?;
    validate_post(&form)?;
    let updated = st
        .store
        .update_post(post_id, form.title.trim(), &form.content)
        .await?
        .ok_or(AppError::NotFound("post"))?;
    info!(%post_id, %user_id, "post updated");
    Ok(updated)
}

pub async fn delete_post(st: &AppState, user_id: Uuid, post_id: Uuid) -> AppResult<()> {
    let post = get_post(st, post_id).await?;
    ensure_owner(&post, user_id)?;
    if !st.store.delete_post(post_id).await? {
        return Err(AppError::NotFound("post"));
    }
    info!(%post_id, %user_id, "post deleted");
    Ok(())
}

/// One page of the feed, all authors or a single one.
pub async fn feed_page(st: &AppState, author: Option<Uuid>, page: u32) -> AppResult<Page<Post>> {
    let total = st.store.count_posts(author).await?;
    let meta = PageMeta::locate(total, page, st.config.posts_per_page)?;
    let items = st
        .store
        .list_posts(author, meta.limit(), meta.offset())
        .await?;
    Ok(Page::new(items, meta))
}
