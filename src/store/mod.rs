//! Persistence seam. Services only see `dyn Store`; production wires
//! [`PgStore`], tests wire the in-memory store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileChanges, User};
use crate::posts::{repo as post_repo, repo_types::Post};

#[cfg(test)]
pub mod memory;

#[async_trait]
pub trait Store: Send + Sync {
    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn create_user(&self, new: NewUser) -> anyhow::Result<User>;
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> anyhow::Result<User>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;

    async fn create_post(&self, author: Uuid, title: &str, content: &str) -> anyhow::Result<Post>;
    async fn post_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>>;
    /// `None` when the post no longer exists.
    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> anyhow::Result<Option<Post>>;
    async fn delete_post(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Posts count, optionally restricted to one author.
    async fn count_posts(&self, author: Option<Uuid>) -> anyhow::Result<u64>;
    /// One window of the feed ordered by `date_posted DESC, id DESC`.
    async fn list_posts(&self, author: Option<Uuid>, limit: u64, offset: u64) -> anyhow::Result<Vec<Post>>;
}

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        User::find_by_id(&self.db, id).await
    }

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        User::find_by_email(&self.db, email).await
    }

    async fn user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        User::find_by_username(&self.db, username).await
    }

    async fn create_user(&self, new: NewUser) -> anyhow::Result<User> {
        User::create(&self.db, &new).await
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> anyhow::Result<User> {
        User::update_profile(&self.db, id, &changes).await
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        User::update_password(&self.db, id, password_hash).await
    }

    async fn create_post(&self, author: Uuid, title: &str, content: &str) -> anyhow::Result<Post> {
        post_repo::insert(&self.db, author, title, content).await
    }

    async fn post_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        post_repo::find_by_id(&self.db, id).await
    }

    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> anyhow::Result<Option<Post>> {
        post_repo::update(&self.db, id, title, content).await
    }

    async fn delete_post(&self, id: Uuid) -> anyhow::Result<bool> {
        post_repo::delete(&self.db, id).await
    }

    async fn count_posts(&self, author: Option<Uuid>) -> anyhow::Result<u64> {
        post_repo::count(&self.db, author).await
    }

    async fn list_posts(&self, author: Option<Uuid>, limit: u64, offset: u64) -> anyhow::Result<Vec<Post>> {
        post_repo::list_page(&self.db, author, limit, offset).await
    }
}
