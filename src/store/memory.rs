use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::Store;
use crate::auth::repo_types::{NewUser, ProfileChanges, User, DEFAULT_IMAGE_FILE};
use crate::posts::repo_types::Post;

#[derive(Clone)]
struct PostRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    date_posted: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<PostRow>,
}

/// Store backed by two vectors behind a mutex.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a post with an explicit timestamp.
    pub fn insert_post_at(&self, author: Uuid, title: &str, date_posted: OffsetDateTime) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().posts.push(PostRow {
            id,
            user_id: author,
            title: title.into(),
            content: format!("content of {title}"),
            date_posted,
        });
        id
    }

    fn joined(tables: &Tables, row: &PostRow) -> anyhow::Result<Post> {
        let author = tables
            .users
            .iter()
            .find(|u| u.id == row.user_id)
            .ok_or_else(|| anyhow::anyhow!("post {} has no author", row.id))?;
        Ok(Post {
            id: row.id,
            user_id: row.user_id,
            title: row.title.clone(),
            content: row.content.clone(),
            date_posted: row.date_posted,
            author_username: author.username.clone(),
            author_image_file: author.image_file.clone(),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, new: NewUser) -> anyhow::Result<User> {
        let mut t = self.tables.lock().unwrap();
        anyhow::ensure!(
            !t.users
                .iter()
                .any(|u| u.username == new.username || u.email == new.email),
            "unique constraint violated"
        );
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            image_file: DEFAULT_IMAGE_FILE.into(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> anyhow::Result<User> {
        let mut t = self.tables.lock().unwrap();
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| anyhow::anyhow!("user {id} not found"))?;
        user.username = changes.username;
        user.email = changes.email;
        if let Some(file) = changes.image_file {
            user.image_file = file;
        }
        Ok(user.clone())
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| anyhow::anyhow!("user {id} not found"))?;
        user.password_hash = password_hash.into();
        Ok(())
    }

    async fn create_post(&self, author: Uuid, title: &str, content: &str) -> anyhow::Result<Post> {
        let mut t = self.tables.lock().unwrap();
        let row = PostRow {
            id: Uuid::new_v4(),
            user_id: author,
            title: title.into(),
            content: content.into(),
            date_posted: OffsetDateTime::now_utc(),
        };
        t.posts.push(row.clone());
        Self::joined(&t, &row)
    }

    async fn post_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        let t = self.tables.lock().unwrap();
        t.posts
            .iter()
            .find(|p| p.id == id)
            .map(|row| Self::joined(&t, row))
            .transpose()
    }

    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> anyhow::Result<Option<Post>> {
        let mut t = self.tables.lock().unwrap();
        let Some(row) = t.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        row.title = title.into();
        row.content = content.into();
        let row = row.clone();
        Self::joined(&t, &row).map(Some)
    }

    async fn delete_post(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.posts.len();
        t.posts.retain(|p| p.id != id);
        Ok(t.posts.len() < before)
    }

    async fn count_posts(&self, author: Option<Uuid>) -> anyhow::Result<u64> {
        let t = self.tables.lock().unwrap();
        Ok(t.posts
            .iter()
            .filter(|p| author.map_or(true, |a| p.user_id == a))
            .count() as u64)
    }

    async fn list_posts(&self, author: Option<Uuid>, limit: u64, offset: u64) -> anyhow::Result<Vec<Post>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<&PostRow> = t
            .posts
            .iter()
            .filter(|p| author.map_or(true, |a| p.user_id == a))
            .collect();
        rows.sort_by(|a, b| (b.date_posted, b.id).cmp(&(a.date_posted, a.id)));
        rows.into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|row| Self::joined(&t, row))
            .collect()
    }
}
