use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Post;

#[derive(Debug, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub image_file: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_posted: OffsetDateTime,
    pub author: AuthorSummary,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            title: p.title,
            content: p.content,
            date_posted: p.date_posted,
            author: AuthorSummary {
                id: p.user_id,
                username: p.author_username,
                image_file: p.author_image_file,
            },
        }
    }
}
