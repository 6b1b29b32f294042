use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::Post;

// Every read goes through this join so rows always carry the author.
const POST_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.title, p.content, p.date_posted,
           u.username AS author_username, u.image_file AS author_image_file
      FROM posts p
      JOIN users u ON u.id = p.user_id
"#;

pub async fn insert(db: &PgPool, user_id: Uuid, title: &str, content: &str) -> anyhow::Result<Post> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        WITH inserted AS (
            INSERT INTO posts (user_id, title, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, content, date_posted
        )
        SELECT i.id, i.user_id, i.title, i.content, i.date_posted,
               u.username AS author_username, u.image_file AS author_image_file
          FROM inserted i
          JOIN users u ON u.id = i.user_id
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(content)
    .fetch_one(db)
    .await?;
    Ok(post)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>(&format!("{POST_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(post)
}

pub async fn update(db: &PgPool, id: Uuid, title: &str, content: &str) -> anyhow::Result<Option<Post>> {
    let updated = sqlx::query("UPDATE posts SET title = $2, content = $3 WHERE id = $1")
        .bind(id)
        .bind(title)
        .bind(content)
        .execute(db)
        .await?;
    if updated.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(db, id).await
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn count(db: &PgPool, author: Option<Uuid>) -> anyhow::Result<u64> {
    let n: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM posts WHERE ($1::uuid IS NULL OR user_id = $1)",
    )
    .bind(author)
    .fetch_one(db)
    .await?;
    Ok(n.max(0) as u64)
}

/// Newest first; `id` breaks ties between equal timestamps.
pub async fn list_page(
    db: &PgPool,
    author: Option<Uuid>,
    limit: u64,
    offset: u64,
) -> anyhow::Result<Vec<Post>> {
    let rows = sqlx::query_as::<_, Post>(&format!(
        r#"{POST_SELECT}
         WHERE ($1::uuid IS NULL OR p.user_id = $1)
         ORDER BY p.date_posted DESC, p.id DESC
         LIMIT $2 OFFSET $3
        "#
    ))
    .bind(author)
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
