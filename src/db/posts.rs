use sqlx::SqlitePool;

use crate::{
    structs::{NewPost, Post},
    utils::now_timestamp,
};

pub async fn create_post(pool: &SqlitePool, new: NewPost) -> Result<Post, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(
        "INSERT INTO posts (user_id, user_name, title, content, location, image_link, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(new.user_id)
    .bind(new.user_name)
    .bind(new.title)
    .bind(new.content)
    .bind(new.location)
    .bind(new.image_link)
    .bind(now_timestamp())
    .fetch_one(pool)
    .await?;
    log::info!("Post {} created by {}", post.id, post.user_id);
    Ok(post)
}

/// Newest first.
pub async fn list_posts(pool: &SqlitePool) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>("SELECT * FROM posts ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await
}
