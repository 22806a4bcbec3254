//! Discussion and comment queries

use crate::models::{Comment, Discussion};
use crate::Result;
use sqlx::{Executor, Sqlite};

pub async fn insert<'e, E>(executor: E, discussion: &Discussion) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO discussions (id, title) VALUES (?, ?)")
        .bind(&discussion.id)
        .bind(&discussion.title)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Discussion>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let discussion =
        sqlx::query_as::<_, Discussion>("SELECT id, title FROM discussions WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
    Ok(discussion)
}

pub async fn insert_comment<'e, E>(executor: E, comment: &Comment) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO comments (id, discussion_id, user_id, content, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&comment.id)
    .bind(&comment.discussion_id)
    .bind(&comment.user_id)
    .bind(&comment.content)
    .bind(comment.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn count_comments<'e, E>(executor: E, discussion_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE discussion_id = ?")
        .bind(discussion_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Comments oldest first
pub async fn comments<'e, E>(
    executor: E,
    discussion_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Comment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let comments = sqlx::query_as::<_, Comment>(
        "SELECT id, discussion_id, user_id, content, created_at FROM comments \
         WHERE discussion_id = ? ORDER BY created_at, rowid LIMIT ? OFFSET ?",
    )
    .bind(discussion_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await?;
    Ok(comments)
}
