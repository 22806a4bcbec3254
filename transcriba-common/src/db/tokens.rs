//! Access token queries

use crate::models::AccessToken;
use crate::Result;
use sqlx::{Executor, Sqlite};

pub async fn insert<'e, E>(executor: E, token: &AccessToken) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO access_tokens (id, user_id, ttl, created_at) VALUES (?, ?, ?, ?)")
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(token.ttl)
        .bind(token.created_at)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn find<'e, E>(executor: E, id: &str) -> Result<Option<AccessToken>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let token = sqlx::query_as::<_, AccessToken>(
        "SELECT id, user_id, ttl, created_at FROM access_tokens WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(token)
}

pub async fn delete<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM access_tokens WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
