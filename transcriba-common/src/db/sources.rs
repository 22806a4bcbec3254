//! Source queries

use crate::models::Source;
use crate::Result;
use sqlx::{Executor, Sqlite};

pub async fn insert<'e, E>(executor: E, source: &Source) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO sources (id, title, url, info_url, logo_url) VALUES (?, ?, ?, ?, ?)")
        .bind(&source.id)
        .bind(&source.title)
        .bind(&source.url)
        .bind(&source.info_url)
        .bind(&source.logo_url)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Source>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let source = sqlx::query_as::<_, Source>(
        "SELECT id, title, url, info_url, logo_url FROM sources WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(source)
}

pub async fn list<'e, E>(executor: E) -> Result<Vec<Source>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sources = sqlx::query_as::<_, Source>(
        "SELECT id, title, url, info_url, logo_url FROM sources ORDER BY title",
    )
    .fetch_all(executor)
    .await?;
    Ok(sources)
}
