//! Info page queries

use crate::models::InfoPage;
use crate::Result;
use sqlx::{Executor, Sqlite};

pub async fn insert<'e, E>(executor: E, page: &InfoPage) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO info_pages (id, name, title, content, discussion_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&page.id)
    .bind(&page.name)
    .bind(&page.title)
    .bind(&page.content)
    .bind(&page.discussion_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<InfoPage>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let page = sqlx::query_as::<_, InfoPage>(
        "SELECT id, name, title, content, discussion_id FROM info_pages WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(executor)
    .await?;
    Ok(page)
}

pub async fn list<'e, E>(executor: E) -> Result<Vec<InfoPage>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let pages = sqlx::query_as::<_, InfoPage>(
        "SELECT id, name, title, content, discussion_id FROM info_pages ORDER BY name",
    )
    .fetch_all(executor)
    .await?;
    Ok(pages)
}
