//! Revision queries
//!
//! Revisions of one object are ordered by creation time; `rowid` breaks
//! ties between revisions created within the same instant.

use crate::models::{ChronicItem, Revision};
use crate::{Result, TeiElement};
use sqlx::types::Json;
use sqlx::{Executor, Sqlite};

const COLUMNS: &str =
    "id, object_id, owner_id, created_at, metadata, content, published, approved";

pub async fn insert<'e, E>(executor: E, revision: &Revision) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(&format!(
        "INSERT INTO revisions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        COLUMNS
    ))
    .bind(&revision.id)
    .bind(&revision.object_id)
    .bind(&revision.owner_id)
    .bind(revision.created_at)
    .bind(&revision.metadata)
    .bind(&revision.content)
    .bind(revision.published)
    .bind(revision.approved)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Revision>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let revision = sqlx::query_as::<_, Revision>(&format!(
        "SELECT {} FROM revisions WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(revision)
}

/// Newest revision of an object
pub async fn latest<'e, E>(executor: E, object_id: &str) -> Result<Option<Revision>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let revision = sqlx::query_as::<_, Revision>(&format!(
        "SELECT {} FROM revisions WHERE object_id = ? \
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
        COLUMNS
    ))
    .bind(object_id)
    .fetch_optional(executor)
    .await?;
    Ok(revision)
}

/// Newest approved revision of an object
pub async fn stable<'e, E>(executor: E, object_id: &str) -> Result<Option<Revision>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let revision = sqlx::query_as::<_, Revision>(&format!(
        "SELECT {} FROM revisions WHERE object_id = ? AND approved = 1 \
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
        COLUMNS
    ))
    .bind(object_id)
    .fetch_optional(executor)
    .await?;
    Ok(revision)
}

/// Revision history with owner names, newest first
pub async fn chronic<'e, E>(executor: E, object_id: &str) -> Result<Vec<ChronicItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let items = sqlx::query_as::<_, ChronicItem>(
        "SELECT r.id, r.created_at, u.username, r.published, r.approved \
         FROM revisions r JOIN app_users u ON u.id = r.owner_id \
         WHERE r.object_id = ? \
         ORDER BY r.created_at DESC, r.rowid DESC",
    )
    .bind(object_id)
    .fetch_all(executor)
    .await?;
    Ok(items)
}

/// Revision a user is currently working on
pub async fn find_unpublished_by_owner<'e, E>(
    executor: E,
    owner_id: &str,
) -> Result<Option<Revision>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let revision = sqlx::query_as::<_, Revision>(&format!(
        "SELECT {} FROM revisions WHERE owner_id = ? AND published = 0 \
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
        COLUMNS
    ))
    .bind(owner_id)
    .fetch_optional(executor)
    .await?;
    Ok(revision)
}

pub async fn update_content<'e, E>(executor: E, id: &str, content: &TeiElement) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE revisions SET content = ? WHERE id = ?")
        .bind(Json(content))
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn mark_published<'e, E>(executor: E, id: &str, approved: bool) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE revisions SET published = 1, approved = ? WHERE id = ?")
        .bind(approved)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn approve<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE revisions SET approved = 1 WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM revisions WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
