//! Collection queries and membership of objects

use crate::models::{Collection, TranscribaObject};
use crate::Result;
use sqlx::{Executor, Sqlite};

const COLUMNS: &str = "id, name, description, public, locked, source_id";

pub async fn insert<'e, E>(executor: E, collection: &Collection) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO collections (id, name, description, public, locked, source_id) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&collection.id)
    .bind(&collection.name)
    .bind(&collection.description)
    .bind(collection.public)
    .bind(collection.locked)
    .bind(&collection.source_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Collection>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let collection = sqlx::query_as::<_, Collection>(&format!(
        "SELECT {} FROM collections WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(collection)
}

/// Collection generated for a source
pub async fn find_by_source<'e, E>(executor: E, source_id: &str) -> Result<Option<Collection>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let collection = sqlx::query_as::<_, Collection>(&format!(
        "SELECT {} FROM collections WHERE source_id = ?",
        COLUMNS
    ))
    .bind(source_id)
    .fetch_optional(executor)
    .await?;
    Ok(collection)
}

pub async fn list<'e, E>(executor: E, public_only: bool) -> Result<Vec<Collection>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = if public_only {
        format!("SELECT {} FROM collections WHERE public = 1 ORDER BY name", COLUMNS)
    } else {
        format!("SELECT {} FROM collections ORDER BY name", COLUMNS)
    };
    let collections = sqlx::query_as::<_, Collection>(&sql)
        .fetch_all(executor)
        .await?;
    Ok(collections)
}

pub async fn add_object<'e, E>(executor: E, collection_id: &str, object_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT OR IGNORE INTO collection_objects (collection_id, object_id) VALUES (?, ?)")
        .bind(collection_id)
        .bind(object_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Number of objects and sum of their stages
pub async fn stage_totals<'e, E>(executor: E, collection_id: &str) -> Result<(i64, i64)>
where
    E: Executor<'e, Database = Sqlite>,
{
    let totals: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(o.id), COALESCE(SUM(o.stage), 0) FROM collection_objects co \
         JOIN transcriba_objects o ON o.id = co.object_id \
         WHERE co.collection_id = ?",
    )
    .bind(collection_id)
    .fetch_one(executor)
    .await?;
    Ok(totals)
}

pub async fn count_objects<'e, E>(executor: E, collection_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM collection_objects WHERE collection_id = ?")
        .bind(collection_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Objects of a collection, oldest import first
pub async fn objects<'e, E>(
    executor: E,
    collection_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<TranscribaObject>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let objects = sqlx::query_as::<_, TranscribaObject>(
        "SELECT o.* FROM transcriba_objects o \
         JOIN collection_objects co ON co.object_id = o.id \
         WHERE co.collection_id = ? \
         ORDER BY o.created_at, o.rowid LIMIT ? OFFSET ?",
    )
    .bind(collection_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await?;
    Ok(objects)
}
