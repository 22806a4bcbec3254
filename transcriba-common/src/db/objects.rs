//! Transcriba object queries

use crate::models::{ObjectStatus, TranscribaObject};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Executor, Sqlite};

const COLUMNS: &str = "id, title, source_id, main_author, external_id, created_at, released, \
     status, occupied_at, stage, public_tags, generated_tags, width, height, discussion_id";

pub async fn insert<'e, E>(executor: E, object: &TranscribaObject) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(&format!(
        "INSERT INTO transcriba_objects ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        COLUMNS
    ))
    .bind(&object.id)
    .bind(&object.title)
    .bind(&object.source_id)
    .bind(&object.main_author)
    .bind(&object.external_id)
    .bind(object.created_at)
    .bind(object.released)
    .bind(object.status)
    .bind(object.occupied_at)
    .bind(object.stage)
    .bind(&object.public_tags)
    .bind(&object.generated_tags)
    .bind(object.width)
    .bind(object.height)
    .bind(&object.discussion_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<TranscribaObject>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let object = sqlx::query_as::<_, TranscribaObject>(&format!(
        "SELECT {} FROM transcriba_objects WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(object)
}

/// True when the external record was already imported from this source
pub async fn is_imported<'e, E>(executor: E, external_id: &str, source_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transcriba_objects WHERE external_id = ? AND source_id = ?",
    )
    .bind(external_id)
    .bind(source_id)
    .fetch_one(executor)
    .await?;
    Ok(count > 0)
}

pub async fn delete<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM transcriba_objects WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_status<'e, E>(executor: E, id: &str, status: ObjectStatus) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE transcriba_objects SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Move a free object to `occupied`; returns false if it was not free
pub async fn occupy_if_free<'e, E>(executor: E, id: &str, now: DateTime<Utc>) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE transcriba_objects SET status = 'occupied', occupied_at = ? \
         WHERE id = ? AND status = 'free'",
    )
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_discussion<'e, E>(executor: E, id: &str, discussion_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE transcriba_objects SET discussion_id = ? WHERE id = ?")
        .bind(discussion_id)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_stage<'e, E>(executor: E, id: &str, stage: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE transcriba_objects SET stage = ? WHERE id = ?")
        .bind(stage)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_public_tags<'e, E>(executor: E, id: &str, tags: &[String]) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE transcriba_objects SET public_tags = ? WHERE id = ?")
        .bind(Json(tags))
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{object, test_pool};

    #[tokio::test]
    async fn test_round_trip_keeps_status_and_tags() {
        let (pool, _dir) = test_pool().await;
        let created = object(&pool, "ms-1").await;
        set_public_tags(&pool, &created.id, &["letter".to_string()]).await.unwrap();

        let loaded = find_by_id(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ObjectStatus::Free);
        assert_eq!(loaded.public_tags.0, vec!["letter".to_string()]);
        assert!(is_imported(&pool, "ms-1", &created.source_id).await.unwrap());
        assert!(!is_imported(&pool, "ms-2", &created.source_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_occupy_only_once() {
        let (pool, _dir) = test_pool().await;
        let created = object(&pool, "ms-1").await;

        assert!(occupy_if_free(&pool, &created.id, Utc::now()).await.unwrap());
        assert!(!occupy_if_free(&pool, &created.id, Utc::now()).await.unwrap());

        let loaded = find_by_id(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ObjectStatus::Occupied);
        assert!(loaded.occupied_at.is_some());
    }
}
