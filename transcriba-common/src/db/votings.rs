//! Voting queries

use super::new_id;
use crate::models::{Voting, VotingModel};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection};

/// Store a vote, replacing an earlier vote of the same user on the same record
///
/// The original creation time is kept when a vote is changed.
pub async fn upsert(
    conn: &mut SqliteConnection,
    object_type: VotingModel,
    object_id: &str,
    user_id: &str,
    vote: &str,
    now: DateTime<Utc>,
) -> Result<Voting> {
    sqlx::query(
        "INSERT INTO votings (id, object_type, object_id, user_id, vote, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT (object_type, object_id, user_id) DO UPDATE SET vote = excluded.vote",
    )
    .bind(new_id())
    .bind(object_type)
    .bind(object_id)
    .bind(user_id)
    .bind(vote)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let voting = sqlx::query_as::<_, Voting>(
        "SELECT id, object_type, object_id, user_id, vote, created_at FROM votings \
         WHERE object_type = ? AND object_id = ? AND user_id = ?",
    )
    .bind(object_type)
    .bind(object_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(voting)
}

/// Number of votes with this value for a record
pub async fn count<'e, E>(
    executor: E,
    object_type: VotingModel,
    object_id: &str,
    vote: &str,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM votings WHERE object_type = ? AND object_id = ? AND vote = ?",
    )
    .bind(object_type)
    .bind(object_id)
    .bind(vote)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Votes a user cast on this record type since `since`
pub async fn count_since<'e, E>(
    executor: E,
    user_id: &str,
    object_type: VotingModel,
    since: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM votings WHERE user_id = ? AND object_type = ? AND created_at >= ?",
    )
    .bind(user_id)
    .bind(object_type)
    .bind(since)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Remove all votes on a record
pub async fn delete_for_object<'e, E>(
    executor: E,
    object_type: VotingModel,
    object_id: &str,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM votings WHERE object_type = ? AND object_id = ?")
        .bind(object_type)
        .bind(object_id)
        .execute(executor)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{test_pool, user};
    use chrono::Duration;

    #[tokio::test]
    async fn test_upsert_replaces_vote() {
        let (pool, _dir) = test_pool().await;
        let voter = user(&pool, "voter", 100).await;
        let mut conn = pool.acquire().await.unwrap();

        let first = upsert(&mut conn, VotingModel::Revision, "rev", &voter.id, "accept", Utc::now())
            .await
            .unwrap();
        let second = upsert(&mut conn, VotingModel::Revision, "rev", &voter.id, "refuse", Utc::now())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.vote, "refuse");
        assert_eq!(count(&mut *conn, VotingModel::Revision, "rev", "accept").await.unwrap(), 0);
        assert_eq!(count(&mut *conn, VotingModel::Revision, "rev", "refuse").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_since_window() {
        let (pool, _dir) = test_pool().await;
        let voter = user(&pool, "voter", 100).await;
        let mut conn = pool.acquire().await.unwrap();
        let old = Utc::now() - Duration::hours(30);

        upsert(&mut conn, VotingModel::Revision, "old", &voter.id, "accept", old).await.unwrap();
        upsert(&mut conn, VotingModel::Revision, "new", &voter.id, "accept", Utc::now()).await.unwrap();
        upsert(&mut conn, VotingModel::Comment, "c", &voter.id, "like", Utc::now()).await.unwrap();

        let since = Utc::now() - Duration::hours(24);
        let recent = count_since(&mut *conn, &voter.id, VotingModel::Revision, since).await.unwrap();
        assert_eq!(recent, 1);
    }
}
