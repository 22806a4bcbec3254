//! User account queries

use crate::models::AppUser;
use crate::Result;
use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite};

const COLUMNS: &str = "id, username, email, password_hash, password_salt, email_verified, \
     verification_token, score, busy, completed_tutorial, created_at";

/// Row of the score ranking
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i64,
}

pub async fn insert<'e, E>(executor: E, user: &AppUser) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO app_users (id, username, email, password_hash, password_salt,
            email_verified, verification_token, score, busy, completed_tutorial, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.password_salt)
    .bind(user.email_verified)
    .bind(&user.verification_token)
    .bind(user.score)
    .bind(user.busy)
    .bind(user.completed_tutorial)
    .bind(user.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<AppUser>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, AppUser>(&format!(
        "SELECT {} FROM app_users WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(user)
}

pub async fn find_by_username<'e, E>(executor: E, username: &str) -> Result<Option<AppUser>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, AppUser>(&format!(
        "SELECT {} FROM app_users WHERE username = ?",
        COLUMNS
    ))
    .bind(username)
    .fetch_optional(executor)
    .await?;
    Ok(user)
}

pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<AppUser>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, AppUser>(&format!(
        "SELECT {} FROM app_users WHERE email = ?",
        COLUMNS
    ))
    .bind(email)
    .fetch_optional(executor)
    .await?;
    Ok(user)
}

/// Mark the email address as confirmed and drop the verification token
pub async fn mark_verified<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE app_users SET email_verified = 1, verification_token = NULL WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Add (or with a negative delta, subtract) score points
pub async fn add_score<'e, E>(executor: E, id: &str, delta: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE app_users SET score = score + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Flip the busy flag; returns false when the user already had `busy`
pub async fn set_busy<'e, E>(executor: E, id: &str, busy: bool) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE app_users SET busy = ? WHERE id = ? AND busy = ?")
        .bind(busy)
        .bind(id)
        .bind(!busy)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Grant the tutorial reward once; returns whether it was granted now
pub async fn complete_tutorial<'e, E>(executor: E, id: &str, reward: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE app_users SET score = score + ?, completed_tutorial = 1 \
         WHERE id = ? AND completed_tutorial = 0",
    )
    .bind(reward)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn leaderboard<'e, E>(executor: E, limit: i64) -> Result<Vec<LeaderboardEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let entries = sqlx::query_as::<_, LeaderboardEntry>(
        "SELECT username, score FROM app_users ORDER BY score DESC, username ASC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(executor)
    .await?;
    Ok(entries)
}

/// Number of users whose score reaches `minimum_score`
pub async fn count_with_min_score<'e, E>(executor: E, minimum_score: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM app_users WHERE score >= ?")
        .bind(minimum_score)
        .fetch_one(executor)
        .await?;
    Ok(count)
}
