//! Database access layer
//!
//! Single-statement queries are generic over the sqlx executor so they run
//! on the pool as well as inside a transaction (`&mut *tx`). Helpers that
//! need several statements take a `&mut SqliteConnection`.

pub mod collections;
pub mod discussions;
pub mod info_pages;
pub mod init;
pub mod objects;
pub mod revisions;
pub mod roles;
pub mod sources;
pub mod tokens;
pub mod users;
pub mod votings;

pub use init::init_database;

use sqlx::{Sqlite, SqlitePool, Transaction};

/// Transaction that takes the write lock up front
///
/// A deferred transaction that reads first fails with `SQLITE_BUSY` when
/// another writer holds the lock at upgrade time; `busy_timeout` only applies
/// to the initial lock, so write paths must start with `BEGIN IMMEDIATE`.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Fresh record id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// SQLite unique constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_pool;
    use super::*;

    #[tokio::test]
    async fn test_begin_write_holds_the_lock() {
        let (pool, _dir) = test_pool().await;
        let mut tx = begin_write(&pool).await.unwrap();
        sqlx::query("SELECT COUNT(*) FROM app_users")
            .execute(&mut *tx)
            .await
            .unwrap();

        // a second writer waits for the first instead of failing mid-transaction
        let waiting = tokio::spawn({
            let pool = pool.clone();
            async move {
                let tx = begin_write(&pool).await?;
                tx.commit().await
            }
        });
        tx.commit().await.unwrap();
        waiting.await.unwrap().unwrap();
    }
}
