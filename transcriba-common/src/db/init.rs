//! Database initialization
//!
//! Creates the database file on first run and idempotently creates every
//! table. Safe to call on each startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // Per-connection pragmas
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS app_users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        password_salt TEXT NOT NULL,
        email_verified INTEGER NOT NULL DEFAULT 0,
        verification_token TEXT,
        score INTEGER NOT NULL DEFAULT 0,
        busy INTEGER NOT NULL DEFAULT 0,
        completed_tutorial INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role_mappings (
        id TEXT PRIMARY KEY,
        principal_type TEXT NOT NULL CHECK (principal_type IN ('USER', 'ROLE')),
        principal_id TEXT NOT NULL,
        role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        UNIQUE (principal_type, principal_id, role_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS access_tokens (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES app_users(id) ON DELETE CASCADE,
        ttl INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sources (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        info_url TEXT,
        logo_url TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS collections (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        public INTEGER NOT NULL DEFAULT 1,
        locked INTEGER NOT NULL DEFAULT 0,
        source_id TEXT UNIQUE REFERENCES sources(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS discussions (
        id TEXT PRIMARY KEY,
        title TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transcriba_objects (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        source_id TEXT NOT NULL REFERENCES sources(id),
        main_author TEXT NOT NULL,
        external_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        released INTEGER NOT NULL DEFAULT 1,
        status TEXT NOT NULL DEFAULT 'free',
        occupied_at TEXT,
        stage INTEGER NOT NULL DEFAULT 0,
        public_tags TEXT NOT NULL DEFAULT '[]',
        generated_tags TEXT NOT NULL DEFAULT '[]',
        width INTEGER,
        height INTEGER,
        discussion_id TEXT REFERENCES discussions(id) ON DELETE SET NULL,
        UNIQUE (source_id, external_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS collection_objects (
        collection_id TEXT NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
        object_id TEXT NOT NULL REFERENCES transcriba_objects(id) ON DELETE CASCADE,
        PRIMARY KEY (collection_id, object_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS revisions (
        id TEXT PRIMARY KEY,
        object_id TEXT NOT NULL REFERENCES transcriba_objects(id) ON DELETE CASCADE,
        owner_id TEXT NOT NULL REFERENCES app_users(id),
        created_at TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        content TEXT NOT NULL,
        published INTEGER NOT NULL DEFAULT 0,
        approved INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_revisions_object ON revisions (object_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_revisions_owner ON revisions (owner_id, published)",
    r#"
    CREATE TABLE IF NOT EXISTS votings (
        id TEXT PRIMARY KEY,
        object_type TEXT NOT NULL,
        object_id TEXT NOT NULL,
        user_id TEXT NOT NULL REFERENCES app_users(id) ON DELETE CASCADE,
        vote TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (object_type, object_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        discussion_id TEXT NOT NULL REFERENCES discussions(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL REFERENCES app_users(id),
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS info_pages (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        title TEXT,
        content TEXT NOT NULL DEFAULT '',
        discussion_id TEXT REFERENCES discussions(id) ON DELETE SET NULL
    )
    "#,
];
