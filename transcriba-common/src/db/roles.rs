//! Role and role mapping queries

use super::new_id;
use crate::models::{PrincipalType, Role, RoleMapping};
use crate::Result;
use sqlx::{Executor, Sqlite, SqliteConnection};

pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Role>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = ?")
        .bind(name)
        .fetch_optional(executor)
        .await?;
    Ok(role)
}

/// Return the role with this name, creating it first if needed
pub async fn find_or_create(conn: &mut SqliteConnection, name: &str) -> Result<Role> {
    sqlx::query("INSERT OR IGNORE INTO roles (id, name) VALUES (?, ?)")
        .bind(new_id())
        .bind(name)
        .execute(&mut *conn)
        .await?;
    let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(role)
}

pub async fn find_mapping<'e, E>(
    executor: E,
    principal_type: PrincipalType,
    principal_id: &str,
    role_id: &str,
) -> Result<Option<RoleMapping>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mapping = sqlx::query_as::<_, RoleMapping>(
        "SELECT id, principal_type, principal_id, role_id FROM role_mappings \
         WHERE principal_type = ? AND principal_id = ? AND role_id = ?",
    )
    .bind(principal_type)
    .bind(principal_id)
    .bind(role_id)
    .fetch_optional(executor)
    .await?;
    Ok(mapping)
}

/// Map a principal to a role; returns false when the mapping already existed
pub async fn insert_mapping<'e, E>(
    executor: E,
    principal_type: PrincipalType,
    principal_id: &str,
    role_id: &str,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT OR IGNORE INTO role_mappings (id, principal_type, principal_id, role_id) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(new_id())
    .bind(principal_type)
    .bind(principal_id)
    .bind(role_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_mapping<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM role_mappings WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Roles directly assigned to a user
pub async fn roles_of_user<'e, E>(executor: E, user_id: &str) -> Result<Vec<Role>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let roles = sqlx::query_as::<_, Role>(
        "SELECT r.id, r.name FROM roles r \
         JOIN role_mappings m ON m.role_id = r.id \
         WHERE m.principal_type = 'USER' AND m.principal_id = ? \
         ORDER BY r.name",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;
    Ok(roles)
}

pub async fn user_has_role<'e, E>(executor: E, user_id: &str, role_name: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM role_mappings m JOIN roles r ON m.role_id = r.id \
         WHERE m.principal_type = 'USER' AND m.principal_id = ? AND r.name = ?",
    )
    .bind(user_id)
    .bind(role_name)
    .fetch_one(executor)
    .await?;
    Ok(count > 0)
}
