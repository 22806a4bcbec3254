//! Role based access control
//!
//! Roles are configured from lowest to highest privilege. With a
//! hierarchical setup a user holding a role also holds every lower role,
//! which is stored explicitly as one `USER` mapping per role. The chain
//! itself is recorded as `ROLE` mappings where each higher role is the
//! principal of the role directly below it.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};
use transcriba_common::config::{RbacConfig, TranscribaConfig, ADMIN_ROLE};
use transcriba_common::credentials::{generate_salt, hash_password};
use transcriba_common::db::{begin_write, new_id, roles, users};
use transcriba_common::models::{AppUser, PrincipalType, Role};
use transcriba_common::{Entity, Error, Result};

/// Configured roles with `administrator` guaranteed to be the highest
pub fn effective_roles(rbac: &RbacConfig) -> Result<Vec<String>> {
    let mut names = rbac.roles.clone();
    match names.iter().position(|name| name == ADMIN_ROLE) {
        None => names.push(ADMIN_ROLE.to_string()),
        Some(pos) if pos + 1 != names.len() => return Err(Error::WrongRoleOrder),
        Some(_) => {}
    }
    Ok(names)
}

/// Find or create every role in order and link neighbours when hierarchical
///
/// Returns the last (highest) role.
pub async fn create_roles(
    conn: &mut SqliteConnection,
    names: &[String],
    hierarchical: bool,
) -> Result<Role> {
    let mut previous: Option<Role> = None;
    for name in names {
        let role = roles::find_or_create(&mut *conn, name).await?;
        if hierarchical {
            if let Some(lower) = &previous {
                roles::insert_mapping(&mut *conn, PrincipalType::Role, &role.id, &lower.id).await?;
            }
        }
        previous = Some(role);
    }
    previous.ok_or_else(|| Error::WrongInput("role names".to_string()))
}

/// Grant a role; granting it twice is a no-op
pub async fn add_role(conn: &mut SqliteConnection, user_id: &str, role_name: &str) -> Result<()> {
    let role = roles::find_by_name(&mut *conn, role_name)
        .await?
        .ok_or(Error::NotFound(Entity::Role))?;
    roles::insert_mapping(&mut *conn, PrincipalType::User, user_id, &role.id).await?;
    Ok(())
}

/// Revoke a role; revoking a role the user does not hold is a no-op
pub async fn remove_role(
    conn: &mut SqliteConnection,
    user_id: &str,
    role_name: &str,
) -> Result<()> {
    let role = roles::find_by_name(&mut *conn, role_name)
        .await?
        .ok_or(Error::NotFound(Entity::Role))?;
    if let Some(mapping) =
        roles::find_mapping(&mut *conn, PrincipalType::User, user_id, &role.id).await?
    {
        roles::delete_mapping(&mut *conn, &mapping.id).await?;
    }
    Ok(())
}

/// Make `role_name` the highest role of a user
///
/// Hierarchical setups grant every role up to and including `role_name`
/// and revoke all higher ones. Flat setups only grant `role_name`.
pub async fn set_role(
    conn: &mut SqliteConnection,
    rbac: &RbacConfig,
    user_id: &str,
    role_name: &str,
) -> Result<()> {
    let names = effective_roles(rbac)?;
    let pos = names
        .iter()
        .position(|name| name == role_name)
        .ok_or(Error::NotFound(Entity::Role))?;

    if !rbac.hierarchical {
        return add_role(conn, user_id, role_name).await;
    }

    for name in &names[..=pos] {
        add_role(&mut *conn, user_id, name).await?;
    }
    for name in &names[pos + 1..] {
        remove_role(&mut *conn, user_id, name).await?;
    }
    Ok(())
}

/// Set a role inside its own transaction
pub async fn set_role_atomic(
    pool: &SqlitePool,
    rbac: &RbacConfig,
    user_id: &str,
    role_name: &str,
) -> Result<()> {
    users::find_by_id(pool, user_id)
        .await?
        .ok_or(Error::NotFound(Entity::User))?;
    let mut tx = begin_write(pool).await?;
    set_role(&mut tx, rbac, user_id, role_name).await?;
    tx.commit().await?;
    info!("User {} now has role {}", user_id, role_name);
    Ok(())
}

pub async fn has_role(pool: &SqlitePool, user_id: &str, role_name: &str) -> Result<bool> {
    roles::user_has_role(pool, user_id, role_name).await
}

/// Roles assigned to an existing user
pub async fn load_roles(pool: &SqlitePool, user_id: &str) -> Result<Vec<Role>> {
    users::find_by_id(pool, user_id)
        .await?
        .ok_or(Error::NotFound(Entity::User))?;
    roles::roles_of_user(pool, user_id).await
}

/// Create the configured roles and, on first start, the admin and bot accounts
pub async fn bootstrap(pool: &SqlitePool, config: &TranscribaConfig) -> Result<()> {
    let names = effective_roles(&config.rbac)?;
    let mut tx = begin_write(pool).await?;

    let highest = create_roles(&mut tx, &names, config.rbac.hierarchical).await?;
    info!("Roles ready, highest role: {}", highest.name);

    let admin = users::find_by_username(&mut *tx, &config.admin.username).await?;
    let bot = users::find_by_username(&mut *tx, &config.bot.username).await?;

    match (admin, bot) {
        (None, None) => {
            let admin = system_account(&config.admin.username, &config.admin.email, &config.admin.password);
            let bot = system_account(&config.bot.username, &config.bot.email, &config.bot.password);
            users::insert(&mut *tx, &admin).await?;
            users::insert(&mut *tx, &bot).await?;
            set_role(&mut tx, &config.rbac, &admin.id, ADMIN_ROLE).await?;
            set_role(&mut tx, &config.rbac, &bot.id, &config.rbac.default_role).await?;
            info!("Created system accounts '{}' and '{}'", admin.username, bot.username);
        }
        (Some(_), Some(_)) => {}
        _ => warn!("Only one of the admin and bot accounts exists; not creating the other"),
    }

    tx.commit().await?;
    Ok(())
}

fn system_account(username: &str, email: &str, password: &str) -> AppUser {
    let salt = generate_salt();
    AppUser {
        id: new_id(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: hash_password(password, &salt),
        password_salt: salt,
        email_verified: true,
        verification_token: None,
        score: 0,
        busy: false,
        completed_tutorial: false,
        created_at: chrono::Utc::now(),
    }
}
