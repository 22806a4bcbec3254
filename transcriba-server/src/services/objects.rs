//! Editing workflow of transcriba objects
//!
//! An object moves `free -> occupied -> (voting ->) free`. Occupying creates
//! an unpublished revision owned by the user and marks the user busy; a user
//! can work on one object at a time. Every transition runs in a single
//! transaction with conditional updates so concurrent requests cannot both
//! win.

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, warn};
use transcriba_common::config::TRUSTED_ROLE;
use transcriba_common::db::{begin_write, new_id, objects, revisions, roles, users};
use transcriba_common::models::{
    ChronicItem, ObjectStatus, Revision, TranscribaObject, HIGHEST_STAGE,
};
use transcriba_common::{Entity, Error, Result, TeiElement};

/// Points for a revision that got approved
pub const ACCEPTED_REWARD: i64 = 10;

pub async fn find(pool: &SqlitePool, id: &str) -> Result<TranscribaObject> {
    objects::find_by_id(pool, id)
        .await?
        .ok_or(Error::NotFound(Entity::TranscribaObject))
}

/// Revision history, newest first
pub async fn chronic(pool: &SqlitePool, object_id: &str) -> Result<Vec<ChronicItem>> {
    find(pool, object_id).await?;
    revisions::chronic(pool, object_id).await
}

pub async fn latest(pool: &SqlitePool, object_id: &str) -> Result<Revision> {
    revisions::latest(pool, object_id)
        .await?
        .ok_or(Error::NotFound(Entity::Revision))
}

pub async fn stable(pool: &SqlitePool, object_id: &str) -> Result<Revision> {
    revisions::stable(pool, object_id)
        .await?
        .ok_or(Error::NotFound(Entity::Revision))
}

/// Reserve a free object for a user and start a new revision
///
/// The new revision copies metadata and content of the stable revision
/// with every element marked untouched.
pub async fn occupy(pool: &SqlitePool, user_id: &str, object_id: &str) -> Result<Revision> {
    let mut tx = begin_write(pool).await?;

    let user = users::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or(Error::NotFound(Entity::User))?;
    if user.busy {
        return Err(Error::BusyUser);
    }
    let object = objects::find_by_id(&mut *tx, object_id)
        .await?
        .ok_or(Error::NotFound(Entity::TranscribaObject))?;
    if object.status != ObjectStatus::Free {
        return Err(Error::Occupied);
    }
    let stable = revisions::stable(&mut *tx, object_id)
        .await?
        .ok_or(Error::NotFound(Entity::Revision))?;

    let now = Utc::now();
    if !objects::occupy_if_free(&mut *tx, object_id, now).await? {
        return Err(Error::Occupied);
    }
    if !users::set_busy(&mut *tx, user_id, true).await? {
        return Err(Error::BusyUser);
    }

    let revision = Revision {
        id: new_id(),
        object_id: object_id.to_string(),
        owner_id: user_id.to_string(),
        created_at: now,
        metadata: stable.metadata.clone(),
        content: sqlx::types::Json(stable.content.0.clean_up(true)),
        published: false,
        approved: false,
    };
    revisions::insert(&mut *tx, &revision).await?;
    tx.commit().await?;

    info!("User {} occupied object {}", user.username, object.id);
    Ok(revision)
}

/// Object the user currently works on
pub async fn occupied(pool: &SqlitePool, user_id: &str) -> Result<TranscribaObject> {
    let revision = revisions::find_unpublished_by_owner(pool, user_id)
        .await?
        .ok_or(Error::NotFound(Entity::Revision))?;
    find(pool, &revision.object_id).await
}

/// Abort the user's work: free the object and drop the unfinished revision
///
/// Failures are logged and reported as `false`.
pub async fn free(pool: &SqlitePool, user_id: &str) -> bool {
    match try_free(pool, user_id).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Freeing the object of user {} failed: {}", user_id, e);
            false
        }
    }
}

async fn try_free(pool: &SqlitePool, user_id: &str) -> Result<()> {
    let mut tx = begin_write(pool).await?;
    users::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or(Error::NotFound(Entity::User))?;
    let revision = revisions::find_unpublished_by_owner(&mut *tx, user_id)
        .await?
        .ok_or(Error::NotFound(Entity::Revision))?;

    objects::set_status(&mut *tx, &revision.object_id, ObjectStatus::Free).await?;
    users::set_busy(&mut *tx, user_id, false).await?;
    revisions::delete(&mut *tx, &revision.id).await?;
    tx.commit().await?;

    info!("User {} freed object {}", user_id, revision.object_id);
    Ok(())
}

/// Check ownership and content, then store cleaned content on the newest revision
async fn store_content(
    conn: &mut sqlx::SqliteConnection,
    user_id: &str,
    object_id: &str,
    content: Value,
) -> Result<Revision> {
    let mut revision = revisions::latest(&mut *conn, object_id)
        .await?
        .ok_or(Error::NotFound(Entity::Revision))?;
    if revision.owner_id != user_id {
        return Err(Error::Occupied);
    }
    let content = TeiElement::from_value(content)?;
    if revision.published {
        return Err(Error::Replay);
    }

    let cleaned = content.clean_up(false);
    revisions::update_content(&mut *conn, &revision.id, &cleaned).await?;
    revision.content = sqlx::types::Json(cleaned);
    Ok(revision)
}

/// Save intermediate work on the user's revision
pub async fn save_content(
    pool: &SqlitePool,
    user_id: &str,
    object_id: &str,
    content: Value,
) -> Result<Revision> {
    let mut conn = pool.acquire().await?;
    store_content(&mut conn, user_id, object_id, content).await
}

/// Save and finish the user's revision
///
/// Trusted users get their revision approved right away together with the
/// reward; everyone else hands the object over to a community vote.
/// Failures are logged and reported as `false`.
pub async fn publish(pool: &SqlitePool, user_id: &str, object_id: &str, content: Value) -> bool {
    match try_publish(pool, user_id, object_id, content).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Publishing object {} for user {} failed: {}", object_id, user_id, e);
            false
        }
    }
}

async fn try_publish(
    pool: &SqlitePool,
    user_id: &str,
    object_id: &str,
    content: Value,
) -> Result<()> {
    let mut tx = begin_write(pool).await?;
    users::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or(Error::NotFound(Entity::User))?;
    let trusted = roles::user_has_role(&mut *tx, user_id, TRUSTED_ROLE).await?;

    let revision = store_content(&mut tx, user_id, object_id, content).await?;

    if trusted {
        revisions::mark_published(&mut *tx, &revision.id, true).await?;
        objects::set_status(&mut *tx, object_id, ObjectStatus::Free).await?;
        users::add_score(&mut *tx, user_id, ACCEPTED_REWARD).await?;
    } else {
        revisions::mark_published(&mut *tx, &revision.id, false).await?;
        objects::set_status(&mut *tx, object_id, ObjectStatus::Voting).await?;
    }
    users::set_busy(&mut *tx, user_id, false).await?;
    tx.commit().await?;

    info!(
        "User {} published revision {} ({})",
        user_id,
        revision.id,
        if trusted { "approved" } else { "voting" }
    );
    Ok(())
}

/// Merge generated tags into the public tags, keeping first occurrences
pub async fn publish_generated_tags(pool: &SqlitePool, object_id: &str) -> Result<Vec<String>> {
    let object = find(pool, object_id).await?;
    let mut tags: Vec<String> = Vec::new();
    for tag in object.public_tags.0.iter().chain(object.generated_tags.0.iter()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    objects::set_public_tags(pool, object_id, &tags).await?;
    Ok(tags)
}

pub async fn set_stage(pool: &SqlitePool, object_id: &str, stage: i64) -> Result<()> {
    if !(0..=HIGHEST_STAGE).contains(&stage) {
        return Err(Error::WrongInput(format!("stage must be in 0..={}", HIGHEST_STAGE)));
    }
    find(pool, object_id).await?;
    objects::set_stage(pool, object_id, stage).await
}
