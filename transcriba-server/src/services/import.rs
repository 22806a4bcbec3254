//! Import of manuscripts from an external archive
//!
//! A source describes where metadata lives (`url` with an `{id}`
//! placeholder). The metadata record names the title, author and image of
//! the manuscript; the image is stored as the raw file the tiler works on.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};
use transcriba_common::config::TranscribaConfig;
use transcriba_common::db::{begin_write, collections, discussions, new_id, objects, revisions, sources, users};
use transcriba_common::models::{
    Collection, Discussion, ObjectStatus, Revision, Source, TranscribaObject,
};
use transcriba_common::{Entity, Error, Result, TeiElement};

use super::images;
use crate::remote::RemoteSource;

/// Title of the discussion every imported object gets
pub const OBJECT_DISCUSSION_TITLE: &str = "transcriba";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub external_id: Option<String>,
    pub source_id: Option<String>,
}

/// Fields read from a remote metadata record
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMetadata {
    pub title: String,
    pub main_author: String,
    pub image_url: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

impl ObjectMetadata {
    pub fn from_value(value: &Value) -> Result<Self> {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(Error::WrongFormat)
        };
        Ok(Self {
            title: text("title")?,
            main_author: text("mainAuthor")?,
            image_url: text("imageUrl")?,
            width: value.get("width").and_then(Value::as_i64),
            height: value.get("height").and_then(Value::as_i64),
        })
    }
}

/// Metadata URL of one record
pub fn metadata_url(source: &Source, external_id: &str) -> String {
    source.url.replace("{id}", external_id)
}

/// Import one record and return the id of the new object
pub async fn import_object(
    pool: &SqlitePool,
    config: &TranscribaConfig,
    remote: &dyn RemoteSource,
    imports: &Path,
    request: ImportRequest,
) -> Result<String> {
    let (Some(external_id), Some(source_id)) = (request.external_id, request.source_id) else {
        return Err(Error::WrongFormat);
    };

    if objects::is_imported(pool, &external_id, &source_id).await? {
        return Err(Error::Duplicate("transcriba object".to_string()));
    }
    let source = sources::find_by_id(pool, &source_id)
        .await?
        .ok_or(Error::NotFound(Entity::Source))?;
    let collection = collections::find_by_source(pool, &source.id)
        .await?
        .ok_or(Error::NotFound(Entity::Collection))?;
    let bot = users::find_by_username(pool, &config.bot.username)
        .await?
        .ok_or(Error::NotFound(Entity::User))?;

    let metadata = remote.fetch_json(&metadata_url(&source, &external_id)).await?;
    let metadata = ObjectMetadata::from_value(&metadata)?;
    let image = remote.fetch_bytes(&metadata.image_url).await?;

    let (width, height) = match (metadata.width, metadata.height) {
        (Some(w), Some(h)) => (Some(w), Some(h)),
        _ => match images::image_dimensions(&image) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        },
    };

    let object = TranscribaObject {
        id: new_id(),
        title: metadata.title.clone(),
        source_id: source.id.clone(),
        main_author: metadata.main_author.clone(),
        external_id: external_id.clone(),
        created_at: Utc::now(),
        released: true,
        status: ObjectStatus::Free,
        occupied_at: None,
        stage: 0,
        public_tags: Json(Vec::new()),
        generated_tags: Json(Vec::new()),
        width,
        height,
        discussion_id: None,
    };
    objects::insert(pool, &object).await?;

    if let Err(e) = finish_import(pool, imports, &object, &collection, &bot.id, &image).await {
        abort_import(pool, imports, &object.id).await;
        return Err(e);
    }

    info!(
        "Imported '{}' ({}) from {} as {}",
        object.title, external_id, source.title, object.id
    );
    Ok(object.id)
}

async fn finish_import(
    pool: &SqlitePool,
    imports: &Path,
    object: &TranscribaObject,
    collection: &Collection,
    bot_id: &str,
    image: &[u8],
) -> Result<()> {
    let dir = images::object_dir(imports, &object.id)?;
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(images::RAW_IMAGE), image).await?;

    let mut tx = begin_write(pool).await?;
    let discussion = Discussion {
        id: new_id(),
        title: Some(OBJECT_DISCUSSION_TITLE.to_string()),
    };
    discussions::insert(&mut *tx, &discussion).await?;
    objects::set_discussion(&mut *tx, &object.id, &discussion.id).await?;
    collections::add_object(&mut *tx, &collection.id, &object.id).await?;

    let first = Revision {
        id: new_id(),
        object_id: object.id.clone(),
        owner_id: bot_id.to_string(),
        created_at: Utc::now(),
        metadata: Json(Value::Object(Default::default())),
        content: Json(TeiElement::empty_root()),
        published: true,
        approved: true,
    };
    revisions::insert(&mut *tx, &first).await?;
    tx.commit().await?;
    Ok(())
}

/// Remove a half imported object
async fn abort_import(pool: &SqlitePool, imports: &Path, object_id: &str) {
    if let Err(e) = objects::delete(pool, object_id).await {
        warn!("Could not delete aborted import {}: {}", object_id, e);
    }
    let Ok(dir) = images::object_dir(imports, object_id) else {
        return;
    };
    if dir.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            warn!("Could not remove {}: {}", dir.display(), e);
        }
    }
}
