//! Sources and collections
//!
//! Every source owns a locked, public collection that the import fills.
//! Other collections are curated by administrators.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::info;
use transcriba_common::db::{begin_write, collections, new_id, objects, sources};
use transcriba_common::models::{Collection, Source, SourceSummary, TranscribaObject, HIGHEST_STAGE};
use transcriba_common::{Entity, Error, Result};

use super::images;
use crate::pagination::{calculate_pagination, PAGE_SIZE};

/// Placeholder shown for collections without objects, below the asset directory
pub const EMPTY_THUMBNAIL: &str = "images/emptyThumbnail.png";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInput {
    pub title: Option<String>,
    pub url: Option<String>,
    pub info_url: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub public: Option<bool>,
}

/// Collection together with its transcription progress
#[derive(Debug, Clone, Serialize)]
pub struct CollectionProgress {
    #[serde(flatten)]
    pub collection: Collection,
    pub progress: f64,
}

/// One page of a collection's objects
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPage {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_objects: i64,
    pub objects: Vec<TranscribaObject>,
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::WrongInput(name.to_string())),
    }
}

/// Share of the maximum stage reached by all objects; empty counts as done
pub fn progress(object_count: i64, stage_sum: i64) -> f64 {
    if object_count == 0 {
        return 1.0;
    }
    stage_sum as f64 / (object_count * HIGHEST_STAGE) as f64
}

/// Create a source together with its import collection
pub async fn create_source(pool: &SqlitePool, input: SourceInput) -> Result<Source> {
    let source = Source {
        id: new_id(),
        title: required(input.title, "title")?,
        url: required(input.url, "url")?,
        info_url: input.info_url,
        logo_url: input.logo_url,
    };
    let collection = Collection {
        id: new_id(),
        name: source.title.clone(),
        description: format!(
            "Automatically generated collection of objects which were imported from {}",
            source.title
        ),
        public: true,
        locked: true,
        source_id: Some(source.id.clone()),
    };

    let mut tx = begin_write(pool).await?;
    sources::insert(&mut *tx, &source).await?;
    collections::insert(&mut *tx, &collection).await?;
    tx.commit().await?;

    info!("Created source '{}' ({})", source.title, source.id);
    Ok(source)
}

pub async fn list_sources(pool: &SqlitePool) -> Result<Vec<Source>> {
    sources::list(pool).await
}

pub async fn source_summary(pool: &SqlitePool, id: &str) -> Result<SourceSummary> {
    sources::find_by_id(pool, id)
        .await?
        .map(SourceSummary::from)
        .ok_or(Error::NotFound(Entity::Source))
}

pub async fn create_collection(pool: &SqlitePool, input: CollectionInput) -> Result<Collection> {
    let collection = Collection {
        id: new_id(),
        name: required(input.name, "name")?,
        description: input.description.unwrap_or_default(),
        public: input.public.unwrap_or(true),
        locked: false,
        source_id: None,
    };
    collections::insert(pool, &collection).await?;
    Ok(collection)
}

/// Collections with progress; private ones only when `include_private`
pub async fn list_collections(
    pool: &SqlitePool,
    include_private: bool,
) -> Result<Vec<CollectionProgress>> {
    let mut result = Vec::new();
    for collection in collections::list(pool, !include_private).await? {
        let (count, sum) = collections::stage_totals(pool, &collection.id).await?;
        result.push(CollectionProgress {
            collection,
            progress: progress(count, sum),
        });
    }
    Ok(result)
}

async fn find_collection(pool: &SqlitePool, id: &str) -> Result<Collection> {
    collections::find_by_id(pool, id)
        .await?
        .ok_or(Error::NotFound(Entity::Collection))
}

/// Manually add an object; import collections are locked
pub async fn add_object(pool: &SqlitePool, collection_id: &str, object_id: &str) -> Result<()> {
    let collection = find_collection(pool, collection_id).await?;
    if collection.locked {
        return Err(Error::Forbidden);
    }
    objects::find_by_id(pool, object_id)
        .await?
        .ok_or(Error::NotFound(Entity::TranscribaObject))?;
    collections::add_object(pool, collection_id, object_id).await
}

pub async fn collection_objects(
    pool: &SqlitePool,
    collection_id: &str,
    requested_page: i64,
) -> Result<ObjectPage> {
    find_collection(pool, collection_id).await?;
    let total = collections::count_objects(pool, collection_id).await?;
    let pagination = calculate_pagination(total, requested_page);
    let objects =
        collections::objects(pool, collection_id, PAGE_SIZE, pagination.offset).await?;
    Ok(ObjectPage {
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        total_objects: total,
        objects,
    })
}

/// Thumbnail of the first object, or the placeholder for empty collections
pub async fn collection_thumbnail(
    pool: &SqlitePool,
    imports: &Path,
    assets: &Path,
    collection_id: &str,
) -> Result<PathBuf> {
    find_collection(pool, collection_id).await?;
    let first = collections::objects(pool, collection_id, 1, 0).await?;
    if let Some(object) = first.first() {
        return images::thumbnail(imports, &object.id);
    }
    let placeholder = assets.join(EMPTY_THUMBNAIL);
    if placeholder.is_file() {
        Ok(placeholder)
    } else {
        Err(Error::NotFound(Entity::Image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{imported_object, test_state};

    #[test]
    fn test_progress() {
        assert_eq!(progress(0, 0), 1.0);
        assert_eq!(progress(2, 3), 0.5);
        assert_eq!(progress(1, 3), 1.0);
    }

    #[tokio::test]
    async fn test_source_creates_locked_collection() {
        let (state, _dir) = test_state().await;
        let source = create_source(
            &state.db,
            SourceInput {
                title: Some("Letters".to_string()),
                url: Some("http://example.org/{id}".to_string()),
                ..SourceInput::default()
            },
        )
        .await
        .unwrap();

        let listed = list_collections(&state.db, false).await.unwrap();
        assert_eq!(listed.len(), 1);
        let generated = &listed[0].collection;
        assert!(generated.locked);
        assert_eq!(generated.source_id.as_deref(), Some(source.id.as_str()));
        assert!(generated.description.ends_with("imported from Letters"));
        assert_eq!(listed[0].progress, 1.0);

        let summary = source_summary(&state.db, &source.id).await.unwrap();
        assert_eq!(summary.title, "Letters");
        assert!(matches!(
            source_summary(&state.db, "missing").await,
            Err(Error::NotFound(Entity::Source))
        ));
    }

    #[tokio::test]
    async fn test_locked_collection_rejects_manual_add() {
        let (state, _dir) = test_state().await;
        let object = imported_object(&state, "ms-1").await;
        let generated = collections::find_by_source(&state.db, &object.source_id)
            .await
            .unwrap()
            .unwrap();

        let result = add_object(&state.db, &generated.id, &object.id).await;
        assert!(matches!(result, Err(Error::Forbidden)));

        let curated = create_collection(
            &state.db,
            CollectionInput {
                name: Some("Highlights".to_string()),
                ..CollectionInput::default()
            },
        )
        .await
        .unwrap();
        add_object(&state.db, &curated.id, &object.id).await.unwrap();

        let page = collection_objects(&state.db, &curated.id, 1).await.unwrap();
        assert_eq!(page.total_objects, 1);
        assert_eq!(page.objects[0].id, object.id);
    }

    #[tokio::test]
    async fn test_private_collections_hidden() {
        let (state, _dir) = test_state().await;
        create_collection(
            &state.db,
            CollectionInput {
                name: Some("Drafts".to_string()),
                description: None,
                public: Some(false),
            },
        )
        .await
        .unwrap();

        assert!(list_collections(&state.db, false).await.unwrap().is_empty());
        assert_eq!(list_collections(&state.db, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_collection_thumbnail_needs_placeholder() {
        let (state, _dir) = test_state().await;
        let empty = create_collection(
            &state.db,
            CollectionInput {
                name: Some("Empty".to_string()),
                ..CollectionInput::default()
            },
        )
        .await
        .unwrap();

        let missing =
            collection_thumbnail(&state.db, &state.paths.imports, &state.paths.assets, &empty.id).await;
        assert!(matches!(missing, Err(Error::NotFound(Entity::Image))));

        let placeholder = state.paths.assets.join(EMPTY_THUMBNAIL);
        std::fs::create_dir_all(placeholder.parent().unwrap()).unwrap();
        std::fs::write(&placeholder, b"png").unwrap();
        let found =
            collection_thumbnail(&state.db, &state.paths.imports, &state.paths.assets, &empty.id)
                .await
                .unwrap();
        assert_eq!(found, placeholder);
    }
}
