//! transcriba-server library
//!
//! REST backend of the Transcriba transcription game: users transcribe
//! manuscript images, publish revisions and vote on each other's work.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use transcriba_common::config::{ServicePaths, TranscribaConfig};

pub mod api;
pub mod error;
pub mod pagination;
pub mod remote;
pub mod services;

use remote::RemoteSource;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: Arc<TranscribaConfig>,
    /// Database, import and asset locations
    pub paths: Arc<ServicePaths>,
    /// Archive access used by imports
    pub remote: Arc<dyn RemoteSource>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: TranscribaConfig,
        paths: ServicePaths,
        remote: Arc<dyn RemoteSource>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            paths: Arc::new(paths),
            remote,
            started_at: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .nest("/api/AppUsers", api::users::routes())
        .nest("/api/TranscribaObjects", api::objects::routes())
        .nest("/api/Votings", api::votings::routes())
        .nest("/api/Sources", api::sources::routes())
        .nest("/api/Collections", api::collections::routes())
        .nest("/api/Discussions", api::discussions::routes())
        .nest("/api/InfoPages", api::info_pages::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::services::catalog::{self, SourceInput};
    use crate::services::{images, import, rbac, users};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use transcriba_common::config::RootFolderInitializer;
    use transcriba_common::db::{self, init_database, objects};
    use transcriba_common::models::{AppUser, TranscribaObject};
    use transcriba_common::{Error, Result};

    /// Archive answering every metadata request with a fixed record
    pub struct StubRemote {
        fail_images: bool,
        image: Vec<u8>,
    }

    impl StubRemote {
        pub fn new() -> Self {
            Self::serving(images::sample_jpeg(4096, 3000))
        }

        /// Every image download returns `image`
        pub fn serving(image: Vec<u8>) -> Self {
            Self {
                fail_images: false,
                image,
            }
        }

        /// Metadata works, image downloads fail
        pub fn failing_images() -> Self {
            Self {
                fail_images: true,
                image: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl RemoteSource for StubRemote {
        async fn fetch_json(&self, url: &str) -> Result<Value> {
            let record = url.rsplit('/').next().unwrap_or(url);
            let external_id = record.trim_end_matches(".json");
            Ok(json!({
                "title": format!("Letter {}", external_id),
                "mainAuthor": "Unknown",
                "imageUrl": format!("http://images.example.org/{}.jpg", external_id),
            }))
        }

        async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
            if self.fail_images {
                return Err(Error::Remote(format!("{} returned 503", url)));
            }
            Ok(self.image.clone())
        }
    }

    /// Fresh database with bootstrapped roles and accounts
    pub async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = TranscribaConfig::default();
        let paths = RootFolderInitializer::new(dir.path().to_path_buf()).paths(&config);
        std::fs::create_dir_all(&paths.imports).unwrap();

        let pool = init_database(&paths.database).await.unwrap();
        rbac::bootstrap(&pool, &config).await.unwrap();

        let state = AppState::new(pool, config, paths, Arc::new(StubRemote::new()));
        (state, dir)
    }

    /// Confirmed user with password `secret` and the given score
    pub async fn verified_user(state: &AppState, name: &str, score: i64) -> AppUser {
        let user = users::register(
            &state.db,
            users::Registration {
                username: Some(name.to_string()),
                email: Some(format!("{}@example.org", name)),
                password: Some("secret".to_string()),
            },
        )
        .await
        .unwrap();
        let token = user.verification_token.clone().unwrap();
        users::confirm(&state.db, &state.config, &user.id, &token)
            .await
            .unwrap();
        if score != 0 {
            db::users::add_score(&state.db, &user.id, score).await.unwrap();
        }
        db::users::find_by_id(&state.db, &user.id)
            .await
            .unwrap()
            .unwrap()
    }

    /// Object imported through the stub archive
    pub async fn imported_object(state: &AppState, external_id: &str) -> TranscribaObject {
        let source = match catalog::list_sources(&state.db).await.unwrap().into_iter().next() {
            Some(source) => source,
            None => catalog::create_source(
                &state.db,
                SourceInput {
                    title: Some("City Archive".to_string()),
                    url: Some("http://archive.example.org/records/{id}.json".to_string()),
                    info_url: None,
                    logo_url: None,
                },
            )
            .await
            .unwrap(),
        };
        let id = import::import_object(
            &state.db,
            &state.config,
            state.remote.as_ref(),
            &state.paths.imports,
            import::ImportRequest {
                external_id: Some(external_id.to_string()),
                source_id: Some(source.id),
            },
        )
        .await
        .unwrap();
        objects::find_by_id(&state.db, &id).await.unwrap().unwrap()
    }
}
