//! Application state shared by HTTP handlers and WebSocket sessions.
//!
//! This module owns:
//!   - the persistence backend (`Store`), chosen from configuration
//!   - the services built on it: sessions, progress recorder, catalog
//!   - startup content installation for the in-memory backend

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::catalog::{Catalog, CreateExercise, CreateLesson};
use crate::config::{load_content_bank, ContentBank, ServerConfig, StoreBackend};
use crate::error::CoreError;
use crate::recorder::ProgressRecorder;
use crate::seeds::seed_content;
use crate::sessions::SessionResolver;
use crate::store::{MemoryStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: SessionResolver,
    pub recorder: Arc<ProgressRecorder>,
    pub catalog: Catalog,
    pub config: ServerConfig,
}

impl AppState {
    /// Wire services around an existing store.
    pub fn new(store: Arc<dyn Store>, config: ServerConfig) -> Self {
        Self {
            sessions: SessionResolver::new(store.clone()),
            recorder: Arc::new(ProgressRecorder::new(store.clone())),
            catalog: Catalog::new(store.clone()),
            store,
            config,
        }
    }

    /// Build state from configuration: connect (and migrate) Postgres, or
    /// create a memory store filled with the content bank and demo seeds.
    #[instrument(level = "info", skip_all, fields(backend = ?config.store_backend))]
    pub async fn from_config(config: ServerConfig) -> Result<Self, CoreError> {
        match config.store_backend {
            StoreBackend::Postgres => {
                let url = config.database_url.as_deref().ok_or_else(|| {
                    CoreError::Configuration("DATABASE_URL is required for the postgres store".into())
                })?;
                let store = PgStore::connect(url, config.database_max_connections).await?;
                store.migrate().await?;
                info!(target: "lingvo_backend", max_connections = config.database_max_connections, "Postgres store ready");
                Ok(Self::new(Arc::new(store), config))
            }
            StoreBackend::Memory => {
                let state = Self::new(Arc::new(MemoryStore::new()), config);
                if let Some(path) = state.config.content_config_path.clone() {
                    if let Some(bank) = load_content_bank(&path) {
                        state.install_content(&bank).await;
                    }
                }
                state.install_content(&seed_content()).await;
                info!(target: "lingvo_backend", "In-memory store ready");
                Ok(state)
            }
        }
    }

    /// Create every lesson and exercise in `bank` through the catalog.
    /// Entries that conflict with existing content or fail validation are
    /// logged and skipped. Returns the number of exercises created.
    #[instrument(level = "info", skip_all, fields(lessons = bank.lessons.len()))]
    pub async fn install_content(&self, bank: &ContentBank) -> usize {
        let mut created = 0;
        for lesson_cfg in &bank.lessons {
            let lesson = match self
                .catalog
                .create_lesson(CreateLesson {
                    title: lesson_cfg.title.clone(),
                    description: lesson_cfg.description.clone(),
                    level: lesson_cfg.level,
                    order: lesson_cfg.order,
                })
                .await
            {
                Ok(lesson) => lesson,
                Err(e) => {
                    warn!(target: "lingvo_backend", title = %lesson_cfg.title, error = %e, "Skipping lesson from content bank");
                    continue;
                }
            };

            for ex in &lesson_cfg.exercises {
                let req = CreateExercise {
                    lesson_id: lesson.id,
                    kind: ex.kind,
                    order: ex.order,
                    content: ex.content.clone(),
                    xp_reward: ex.xp_reward,
                };
                match self.catalog.create_exercise(req).await {
                    Ok(_) => created += 1,
                    Err(e) => {
                        warn!(target: "lingvo_backend", lesson = %lesson.title, order = ex.order, error = %e, "Skipping exercise from content bank");
                    }
                }
            }
        }
        info!(target: "lingvo_backend", exercises = created, "Content installed");
        created
    }
}
