//! Persistence contract shared by the file and relational backends.
//!
//! The facade is selected once at startup from configuration and handed to
//! callers as `Arc<dyn Storage>`; route handlers never know which backend
//! they are talking to.

pub mod db;
pub mod file;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use models::{Entity, EntityKind, StorageKey};
use tracing::info;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Result of linking an amenity to a place. Linking is idempotent: repeating
/// a link reports `AlreadyLinked` instead of failing or duplicating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    AlreadyLinked,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Every stored entity, optionally filtered to one kind. With `None` the
    /// result aggregates across all kinds. No ordering guarantee.
    async fn all(&self, kind: Option<EntityKind>) -> Result<HashMap<StorageKey, Entity>, ServiceError>;

    /// The unique entity of `(kind, id)`. Absence is a normal outcome, never
    /// an error.
    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, ServiceError>;

    /// Register a freshly constructed or mutated entity with the working
    /// set. Re-registering the same key overwrites. Durable only after
    /// `save`.
    async fn new(&self, entity: Entity) -> Result<(), ServiceError>;

    /// Make all pending registrations, mutations and deletions durable. On
    /// failure the error propagates and no partial state is committed.
    async fn save(&self) -> Result<(), ServiceError>;

    /// Remove the entity from the working set; no-op on `None` or an unknown
    /// key. Durable only after `save`.
    async fn delete(&self, entity: Option<&Entity>) -> Result<(), ServiceError>;

    /// (Re)initialize the working set from the durable medium.
    async fn reload(&self) -> Result<(), ServiceError>;

    /// Number of stored entities, optionally filtered by kind. `count(None)`
    /// equals the sum over every kind.
    async fn count(&self, kind: Option<EntityKind>) -> Result<u64, ServiceError>;

    /// Release session resources, discarding unsaved state; the backend
    /// stays usable afterwards.
    async fn close(&self) -> Result<(), ServiceError>;

    /// Amenities linked to the place, in insertion order where the backend
    /// preserves one.
    async fn amenities_of(&self, place_id: Uuid) -> Result<Vec<Entity>, ServiceError>;

    /// Idempotently link an amenity to a place. Durable after `save`.
    async fn link_amenity(&self, place_id: Uuid, amenity_id: Uuid) -> Result<LinkOutcome, ServiceError>;

    /// Remove a link; returns whether one existed. Durable after `save`.
    async fn unlink_amenity(&self, place_id: Uuid, amenity_id: Uuid) -> Result<bool, ServiceError>;
}

/// Build the backend selected by configuration and load its working set.
/// Callers are expected to have created the file backend's parent directory
/// (startup runs `runtime::ensure_env` first).
pub async fn from_config(cfg: &configs::AppConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match cfg.storage.engine {
        configs::StorageEngine::File => Arc::new(file::FileStorage::new(&cfg.storage.file_path)),
        configs::StorageEngine::Db => {
            let db = models::db::connect_with_config(&cfg.database).await?;
            Arc::new(db::DbStorage::new(db))
        }
    };
    storage.reload().await?;
    info!(engine = ?cfg.storage.engine, "storage backend initialized");
    Ok(storage)
}
