//! Relational storage on SeaORM.
//!
//! The contract's "session" is a long-lived database transaction:
//! `new`/`delete` stage changes that queries through the same transaction
//! already see, `save` commits and opens the next transaction, and `close`
//! rolls back to a fresh session while the engine connection persists.

use std::collections::HashMap;

use async_trait::async_trait;
use models::{amenity, city, place, place_amenity, review, state, user};
use models::{Entity, EntityKind, StorageKey};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, Schema, TransactionTrait,
};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::storage::{LinkOutcome, Storage};

pub struct DbStorage {
    db: DatabaseConnection,
    session: Mutex<Option<DatabaseTransaction>>,
}

fn db_err(e: sea_orm::DbErr) -> ServiceError {
    ServiceError::Db(e.to_string())
}

fn no_session() -> ServiceError {
    ServiceError::Db("no open session; call reload first".into())
}

async fn fetch_all(txn: &DatabaseTransaction, kind: EntityKind) -> Result<Vec<Entity>, ServiceError> {
    Ok(match kind {
        EntityKind::State => state::Entity::find().all(txn).await.map_err(db_err)?.into_iter().map(Entity::State).collect(),
        EntityKind::City => city::Entity::find().all(txn).await.map_err(db_err)?.into_iter().map(Entity::City).collect(),
        EntityKind::User => user::Entity::find().all(txn).await.map_err(db_err)?.into_iter().map(Entity::User).collect(),
        EntityKind::Amenity => amenity::Entity::find().all(txn).await.map_err(db_err)?.into_iter().map(Entity::Amenity).collect(),
        EntityKind::Place => place::Entity::find().all(txn).await.map_err(db_err)?.into_iter().map(Entity::Place).collect(),
        EntityKind::Review => review::Entity::find().all(txn).await.map_err(db_err)?.into_iter().map(Entity::Review).collect(),
    })
}

async fn fetch_one(txn: &DatabaseTransaction, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, ServiceError> {
    Ok(match kind {
        EntityKind::State => state::Entity::find_by_id(id).one(txn).await.map_err(db_err)?.map(Entity::State),
        EntityKind::City => city::Entity::find_by_id(id).one(txn).await.map_err(db_err)?.map(Entity::City),
        EntityKind::User => user::Entity::find_by_id(id).one(txn).await.map_err(db_err)?.map(Entity::User),
        EntityKind::Amenity => amenity::Entity::find_by_id(id).one(txn).await.map_err(db_err)?.map(Entity::Amenity),
        EntityKind::Place => place::Entity::find_by_id(id).one(txn).await.map_err(db_err)?.map(Entity::Place),
        EntityKind::Review => review::Entity::find_by_id(id).one(txn).await.map_err(db_err)?.map(Entity::Review),
    })
}

async fn count_kind(txn: &DatabaseTransaction, kind: EntityKind) -> Result<u64, ServiceError> {
    match kind {
        EntityKind::State => state::Entity::find().count(txn).await,
        EntityKind::City => city::Entity::find().count(txn).await,
        EntityKind::User => user::Entity::find().count(txn).await,
        EntityKind::Amenity => amenity::Entity::find().count(txn).await,
        EntityKind::Place => place::Entity::find().count(txn).await,
        EntityKind::Review => review::Entity::find().count(txn).await,
    }
    .map_err(db_err)
}

/// Stage an insert, or an update when the row already exists: the working
/// set treats re-registering a key as an overwrite.
async fn upsert(txn: &DatabaseTransaction, entity: &Entity) -> Result<(), ServiceError> {
    match entity {
        Entity::State(m) => {
            let exists = state::Entity::find_by_id(m.id).one(txn).await.map_err(db_err)?.is_some();
            let am = state::active_model(m);
            if exists { am.update(txn).await.map_err(db_err)?; } else { am.insert(txn).await.map_err(db_err)?; }
        }
        Entity::City(m) => {
            let exists = city::Entity::find_by_id(m.id).one(txn).await.map_err(db_err)?.is_some();
            let am = city::active_model(m);
            if exists { am.update(txn).await.map_err(db_err)?; } else { am.insert(txn).await.map_err(db_err)?; }
        }
        Entity::User(m) => {
            let exists = user::Entity::find_by_id(m.id).one(txn).await.map_err(db_err)?.is_some();
            let am = user::active_model(m);
            if exists { am.update(txn).await.map_err(db_err)?; } else { am.insert(txn).await.map_err(db_err)?; }
        }
        Entity::Amenity(m) => {
            let exists = amenity::Entity::find_by_id(m.id).one(txn).await.map_err(db_err)?.is_some();
            let am = amenity::active_model(m);
            if exists { am.update(txn).await.map_err(db_err)?; } else { am.insert(txn).await.map_err(db_err)?; }
        }
        Entity::Place(m) => {
            let exists = place::Entity::find_by_id(m.id).one(txn).await.map_err(db_err)?.is_some();
            let am = place::active_model(m);
            if exists { am.update(txn).await.map_err(db_err)?; } else { am.insert(txn).await.map_err(db_err)?; }
        }
        Entity::Review(m) => {
            let exists = review::Entity::find_by_id(m.id).one(txn).await.map_err(db_err)?.is_some();
            let am = review::active_model(m);
            if exists { am.update(txn).await.map_err(db_err)?; } else { am.insert(txn).await.map_err(db_err)?; }
        }
    }
    Ok(())
}

async fn delete_row(txn: &DatabaseTransaction, kind: EntityKind, id: Uuid) -> Result<(), ServiceError> {
    // deleting an absent row affects zero rows, which is the contract's no-op
    match kind {
        EntityKind::State => state::Entity::delete_by_id(id).exec(txn).await,
        EntityKind::City => city::Entity::delete_by_id(id).exec(txn).await,
        EntityKind::User => user::Entity::delete_by_id(id).exec(txn).await,
        EntityKind::Amenity => amenity::Entity::delete_by_id(id).exec(txn).await,
        EntityKind::Place => place::Entity::delete_by_id(id).exec(txn).await,
        EntityKind::Review => review::Entity::delete_by_id(id).exec(txn).await,
    }
    .map_err(db_err)?;
    Ok(())
}

impl DbStorage {
    /// The connection is established by the caller; `reload` ensures the
    /// schema and opens the first session.
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, session: Mutex::new(None) }
    }

    /// Create missing tables from the entity definitions. Never drops:
    /// existing tables and data are left alone.
    async fn ensure_schema(&self) -> Result<(), ServiceError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);
        // dependency order: referenced tables first, join table last
        let statements = vec![
            schema.create_table_from_entity(state::Entity),
            schema.create_table_from_entity(user::Entity),
            schema.create_table_from_entity(amenity::Entity),
            schema.create_table_from_entity(city::Entity),
            schema.create_table_from_entity(place::Entity),
            schema.create_table_from_entity(review::Entity),
            schema.create_table_from_entity(place_amenity::Entity),
        ];
        for mut statement in statements {
            statement.if_not_exists();
            self.db.execute(backend.build(&statement)).await.map_err(db_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for DbStorage {
    async fn all(&self, kind: Option<EntityKind>) -> Result<HashMap<StorageKey, Entity>, ServiceError> {
        let guard = self.session.lock().await;
        let txn = guard.as_ref().ok_or_else(no_session)?;
        let kinds: &[EntityKind] = match kind {
            Some(ref k) => std::slice::from_ref(k),
            None => &EntityKind::ALL,
        };
        let mut map = HashMap::new();
        for k in kinds {
            for entity in fetch_all(txn, *k).await? {
                map.insert(entity.storage_key(), entity);
            }
        }
        Ok(map)
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, ServiceError> {
        let guard = self.session.lock().await;
        let txn = guard.as_ref().ok_or_else(no_session)?;
        fetch_one(txn, kind, id).await
    }

    async fn new(&self, entity: Entity) -> Result<(), ServiceError> {
        let guard = self.session.lock().await;
        let txn = guard.as_ref().ok_or_else(no_session)?;
        upsert(txn, &entity).await
    }

    async fn save(&self) -> Result<(), ServiceError> {
        let mut guard = self.session.lock().await;
        let txn = guard.take().ok_or_else(no_session)?;
        let committed = txn.commit().await;
        // reopen a session either way so the store stays usable; a failed
        // commit has already rolled the staged changes back
        *guard = Some(self.db.begin().await.map_err(db_err)?);
        committed.map_err(|e| ServiceError::Db(format!("commit failed: {e}")))?;
        debug!("session committed");
        Ok(())
    }

    async fn delete(&self, entity: Option<&Entity>) -> Result<(), ServiceError> {
        let Some(entity) = entity else { return Ok(()) };
        let guard = self.session.lock().await;
        let txn = guard.as_ref().ok_or_else(no_session)?;
        delete_row(txn, entity.kind(), entity.id()).await
    }

    async fn reload(&self) -> Result<(), ServiceError> {
        self.ensure_schema().await?;
        let mut guard = self.session.lock().await;
        if let Some(stale) = guard.take() {
            // discard whatever the previous session had staged
            let _ = stale.rollback().await;
        }
        *guard = Some(self.db.begin().await.map_err(db_err)?);
        info!("database session opened");
        Ok(())
    }

    async fn count(&self, kind: Option<EntityKind>) -> Result<u64, ServiceError> {
        let guard = self.session.lock().await;
        let txn = guard.as_ref().ok_or_else(no_session)?;
        match kind {
            Some(k) => count_kind(txn, k).await,
            None => {
                let mut total = 0;
                for k in EntityKind::ALL {
                    total += count_kind(txn, k).await?;
                }
                Ok(total)
            }
        }
    }

    async fn close(&self) -> Result<(), ServiceError> {
        let mut guard = self.session.lock().await;
        if let Some(txn) = guard.take() {
            txn.rollback().await.map_err(db_err)?;
        }
        // the engine connection persists; leave a fresh session behind
        *guard = Some(self.db.begin().await.map_err(db_err)?);
        Ok(())
    }

    async fn amenities_of(&self, place_id: Uuid) -> Result<Vec<Entity>, ServiceError> {
        let guard = self.session.lock().await;
        let txn = guard.as_ref().ok_or_else(no_session)?;
        if fetch_one(txn, EntityKind::Place, place_id).await?.is_none() {
            return Err(ServiceError::not_found("place"));
        }
        let links = place_amenity::Entity::find()
            .filter(place_amenity::Column::PlaceId.eq(place_id))
            .all(txn)
            .await
            .map_err(db_err)?;
        let ids: Vec<Uuid> = links.iter().map(|link| link.amenity_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(amenity::Entity::find()
            .filter(amenity::Column::Id.is_in(ids))
            .all(txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(Entity::Amenity)
            .collect())
    }

    async fn link_amenity(&self, place_id: Uuid, amenity_id: Uuid) -> Result<LinkOutcome, ServiceError> {
        let guard = self.session.lock().await;
        let txn = guard.as_ref().ok_or_else(no_session)?;
        if fetch_one(txn, EntityKind::Place, place_id).await?.is_none() {
            return Err(ServiceError::not_found("place"));
        }
        if fetch_one(txn, EntityKind::Amenity, amenity_id).await?.is_none() {
            return Err(ServiceError::not_found("amenity"));
        }
        let existing = place_amenity::Entity::find_by_id((place_id, amenity_id))
            .one(txn)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Ok(LinkOutcome::AlreadyLinked);
        }
        place_amenity::Entity::insert(place_amenity::active_model(place_id, amenity_id))
            .exec_without_returning(txn)
            .await
            .map_err(db_err)?;
        Ok(LinkOutcome::Linked)
    }

    async fn unlink_amenity(&self, place_id: Uuid, amenity_id: Uuid) -> Result<bool, ServiceError> {
        let guard = self.session.lock().await;
        let txn = guard.as_ref().ok_or_else(no_session)?;
        let result = place_amenity::Entity::delete_by_id((place_id, amenity_id))
            .exec(txn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}
