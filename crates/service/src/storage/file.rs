//! JSON-file-backed storage.
//!
//! The working set lives in an in-process map keyed by `StorageKey`; `save`
//! serializes the whole map and overwrites the durable document in a single
//! write call. A process crash mid-write can truncate that document — a
//! known limit of the one-file design; deployments needing stronger
//! durability run the relational backend.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use models::{Entity, EntityKind, StorageKey};
use tokio::{fs, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::storage::{LinkOutcome, Storage};

pub struct FileStorage {
    objects: RwLock<HashMap<StorageKey, Entity>>,
    file_path: PathBuf,
}

impl FileStorage {
    /// The store starts empty; `reload` pulls in the durable document.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { objects: RwLock::new(HashMap::new()), file_path: path.into() }
    }

    async fn load_document(&self) -> Result<HashMap<StorageKey, Entity>, ServiceError> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            // first-run bootstrap: no document yet means an empty store
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(ServiceError::Io(e.to_string())),
        };
        let doc: HashMap<String, serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|e| ServiceError::Serialize(e.to_string()))?;
        let mut objects = HashMap::with_capacity(doc.len());
        for (key, record) in doc {
            let tag = record
                .get("__class__")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| ServiceError::Serialize(format!("record '{key}' has no __class__ tag")))?;
            if EntityKind::from_tag(tag).is_none() {
                return Err(ServiceError::UnknownEntityType(tag.to_string()));
            }
            let entity: Entity = serde_json::from_value(record)
                .map_err(|e| ServiceError::Serialize(format!("record '{key}': {e}")))?;
            objects.insert(entity.storage_key(), entity);
        }
        Ok(objects)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn all(&self, kind: Option<EntityKind>) -> Result<HashMap<StorageKey, Entity>, ServiceError> {
        let objects = self.objects.read().await;
        Ok(objects
            .iter()
            .filter(|(key, _)| kind.map_or(true, |k| key.kind == k))
            .map(|(key, entity)| (*key, entity.clone()))
            .collect())
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, ServiceError> {
        let objects = self.objects.read().await;
        Ok(objects.get(&StorageKey::new(kind, id)).cloned())
    }

    async fn new(&self, entity: Entity) -> Result<(), ServiceError> {
        let mut objects = self.objects.write().await;
        objects.insert(entity.storage_key(), entity);
        Ok(())
    }

    async fn save(&self) -> Result<(), ServiceError> {
        let objects = self.objects.read().await;
        // serialize before touching the file so an encode failure leaves the
        // durable document untouched
        let data = serde_json::to_vec(&*objects).map_err(|e| ServiceError::Serialize(e.to_string()))?;
        fs::write(&self.file_path, data).await.map_err(|e| ServiceError::Io(e.to_string()))?;
        debug!(path = %self.file_path.display(), objects = objects.len(), "working set persisted");
        Ok(())
    }

    async fn delete(&self, entity: Option<&Entity>) -> Result<(), ServiceError> {
        if let Some(entity) = entity {
            self.objects.write().await.remove(&entity.storage_key());
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), ServiceError> {
        let loaded = self.load_document().await?;
        let mut objects = self.objects.write().await;
        *objects = loaded;
        info!(path = %self.file_path.display(), objects = objects.len(), "working set reloaded");
        Ok(())
    }

    async fn count(&self, kind: Option<EntityKind>) -> Result<u64, ServiceError> {
        let objects = self.objects.read().await;
        Ok(match kind {
            Some(k) => objects.keys().filter(|key| key.kind == k).count() as u64,
            None => objects.len() as u64,
        })
    }

    async fn close(&self) -> Result<(), ServiceError> {
        // drop unsaved in-memory state in favor of the durable document
        self.reload().await
    }

    async fn amenities_of(&self, place_id: Uuid) -> Result<Vec<Entity>, ServiceError> {
        let objects = self.objects.read().await;
        let place = match objects.get(&StorageKey::new(EntityKind::Place, place_id)) {
            Some(Entity::Place(place)) => place,
            _ => return Err(ServiceError::not_found("place")),
        };
        Ok(place
            .amenity_ids
            .iter()
            .filter_map(|id| objects.get(&StorageKey::new(EntityKind::Amenity, *id)).cloned())
            .collect())
    }

    async fn link_amenity(&self, place_id: Uuid, amenity_id: Uuid) -> Result<LinkOutcome, ServiceError> {
        let mut objects = self.objects.write().await;
        if !objects.contains_key(&StorageKey::new(EntityKind::Amenity, amenity_id)) {
            return Err(ServiceError::not_found("amenity"));
        }
        let place = match objects.get_mut(&StorageKey::new(EntityKind::Place, place_id)) {
            Some(Entity::Place(place)) => place,
            _ => return Err(ServiceError::not_found("place")),
        };
        if place.amenity_ids.contains(&amenity_id) {
            return Ok(LinkOutcome::AlreadyLinked);
        }
        place.amenity_ids.push(amenity_id);
        Ok(LinkOutcome::Linked)
    }

    async fn unlink_amenity(&self, place_id: Uuid, amenity_id: Uuid) -> Result<bool, ServiceError> {
        let mut objects = self.objects.write().await;
        let place = match objects.get_mut(&StorageKey::new(EntityKind::Place, place_id)) {
            Some(Entity::Place(place)) => place,
            _ => return Err(ServiceError::not_found("place")),
        };
        match place.amenity_ids.iter().position(|id| *id == amenity_id) {
            Some(index) => {
                place.amenity_ids.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{amenity, city, place, state, user};
    use serde_json::json;
    use std::path::Path;
    use std::time::Duration;

    fn temp_path(prefix: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{prefix}_{}.json", Uuid::new_v4()))
    }

    async fn cleanup(path: &Path) {
        let _ = fs::remove_file(path).await;
    }

    #[tokio::test]
    async fn missing_file_bootstraps_empty() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_bootstrap");
        let store = FileStorage::new(&path);
        store.reload().await?;
        assert!(store.all(None).await?.is_empty());
        assert_eq!(store.count(None).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn round_trip_preserves_fields() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_round_trip");
        let store = FileStorage::new(&path);
        store.reload().await?;

        let st = state::new("California")?;
        let u = user::new("bob@example.com", "pwd")?;
        let c = city::new(st.id, "Fresno")?;
        store.new(Entity::State(st.clone())).await?;
        store.new(Entity::User(u.clone())).await?;
        store.new(Entity::City(c.clone())).await?;
        store.save().await?;

        let reopened = FileStorage::new(&path);
        reopened.reload().await?;
        // field equality, timestamps included
        assert_eq!(reopened.get(EntityKind::State, st.id).await?, Some(Entity::State(st)));
        assert_eq!(reopened.get(EntityKind::User, u.id).await?, Some(Entity::User(u)));
        assert_eq!(reopened.get(EntityKind::City, c.id).await?, Some(Entity::City(c)));

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_then_get_returns_absent() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_delete");
        let store = FileStorage::new(&path);
        store.reload().await?;

        let st = state::new("Nevada")?;
        let entity = Entity::State(st.clone());
        store.new(entity.clone()).await?;
        store.save().await?;

        store.delete(Some(&entity)).await?;
        store.save().await?;
        assert!(store.get(EntityKind::State, st.id).await?.is_none());

        let reopened = FileStorage::new(&path);
        reopened.reload().await?;
        assert!(reopened.get(EntityKind::State, st.id).await?.is_none());

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn deleting_unknown_city_is_a_noop() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_delete_noop");
        let store = FileStorage::new(&path);
        store.reload().await?;

        let st = state::new("Oregon")?;
        store.new(Entity::State(st.clone())).await?;

        let before = store.count(Some(EntityKind::City)).await?;
        let ghost = Entity::City(city::new(st.id, "Nowhere")?);
        store.delete(Some(&ghost)).await?;
        store.delete(None).await?;
        assert_eq!(store.count(Some(EntityKind::City)).await?, before);
        Ok(())
    }

    #[tokio::test]
    async fn count_all_matches_per_kind_sum() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_count");
        let store = FileStorage::new(&path);
        store.reload().await?;

        let st = state::new("California")?;
        let st2 = state::new("Nevada")?;
        let c = city::new(st.id, "Fresno")?;
        let a = amenity::new("Wifi")?;
        store.new(Entity::State(st)).await?;
        store.new(Entity::State(st2)).await?;
        store.new(Entity::City(c)).await?;
        store.new(Entity::Amenity(a)).await?;

        // the aggregate count must cover every kind, not just the last one
        let mut sum = 0;
        for kind in EntityKind::ALL {
            sum += store.count(Some(kind)).await?;
        }
        assert_eq!(store.count(None).await?, sum);
        assert_eq!(sum, 4);

        // all(None) aggregates the same way
        assert_eq!(store.all(None).await?.len(), 4);
        assert_eq!(store.all(Some(EntityKind::State)).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn re_registering_a_key_overwrites() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_overwrite");
        let store = FileStorage::new(&path);
        store.reload().await?;

        let mut entity = Entity::State(state::new("California")?);
        let id = entity.id();
        store.new(entity.clone()).await?;

        entity.apply_update(&json!({"name": "CA"}).as_object().cloned().expect("object"))?;
        store.new(entity).await?;

        assert_eq!(store.count(Some(EntityKind::State)).await?, 1);
        match store.get(EntityKind::State, id).await? {
            Some(Entity::State(m)) => assert_eq!(m.name, "CA"),
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn update_scenario_refreshes_updated_at() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_scenario");
        let store = FileStorage::new(&path);
        store.reload().await?;

        let mut entity = Entity::State(state::new("California")?);
        let id = entity.id();
        store.new(entity.clone()).await?;
        store.save().await?;

        let created = store.get(EntityKind::State, id).await?.expect("created state");
        let first_updated_at = created.updated_at();
        assert_eq!(created.created_at(), first_updated_at);

        tokio::time::sleep(Duration::from_millis(2)).await;
        entity.apply_update(&json!({"name": "CA"}).as_object().cloned().expect("object"))?;
        store.new(entity).await?;
        store.save().await?;

        let reopened = FileStorage::new(&path);
        reopened.reload().await?;
        let updated = reopened.get(EntityKind::State, id).await?.expect("updated state");
        match &updated {
            Entity::State(m) => assert_eq!(m.name, "CA"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(updated.updated_at() > first_updated_at);

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn close_discards_unsaved_state() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_close");
        let store = FileStorage::new(&path);
        store.reload().await?;

        store.new(Entity::State(state::new("California")?)).await?;
        store.save().await?;

        let unsaved = Entity::State(state::new("Nevada")?);
        store.new(unsaved.clone()).await?;
        assert_eq!(store.count(Some(EntityKind::State)).await?, 2);

        store.close().await?;
        assert_eq!(store.count(Some(EntityKind::State)).await?, 1);
        assert!(store.get(EntityKind::State, unsaved.id()).await?.is_none());

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn link_amenity_is_idempotent_and_ordered() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_link");
        let store = FileStorage::new(&path);
        store.reload().await?;

        let st = state::new("California")?;
        let u = user::new("owner@example.com", "pwd")?;
        let c = city::new(st.id, "Fresno")?;
        let p = place::new(c.id, u.id, "Loft")?;
        let wifi = amenity::new("Wifi")?;
        let pool = amenity::new("Pool")?;
        for entity in [
            Entity::State(st),
            Entity::User(u),
            Entity::City(c),
            Entity::Place(p.clone()),
            Entity::Amenity(wifi.clone()),
            Entity::Amenity(pool.clone()),
        ] {
            store.new(entity).await?;
        }

        assert_eq!(store.link_amenity(p.id, wifi.id).await?, LinkOutcome::Linked);
        assert_eq!(store.link_amenity(p.id, wifi.id).await?, LinkOutcome::AlreadyLinked);
        assert_eq!(store.link_amenity(p.id, pool.id).await?, LinkOutcome::Linked);

        let linked: Vec<Uuid> = store.amenities_of(p.id).await?.iter().map(Entity::id).collect();
        assert_eq!(linked, vec![wifi.id, pool.id]);

        // links survive the round trip
        store.save().await?;
        let reopened = FileStorage::new(&path);
        reopened.reload().await?;
        assert_eq!(reopened.amenities_of(p.id).await?.len(), 2);

        assert!(store.unlink_amenity(p.id, wifi.id).await?);
        assert!(!store.unlink_amenity(p.id, wifi.id).await?);
        assert_eq!(store.amenities_of(p.id).await?.len(), 1);

        assert!(matches!(
            store.link_amenity(Uuid::new_v4(), pool.id).await,
            Err(ServiceError::NotFound(_))
        ));

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn unknown_class_tag_fails_reload() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_unknown_tag");
        let mut doc = serde_json::Map::new();
        doc.insert(
            format!("Widget.{}", Uuid::new_v4()),
            json!({"__class__": "Widget", "id": Uuid::new_v4()}),
        );
        fs::write(&path, serde_json::to_vec(&doc)?).await?;

        let store = FileStorage::new(&path);
        assert!(matches!(store.reload().await, Err(ServiceError::UnknownEntityType(tag)) if tag == "Widget"));

        cleanup(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_document_is_a_serialization_error() -> Result<(), anyhow::Error> {
        let path = temp_path("stay_corrupt");
        fs::write(&path, b"not json").await?;

        let store = FileStorage::new(&path);
        assert!(matches!(store.reload().await, Err(ServiceError::Serialize(_))));

        cleanup(&path).await;
        Ok(())
    }
}
