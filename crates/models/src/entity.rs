//! Tagged sum of every persistable domain type.
//!
//! The serialized form doubles as the durable file format: each record
//! carries a `__class__` tag naming its type, and the working-set key
//! renders as `"<TypeName>.<id>"`.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::{amenity, city, place, review, state, user};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    State,
    City,
    User,
    Amenity,
    Place,
    Review,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::State,
        EntityKind::City,
        EntityKind::User,
        EntityKind::Amenity,
        EntityKind::Place,
        EntityKind::Review,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::State => "State",
            EntityKind::City => "City",
            EntityKind::User => "User",
            EntityKind::Amenity => "Amenity",
            EntityKind::Place => "Place",
            EntityKind::Review => "Review",
        }
    }

    /// Resolve a serialized `__class__` tag. The set of kinds is closed, so
    /// `None` means the durable document names a type this build does not
    /// know about.
    pub fn from_tag(tag: &str) -> Option<EntityKind> {
        match tag {
            "State" => Some(EntityKind::State),
            "City" => Some(EntityKind::City),
            "User" => Some(EntityKind::User),
            "Amenity" => Some(EntityKind::Amenity),
            "Place" => Some(EntityKind::Place),
            "Review" => Some(EntityKind::Review),
            _ => None,
        }
    }

    /// Collection key used by the stats endpoint.
    pub fn stat_key(self) -> &'static str {
        match self {
            EntityKind::State => "states",
            EntityKind::City => "cities",
            EntityKind::User => "users",
            EntityKind::Amenity => "amenities",
            EntityKind::Place => "places",
            EntityKind::Review => "reviews",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite identity addressing one entity across both backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl StorageKey {
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.id)
    }
}

impl FromStr for StorageKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('.')
            .ok_or_else(|| ModelError::Validation(format!("malformed storage key '{s}'")))?;
        let kind = EntityKind::from_tag(kind)
            .ok_or_else(|| ModelError::Validation(format!("unknown entity type '{kind}'")))?;
        let id = Uuid::parse_str(id)
            .map_err(|e| ModelError::Validation(format!("bad id in storage key '{s}': {e}")))?;
        Ok(Self { kind, id })
    }
}

impl Serialize for StorageKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StorageKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__class__")]
pub enum Entity {
    State(state::Model),
    City(city::Model),
    User(user::Model),
    Amenity(amenity::Model),
    Place(place::Model),
    Review(review::Model),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::State(_) => EntityKind::State,
            Entity::City(_) => EntityKind::City,
            Entity::User(_) => EntityKind::User,
            Entity::Amenity(_) => EntityKind::Amenity,
            Entity::Place(_) => EntityKind::Place,
            Entity::Review(_) => EntityKind::Review,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Entity::State(m) => m.id,
            Entity::City(m) => m.id,
            Entity::User(m) => m.id,
            Entity::Amenity(m) => m.id,
            Entity::Place(m) => m.id,
            Entity::Review(m) => m.id,
        }
    }

    pub fn storage_key(&self) -> StorageKey {
        StorageKey::new(self.kind(), self.id())
    }

    pub fn created_at(&self) -> DateTimeWithTimeZone {
        match self {
            Entity::State(m) => m.created_at,
            Entity::City(m) => m.created_at,
            Entity::User(m) => m.created_at,
            Entity::Amenity(m) => m.created_at,
            Entity::Place(m) => m.created_at,
            Entity::Review(m) => m.created_at,
        }
    }

    pub fn updated_at(&self) -> DateTimeWithTimeZone {
        match self {
            Entity::State(m) => m.updated_at,
            Entity::City(m) => m.updated_at,
            Entity::User(m) => m.updated_at,
            Entity::Amenity(m) => m.updated_at,
            Entity::Place(m) => m.updated_at,
            Entity::Review(m) => m.updated_at,
        }
    }

    /// Refresh `updated_at`; called after every successful mutation.
    pub fn touch(&mut self) {
        let now: DateTimeWithTimeZone = Utc::now().into();
        match self {
            Entity::State(m) => m.updated_at = now,
            Entity::City(m) => m.updated_at = now,
            Entity::User(m) => m.updated_at = now,
            Entity::Amenity(m) => m.updated_at = now,
            Entity::Place(m) => m.updated_at = now,
            Entity::Review(m) => m.updated_at = now,
        }
    }

    /// Apply a JSON body through the type's mutable-field allow-list.
    /// Unknown and immutable keys are rejected before any field is assigned;
    /// on success `updated_at` is refreshed.
    pub fn apply_update(&mut self, body: &Map<String, Value>) -> Result<(), ModelError> {
        match self {
            Entity::State(m) => state::apply_update(m, body)?,
            Entity::City(m) => city::apply_update(m, body)?,
            Entity::User(m) => user::apply_update(m, body)?,
            Entity::Amenity(m) => amenity::apply_update(m, body)?,
            Entity::Place(m) => place::apply_update(m, body)?,
            Entity::Review(m) => review::apply_update(m, body)?,
        }
        self.touch();
        Ok(())
    }
}

impl From<state::Model> for Entity {
    fn from(m: state::Model) -> Self { Entity::State(m) }
}

impl From<city::Model> for Entity {
    fn from(m: city::Model) -> Self { Entity::City(m) }
}

impl From<user::Model> for Entity {
    fn from(m: user::Model) -> Self { Entity::User(m) }
}

impl From<amenity::Model> for Entity {
    fn from(m: amenity::Model) -> Self { Entity::Amenity(m) }
}

impl From<place::Model> for Entity {
    fn from(m: place::Model) -> Self { Entity::Place(m) }
}

impl From<review::Model> for Entity {
    fn from(m: review::Model) -> Self { Entity::Review(m) }
}

// JSON coercion helpers shared by the per-type allow-lists.

pub(crate) fn expect_str(key: &str, value: &Value) -> Result<String, ModelError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ModelError::Validation(format!("field '{key}' must be a string")))
}

pub(crate) fn expect_opt_str(key: &str, value: &Value) -> Result<Option<String>, ModelError> {
    if value.is_null() {
        return Ok(None);
    }
    expect_str(key, value).map(Some)
}

pub(crate) fn expect_i32(key: &str, value: &Value) -> Result<i32, ModelError> {
    value
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| ModelError::Validation(format!("field '{key}' must be an integer")))
}

pub(crate) fn expect_opt_f64(key: &str, value: &Value) -> Result<Option<f64>, ModelError> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_f64()
        .map(Some)
        .ok_or_else(|| ModelError::Validation(format!("field '{key}' must be a number")))
}
