use chrono::Utc;
use sea_orm::{entity::prelude::*, Set};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entity::{expect_i32, expect_opt_f64, expect_opt_str, expect_str};
use crate::errors::ModelError;
use crate::{city, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "place")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub city_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub number_rooms: i32,
    pub number_bathrooms: i32,
    pub max_guest: i32,
    pub price_by_night: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    /// Linked amenities, file backend only. The relational backend keeps the
    /// association in the `place_amenity` join table instead of a column.
    #[sea_orm(ignore)]
    #[serde(default)]
    pub amenity_ids: Vec<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    City,
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::City => Entity::belongs_to(city::Entity).from(Column::CityId).to(city::Column::Id).into(),
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn new(city_id: Uuid, user_id: Uuid, name: &str) -> Result<Model, ModelError> {
    if name.trim().is_empty() { return Err(ModelError::Validation("name required".into())); }
    let now: DateTimeWithTimeZone = Utc::now().into();
    Ok(Model {
        id: Uuid::new_v4(),
        city_id,
        user_id,
        name: name.to_string(),
        description: None,
        number_rooms: 0,
        number_bathrooms: 0,
        max_guest: 0,
        price_by_night: 0,
        latitude: None,
        longitude: None,
        created_at: now,
        updated_at: now,
        amenity_ids: Vec::new(),
    })
}

/// Ownership (`city_id`, `user_id`) is fixed at creation; amenity links go
/// through the storage association operations, not field updates.
pub fn apply_update(m: &mut Model, body: &Map<String, Value>) -> Result<(), ModelError> {
    for (key, value) in body {
        match key.as_str() {
            "name" => m.name = expect_str(key, value)?,
            "description" => m.description = expect_opt_str(key, value)?,
            "number_rooms" => m.number_rooms = expect_i32(key, value)?,
            "number_bathrooms" => m.number_bathrooms = expect_i32(key, value)?,
            "max_guest" => m.max_guest = expect_i32(key, value)?,
            "price_by_night" => m.price_by_night = expect_i32(key, value)?,
            "latitude" => m.latitude = expect_opt_f64(key, value)?,
            "longitude" => m.longitude = expect_opt_f64(key, value)?,
            other => return Err(ModelError::Validation(format!("field '{other}' is unknown or immutable"))),
        }
    }
    Ok(())
}

pub fn active_model(m: &Model) -> ActiveModel {
    ActiveModel {
        id: Set(m.id),
        city_id: Set(m.city_id),
        user_id: Set(m.user_id),
        name: Set(m.name.clone()),
        description: Set(m.description.clone()),
        number_rooms: Set(m.number_rooms),
        number_bathrooms: Set(m.number_bathrooms),
        max_guest: Set(m.max_guest),
        price_by_night: Set(m.price_by_night),
        latitude: Set(m.latitude),
        longitude: Set(m.longitude),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}
