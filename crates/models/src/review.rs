use chrono::Utc;
use sea_orm::{entity::prelude::*, Set};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entity::expect_str;
use crate::errors::ModelError;
use crate::{place, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Place,
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Place => Entity::belongs_to(place::Entity).from(Column::PlaceId).to(place::Column::Id).into(),
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn new(place_id: Uuid, user_id: Uuid, text: &str) -> Result<Model, ModelError> {
    if text.trim().is_empty() { return Err(ModelError::Validation("text required".into())); }
    let now: DateTimeWithTimeZone = Utc::now().into();
    Ok(Model { id: Uuid::new_v4(), place_id, user_id, text: text.to_string(), created_at: now, updated_at: now })
}

pub fn apply_update(m: &mut Model, body: &Map<String, Value>) -> Result<(), ModelError> {
    for (key, value) in body {
        match key.as_str() {
            "text" => m.text = expect_str(key, value)?,
            other => return Err(ModelError::Validation(format!("field '{other}' is unknown or immutable"))),
        }
    }
    Ok(())
}

pub fn active_model(m: &Model) -> ActiveModel {
    ActiveModel {
        id: Set(m.id),
        place_id: Set(m.place_id),
        user_id: Set(m.user_id),
        text: Set(m.text.clone()),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}
