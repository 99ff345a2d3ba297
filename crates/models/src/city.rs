use chrono::Utc;
use sea_orm::{entity::prelude::*, Set};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entity::expect_str;
use crate::errors::ModelError;
use crate::state;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "city")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub state_id: Uuid,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    State,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::State => Entity::belongs_to(state::Entity).from(Column::StateId).to(state::Column::Id).into() }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn new(state_id: Uuid, name: &str) -> Result<Model, ModelError> {
    if name.trim().is_empty() { return Err(ModelError::Validation("name required".into())); }
    let now: DateTimeWithTimeZone = Utc::now().into();
    Ok(Model { id: Uuid::new_v4(), state_id, name: name.to_string(), created_at: now, updated_at: now })
}

/// `state_id` is fixed at creation; a city never moves between states.
pub fn apply_update(m: &mut Model, body: &Map<String, Value>) -> Result<(), ModelError> {
    for (key, value) in body {
        match key.as_str() {
            "name" => m.name = expect_str(key, value)?,
            other => return Err(ModelError::Validation(format!("field '{other}' is unknown or immutable"))),
        }
    }
    Ok(())
}

pub fn active_model(m: &Model) -> ActiveModel {
    ActiveModel {
        id: Set(m.id),
        state_id: Set(m.state_id),
        name: Set(m.name.clone()),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}
