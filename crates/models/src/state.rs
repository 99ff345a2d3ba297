use chrono::Utc;
use sea_orm::{entity::prelude::*, Set};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entity::expect_str;
use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn new(name: &str) -> Result<Model, ModelError> {
    if name.trim().is_empty() { return Err(ModelError::Validation("name required".into())); }
    let now: DateTimeWithTimeZone = Utc::now().into();
    Ok(Model { id: Uuid::new_v4(), name: name.to_string(), created_at: now, updated_at: now })
}

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
        name: Set(m.name.clone()),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}
