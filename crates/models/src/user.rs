use chrono::Utc;
use sea_orm::{entity::prelude::*, Set};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entity::{expect_opt_str, expect_str};
use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn new(email: &str, password: &str) -> Result<Model, ModelError> {
    if !email.contains('@') { return Err(ModelError::Validation("invalid email".into())); }
    if password.is_empty() { return Err(ModelError::Validation("password required".into())); }
    let now: DateTimeWithTimeZone = Utc::now().into();
    Ok(Model {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password: password.to_string(),
        first_name: None,
        last_name: None,
        created_at: now,
        updated_at: now,
    })
}

/// `email` identifies the account and stays immutable after creation.
pub fn apply_update(m: &mut Model, body: &Map<String, Value>) -> Result<(), ModelError> {
    for (key, value) in body {
        match key.as_str() {
            "password" => m.password = expect_str(key, value)?,
            "first_name" => m.first_name = expect_opt_str(key, value)?,
            "last_name" => m.last_name = expect_opt_str(key, value)?,
            other => return Err(ModelError::Validation(format!("field '{other}' is unknown or immutable"))),
        }
    }
    Ok(())
}

pub fn active_model(m: &Model) -> ActiveModel {
    ActiveModel {
        id: Set(m.id),
        email: Set(m.email.clone()),
        password: Set(m.password.clone()),
        first_name: Set(m.first_name.clone()),
        last_name: Set(m.last_name.clone()),
        created_at: Set(m.created_at),
        updated_at: Set(m.updated_at),
    }
}
