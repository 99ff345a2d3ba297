use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use models::{user, Entity, EntityKind};
use serde_json::{json, Value};

use super::{body_without, json_object, parse_id, ApiState};
use crate::errors::JsonApiError;

pub async fn list_users(State(api): State<ApiState>) -> Result<Json<Vec<Entity>>, JsonApiError> {
    let all = api.storage.all(Some(EntityKind::User)).await?;
    Ok(Json(all.into_values().collect()))
}

pub async fn get_user(
    State(api): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&user_id)?;
    let found = api.storage.get(EntityKind::User, id).await?;
    found.map(Json).ok_or_else(JsonApiError::not_found)
}

pub async fn delete_user(
    State(api): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let id = parse_id(&user_id)?;
    let found = api.storage.get(EntityKind::User, id).await?.ok_or_else(JsonApiError::not_found)?;
    api.storage.delete(Some(&found)).await?;
    api.storage.save().await?;
    Ok((StatusCode::OK, Json(json!({}))))
}

pub async fn create_user(
    State(api): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Entity>), JsonApiError> {
    let body = json_object(&body)?;
    let email = body
        .get("email")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonApiError::bad_request("Missing email"))?;
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonApiError::bad_request("Missing password"))?;

    let mut entity = Entity::User(user::new(email, password)?);
    let extra = body_without(body, &["email", "password"]);
    if !extra.is_empty() {
        entity.apply_update(&extra)?;
    }
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn update_user(
    State(api): State<ApiState>,
    Path(user_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&user_id)?;
    let mut entity = api.storage.get(EntityKind::User, id).await?.ok_or_else(JsonApiError::not_found)?;
    let body = json_object(&body)?;
    entity.apply_update(body)?;
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok(Json(entity))
}
