use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use models::{state, Entity, EntityKind};
use serde_json::{json, Value};

use super::{body_without, json_object, parse_id, ApiState};
use crate::errors::JsonApiError;

pub async fn list_states(State(api): State<ApiState>) -> Result<Json<Vec<Entity>>, JsonApiError> {
    let all = api.storage.all(Some(EntityKind::State)).await?;
    Ok(Json(all.into_values().collect()))
}

pub async fn get_state(
    State(api): State<ApiState>,
    Path(state_id): Path<String>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&state_id)?;
    let found = api.storage.get(EntityKind::State, id).await?;
    found.map(Json).ok_or_else(JsonApiError::not_found)
}

pub async fn delete_state(
    State(api): State<ApiState>,
    Path(state_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let id = parse_id(&state_id)?;
    let found = api.storage.get(EntityKind::State, id).await?.ok_or_else(JsonApiError::not_found)?;
    api.storage.delete(Some(&found)).await?;
    api.storage.save().await?;
    Ok((StatusCode::OK, Json(json!({}))))
}

pub async fn create_state(
    State(api): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Entity>), JsonApiError> {
    let body = json_object(&body)?;
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonApiError::bad_request("Missing name"))?;

    let mut entity = Entity::State(state::new(name)?);
    let extra = body_without(body, &["name"]);
    if !extra.is_empty() {
        entity.apply_update(&extra)?;
    }
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn update_state(
    State(api): State<ApiState>,
    Path(state_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&state_id)?;
    let mut entity = api.storage.get(EntityKind::State, id).await?.ok_or_else(JsonApiError::not_found)?;
    let body = json_object(&body)?;
    entity.apply_update(body)?;
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok(Json(entity))
}
