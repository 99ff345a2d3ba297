use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use models::{city, Entity, EntityKind};
use serde_json::{json, Value};

use super::{body_without, json_object, parse_id, ApiState};
use crate::errors::JsonApiError;

pub async fn list_cities_in_state(
    State(api): State<ApiState>,
    Path(state_id): Path<String>,
) -> Result<Json<Vec<Entity>>, JsonApiError> {
    let id = parse_id(&state_id)?;
    api.storage.get(EntityKind::State, id).await?.ok_or_else(JsonApiError::not_found)?;
    let cities: Vec<Entity> = api
        .storage
        .all(Some(EntityKind::City))
        .await?
        .into_values()
        .filter(|entity| matches!(entity, Entity::City(c) if c.state_id == id))
        .collect();
    Ok(Json(cities))
}

pub async fn get_city(
    State(api): State<ApiState>,
    Path(city_id): Path<String>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&city_id)?;
    let found = api.storage.get(EntityKind::City, id).await?;
    found.map(Json).ok_or_else(JsonApiError::not_found)
}

pub async fn delete_city(
    State(api): State<ApiState>,
    Path(city_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let id = parse_id(&city_id)?;
    let found = api.storage.get(EntityKind::City, id).await?.ok_or_else(JsonApiError::not_found)?;
    api.storage.delete(Some(&found)).await?;
    api.storage.save().await?;
    Ok((StatusCode::OK, Json(json!({}))))
}

pub async fn create_city(
    State(api): State<ApiState>,
    Path(state_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Entity>), JsonApiError> {
    let id = parse_id(&state_id)?;
    api.storage.get(EntityKind::State, id).await?.ok_or_else(JsonApiError::not_found)?;

    let body = json_object(&body)?;
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonApiError::bad_request("Missing name"))?;

    // the parent state comes from the path, never the body
    let mut entity = Entity::City(city::new(id, name)?);
    let extra = body_without(body, &["name", "state_id"]);
    if !extra.is_empty() {
        entity.apply_update(&extra)?;
    }
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn update_city(
    State(api): State<ApiState>,
    Path(city_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&city_id)?;
    let mut entity = api.storage.get(EntityKind::City, id).await?.ok_or_else(JsonApiError::not_found)?;
    let body = json_object(&body)?;
    entity.apply_update(body)?;
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok(Json(entity))
}
