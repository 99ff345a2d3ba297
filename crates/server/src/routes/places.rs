use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use models::{place, Entity, EntityKind};
use serde_json::{json, Value};

use super::{body_without, json_object, parse_id, ApiState};
use crate::errors::JsonApiError;

pub async fn list_places_in_city(
    State(api): State<ApiState>,
    Path(city_id): Path<String>,
) -> Result<Json<Vec<Entity>>, JsonApiError> {
    let id = parse_id(&city_id)?;
    api.storage.get(EntityKind::City, id).await?.ok_or_else(JsonApiError::not_found)?;
    let places: Vec<Entity> = api
        .storage
        .all(Some(EntityKind::Place))
        .await?
        .into_values()
        .filter(|entity| matches!(entity, Entity::Place(p) if p.city_id == id))
        .collect();
    Ok(Json(places))
}

pub async fn get_place(
    State(api): State<ApiState>,
    Path(place_id): Path<String>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&place_id)?;
    let found = api.storage.get(EntityKind::Place, id).await?;
    found.map(Json).ok_or_else(JsonApiError::not_found)
}

pub async fn delete_place(
    State(api): State<ApiState>,
    Path(place_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let id = parse_id(&place_id)?;
    let found = api.storage.get(EntityKind::Place, id).await?.ok_or_else(JsonApiError::not_found)?;
    api.storage.delete(Some(&found)).await?;
    api.storage.save().await?;
    Ok((StatusCode::OK, Json(json!({}))))
}

pub async fn create_place(
    State(api): State<ApiState>,
    Path(city_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Entity>), JsonApiError> {
    let id = parse_id(&city_id)?;
    api.storage.get(EntityKind::City, id).await?.ok_or_else(JsonApiError::not_found)?;

    let body = json_object(&body)?;
    let user_id = body
        .get("user_id")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonApiError::bad_request("Missing user_id"))?;
    let user_id = parse_id(user_id)?;
    api.storage.get(EntityKind::User, user_id).await?.ok_or_else(JsonApiError::not_found)?;
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonApiError::bad_request("Missing name"))?;

    let mut entity = Entity::Place(place::new(id, user_id, name)?);
    let extra = body_without(body, &["name", "user_id", "city_id"]);
    if !extra.is_empty() {
        entity.apply_update(&extra)?;
    }
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn update_place(
    State(api): State<ApiState>,
    Path(place_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&place_id)?;
    let mut entity = api.storage.get(EntityKind::Place, id).await?.ok_or_else(JsonApiError::not_found)?;
    let body = json_object(&body)?;
    entity.apply_update(body)?;
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok(Json(entity))
}
