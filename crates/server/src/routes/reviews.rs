use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use models::{review, Entity, EntityKind};
use serde_json::{json, Value};

use super::{body_without, json_object, parse_id, ApiState};
use crate::errors::JsonApiError;

pub async fn list_reviews_of_place(
    State(api): State<ApiState>,
    Path(place_id): Path<String>,
) -> Result<Json<Vec<Entity>>, JsonApiError> {
    let id = parse_id(&place_id)?;
    api.storage.get(EntityKind::Place, id).await?.ok_or_else(JsonApiError::not_found)?;
    let reviews: Vec<Entity> = api
        .storage
        .all(Some(EntityKind::Review))
        .await?
        .into_values()
        .filter(|entity| matches!(entity, Entity::Review(r) if r.place_id == id))
        .collect();
    Ok(Json(reviews))
}

pub async fn get_review(
    State(api): State<ApiState>,
    Path(review_id): Path<String>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&review_id)?;
    let found = api.storage.get(EntityKind::Review, id).await?;
    found.map(Json).ok_or_else(JsonApiError::not_found)
}

pub async fn delete_review(
    State(api): State<ApiState>,
    Path(review_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let id = parse_id(&review_id)?;
    let found = api.storage.get(EntityKind::Review, id).await?.ok_or_else(JsonApiError::not_found)?;
    api.storage.delete(Some(&found)).await?;
    api.storage.save().await?;
    Ok((StatusCode::OK, Json(json!({}))))
}

pub async fn create_review(
    State(api): State<ApiState>,
    Path(place_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Entity>), JsonApiError> {
    let id = parse_id(&place_id)?;
    api.storage.get(EntityKind::Place, id).await?.ok_or_else(JsonApiError::not_found)?;

    let body = json_object(&body)?;
    let user_id = body
        .get("user_id")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonApiError::bad_request("Missing user_id"))?;
    let user_id = parse_id(user_id)?;
    api.storage.get(EntityKind::User, user_id).await?.ok_or_else(JsonApiError::not_found)?;
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonApiError::bad_request("Missing text"))?;

    let mut entity = Entity::Review(review::new(id, user_id, text)?);
    let extra = body_without(body, &["text", "user_id", "place_id"]);
    if !extra.is_empty() {
        entity.apply_update(&extra)?;
    }
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn update_review(
    State(api): State<ApiState>,
    Path(review_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Entity>, JsonApiError> {
    let id = parse_id(&review_id)?;
    let mut entity = api.storage.get(EntityKind::Review, id).await?.ok_or_else(JsonApiError::not_found)?;
    let body = json_object(&body)?;
    entity.apply_update(body)?;
    api.storage.new(entity.clone()).await?;
    api.storage.save().await?;
    Ok(Json(entity))
}
