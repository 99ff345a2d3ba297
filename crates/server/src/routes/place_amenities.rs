use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use models::{Entity, EntityKind};
use serde_json::{json, Value};
use service::storage::LinkOutcome;

use super::{parse_id, ApiState};
use crate::errors::JsonApiError;

pub async fn list_amenities_of_place(
    State(api): State<ApiState>,
    Path(place_id): Path<String>,
) -> Result<Json<Vec<Entity>>, JsonApiError> {
    let id = parse_id(&place_id)?;
    // an unknown place surfaces as a NotFound storage error
    Ok(Json(api.storage.amenities_of(id).await?))
}

pub async fn link_amenity(
    State(api): State<ApiState>,
    Path((place_id, amenity_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Entity>), JsonApiError> {
    let place_id = parse_id(&place_id)?;
    let amenity_id = parse_id(&amenity_id)?;
    let amenity = api
        .storage
        .get(EntityKind::Amenity, amenity_id)
        .await?
        .ok_or_else(JsonApiError::not_found)?;

    match api.storage.link_amenity(place_id, amenity_id).await? {
        // re-linking is a no-op that still succeeds
        LinkOutcome::AlreadyLinked => Ok((StatusCode::OK, Json(amenity))),
        LinkOutcome::Linked => {
            api.storage.save().await?;
            Ok((StatusCode::CREATED, Json(amenity)))
        }
    }
}

pub async fn unlink_amenity(
    State(api): State<ApiState>,
    Path((place_id, amenity_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Value>), JsonApiError> {
    let place_id = parse_id(&place_id)?;
    let amenity_id = parse_id(&amenity_id)?;
    api.storage.get(EntityKind::Amenity, amenity_id).await?.ok_or_else(JsonApiError::not_found)?;

    let removed = api.storage.unlink_amenity(place_id, amenity_id).await?;
    if !removed {
        return Err(JsonApiError::not_found());
    }
    api.storage.save().await?;
    Ok((StatusCode::OK, Json(json!({}))))
}
