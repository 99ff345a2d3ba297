use axum::extract::State;
use axum::Json;
use common::types::Status;
use models::EntityKind;
use serde_json::{Map, Value};

use super::ApiState;
use crate::errors::JsonApiError;

/// Liveness probe for the API.
pub async fn status() -> Json<Status> {
    Json(Status { status: "OK" })
}

/// Object counts per entity kind.
pub async fn stats(State(api): State<ApiState>) -> Result<Json<Value>, JsonApiError> {
    let mut stats = Map::new();
    for kind in EntityKind::ALL {
        let count = api.storage.count(Some(kind)).await?;
        stats.insert(kind.stat_key().to_string(), Value::from(count));
    }
    Ok(Json(Value::Object(stats)))
}
