use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

use service::storage::Storage;

use crate::errors::JsonApiError;

pub mod amenities;
pub mod cities;
pub mod index;
pub mod place_amenities;
pub mod places;
pub mod reviews;
pub mod states;
pub mod users;

/// Shared handler state: the storage facade selected at startup.
#[derive(Clone)]
pub struct ApiState {
    pub storage: Arc<dyn Storage>,
}

/// Route ids are opaque strings in the API; anything that does not parse as
/// a UUID cannot name a stored entity.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, JsonApiError> {
    Uuid::parse_str(raw).map_err(|_| JsonApiError::not_found())
}

pub(crate) fn json_object(
    body: &serde_json::Value,
) -> Result<&serde_json::Map<String, serde_json::Value>, JsonApiError> {
    body.as_object().ok_or_else(|| JsonApiError::bad_request("Not a JSON"))
}

/// Copy of `body` without the keys a create handler consumed itself; what
/// remains goes through the entity's mutable-field allow-list.
pub(crate) fn body_without(
    body: &serde_json::Map<String, serde_json::Value>,
    consumed: &[&str],
) -> serde_json::Map<String, serde_json::Value> {
    body.iter()
        .filter(|(key, _)| !consumed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Build the full application router for the REST surface under `/api/v1`.
pub fn build_router(cors: CorsLayer, state: ApiState) -> Router {
    let api = Router::new()
        .route("/api/v1/status", get(index::status))
        .route("/api/v1/stats", get(index::stats))
        .route("/api/v1/states", get(states::list_states).post(states::create_state))
        .route(
            "/api/v1/states/:state_id",
            get(states::get_state).delete(states::delete_state).put(states::update_state),
        )
        .route(
            "/api/v1/states/:state_id/cities",
            get(cities::list_cities_in_state).post(cities::create_city),
        )
        .route(
            "/api/v1/cities/:city_id",
            get(cities::get_city).delete(cities::delete_city).put(cities::update_city),
        )
        .route("/api/v1/amenities", get(amenities::list_amenities).post(amenities::create_amenity))
        .route(
            "/api/v1/amenities/:amenity_id",
            get(amenities::get_amenity).delete(amenities::delete_amenity).put(amenities::update_amenity),
        )
        .route("/api/v1/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/v1/users/:user_id",
            get(users::get_user).delete(users::delete_user).put(users::update_user),
        )
        .route(
            "/api/v1/cities/:city_id/places",
            get(places::list_places_in_city).post(places::create_place),
        )
        .route(
            "/api/v1/places/:place_id",
            get(places::get_place).delete(places::delete_place).put(places::update_place),
        )
        .route(
            "/api/v1/places/:place_id/reviews",
            get(reviews::list_reviews_of_place).post(reviews::create_review),
        )
        .route(
            "/api/v1/reviews/:review_id",
            get(reviews::get_review).delete(reviews::delete_review).put(reviews::update_review),
        )
        .route(
            "/api/v1/places/:place_id/amenities",
            get(place_amenities::list_amenities_of_place),
        )
        .route(
            "/api/v1/places/:place_id/amenities/:amenity_id",
            post(place_amenities::link_amenity).delete(place_amenities::unlink_amenity),
        );

    api.with_state(state).layer(cors).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
            .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
    )
}
