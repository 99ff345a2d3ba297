use std::thread::sleep;
use std::time::Duration;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::{city, place, review, state, user, Entity};

fn body(value: Value) -> Map<String, Value> {
    value.as_object().expect("test body is an object").clone()
}

#[test]
fn state_requires_name() {
    assert!(matches!(state::new(""), Err(ModelError::Validation(_))));
    assert!(matches!(state::new("   "), Err(ModelError::Validation(_))));
    assert!(state::new("California").is_ok());
}

#[test]
fn user_requires_email_and_password() {
    assert!(matches!(user::new("not-an-email", "pwd"), Err(ModelError::Validation(_))));
    assert!(matches!(user::new("bob@example.com", ""), Err(ModelError::Validation(_))));
    let u = user::new("bob@example.com", "pwd").expect("valid user");
    assert!(u.first_name.is_none());
}

#[test]
fn review_requires_text() {
    let place_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    assert!(matches!(review::new(place_id, user_id, "  "), Err(ModelError::Validation(_))));
    assert!(review::new(place_id, user_id, "great stay").is_ok());
}

#[test]
fn timestamps_start_equal() {
    let s = state::new("Nevada").expect("state");
    assert_eq!(s.created_at, s.updated_at);
}

#[test]
fn update_refreshes_updated_at() {
    let mut entity = Entity::State(state::new("California").expect("state"));
    let before = entity.updated_at();
    sleep(Duration::from_millis(2));
    entity.apply_update(&body(json!({"name": "CA"}))).expect("update");
    assert!(entity.updated_at() > before);
    assert!(entity.created_at() < entity.updated_at());
    match &entity {
        Entity::State(m) => assert_eq!(m.name, "CA"),
        other => panic!("unexpected entity {other:?}"),
    }
}

#[test]
fn immutable_keys_are_rejected() {
    let mut st = Entity::State(state::new("California").expect("state"));
    assert!(st.apply_update(&body(json!({"id": Uuid::new_v4()}))).is_err());
    assert!(st.apply_update(&body(json!({"created_at": "2020-01-01T00:00:00+00:00"}))).is_err());

    let mut c = Entity::City(city::new(Uuid::new_v4(), "Fresno").expect("city"));
    assert!(c.apply_update(&body(json!({"state_id": Uuid::new_v4()}))).is_err());

    let mut u = Entity::User(user::new("bob@example.com", "pwd").expect("user"));
    assert!(u.apply_update(&body(json!({"email": "eve@example.com"}))).is_err());
}

#[test]
fn unknown_keys_are_rejected_before_assignment() {
    let mut entity = Entity::State(state::new("California").expect("state"));
    let before = entity.updated_at();
    let err = entity.apply_update(&body(json!({"nickname": "Cali"})));
    assert!(matches!(err, Err(ModelError::Validation(_))));
    // a rejected update leaves the timestamp alone
    assert_eq!(entity.updated_at(), before);
}

#[test]
fn place_numeric_fields_coerce_and_validate() {
    let mut p = Entity::Place(place::new(Uuid::new_v4(), Uuid::new_v4(), "Loft").expect("place"));
    p.apply_update(&body(json!({
        "number_rooms": 3,
        "price_by_night": 120,
        "latitude": 37.77,
        "description": "sunny"
    })))
    .expect("valid update");
    match &p {
        Entity::Place(m) => {
            assert_eq!(m.number_rooms, 3);
            assert_eq!(m.price_by_night, 120);
            assert_eq!(m.latitude, Some(37.77));
            assert_eq!(m.description.as_deref(), Some("sunny"));
        }
        other => panic!("unexpected entity {other:?}"),
    }

    assert!(p.apply_update(&body(json!({"number_rooms": "three"}))).is_err());
    assert!(p.apply_update(&body(json!({"latitude": "north"}))).is_err());

    // null clears optional fields
    p.apply_update(&body(json!({"description": null}))).expect("clear");
    match &p {
        Entity::Place(m) => assert!(m.description.is_none()),
        other => panic!("unexpected entity {other:?}"),
    }
}
