//! JSON output filtered by viewer groups and projections.

mod common;

use common::Person;
use quarry_orm::{
    EntityRecord, EntityRegistry, FieldValue, Projection, RelationHandle, Viewer, Visibility,
};
use quarry_sql_core::SqlValue;
use serde_json::json;

fn alice() -> EntityRecord {
    let city = EntityRecord::new("City")
        .with_id(4)
        .with("name", SqlValue::Text("Lyon".into()));
    EntityRecord::new("Person")
        .with_id(7)
        .with("fullName", SqlValue::Text("alice".into()))
        .with("password", SqlValue::Text("secret".into()))
        .with("email", SqlValue::Text("alice@example.com".into()))
        .with("active", SqlValue::Bool(true))
        .with("homeCity", FieldValue::Reference(Box::new(city)))
        .with("tags", RelationHandle::new([2, 3]))
}

#[test]
fn test_hidden_and_grouped_fields() {
    let registry = EntityRegistry::new();
    let handler = registry.handler::<Person>().unwrap();

    let anonymous = handler.serialize(&alice(), None, None).unwrap();
    assert_eq!(
        anonymous,
        json!({
            "id": 7,
            "fullName": "alice",
            "active": true,
            "homeCity": {"id": 4, "name": "Lyon"},
            "tags": [2, 3],
        })
    );

    let admin = Viewer::new(["admin"]);
    let visible = handler.serialize(&alice(), Some(&admin), None).unwrap();
    assert_eq!(visible["email"], json!("alice@example.com"));
    assert!(visible.get("password").is_none());

    let guest = Viewer::new(["guest"]);
    let visible = handler.serialize(&alice(), Some(&guest), None).unwrap();
    assert!(visible.get("email").is_none());
}

#[test]
fn test_projection_limits_output() {
    let registry = EntityRegistry::new();
    let handler = registry.handler::<Person>().unwrap();
    let projection = Projection::of(["fullName", "password"])
        .nested("homeCity", Projection::of(["name"]));

    let value = handler.serialize(&alice(), None, Some(&projection)).unwrap();
    assert_eq!(
        value,
        json!({"id": 7, "fullName": "alice", "homeCity": {"id": 4, "name": "Lyon"}})
    );
}

#[test]
fn test_extra_values_are_merged() {
    let registry = EntityRegistry::new();
    let handler = registry.handler::<Person>().unwrap();
    let mut record = EntityRecord::new("Person").with_id(1);
    record.set_extra("memberCount", json!(12));

    let value = handler.serialize(&record, None, None).unwrap();
    assert_eq!(value, json!({"id": 1, "memberCount": 12}));

    let projection = Projection::of(["fullName"]);
    let value = handler.serialize(&record, None, Some(&projection)).unwrap();
    assert_eq!(value, json!({"id": 1}));
}

#[derive(Debug, Clone, PartialEq, quarry_orm::Entity)]
struct Notice {
    id: Option<i64>,
    #[entity(visible_to())]
    body: String,
}

#[test]
fn test_empty_group_list_admits_everyone() {
    assert!(Visibility::ByGroup(Vec::new()).admits(None));

    let registry = EntityRegistry::new();
    let handler = registry.handler::<Notice>().unwrap();
    let record = EntityRecord::new("Notice")
        .with_id(3)
        .with("body", SqlValue::Text("closed on monday".into()));

    let anonymous = handler.serialize(&record, None, None).unwrap();
    assert_eq!(anonymous, json!({"id": 3, "body": "closed on monday"}));

    let guest = Viewer::new(["guest"]);
    let visible = handler.serialize(&record, Some(&guest), None).unwrap();
    assert_eq!(visible["body"], json!("closed on monday"));
}
