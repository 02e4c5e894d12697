//! Statements issued by entity handlers and repositories.

mod common;

use common::{row, City, MemoryConnection, Person, Tag};
use quarry_orm::{
    EntityRegistry, FetchMode, FieldValue, HydrationError, OrderColumns, OrmError, PageRequest,
    PaginationConfig, Reference, RelationHandle, SaveOptions,
};
use quarry_sql_core::builder::Filtered;
use quarry_sql_core::SqlValue;

fn person_row(id: i64, name: &str, city: Option<i64>) -> quarry_orm::Row {
    row([
        ("id", SqlValue::Int(id)),
        ("full_name", SqlValue::Text(name.into())),
        ("password", SqlValue::Text("secret".into())),
        ("email", SqlValue::Null),
        ("active", SqlValue::Int(1)),
        ("home_city_id", city.map_or(SqlValue::Null, SqlValue::Int)),
    ])
}

#[test]
fn test_insert_writes_row_and_relations() {
    let registry = EntityRegistry::new();
    let people = registry.repository::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();
    conn.next_id(7);

    let mut alice = Person::new("alice");
    alice.home_city = Some(Reference::Id(4));
    alice.tags = RelationHandle::new([2, 3]);
    let id = people.save(&mut conn, &mut alice, &SaveOptions::default()).unwrap();

    assert_eq!(id, 7);
    assert_eq!(alice.id, Some(7));
    let sql = conn.sql();
    assert_eq!(
        sql[0],
        "INSERT INTO `Person` (`full_name`, `password`, `email`, `active`, `home_city_id`) VALUES (?, ?, ?, ?, ?)"
    );
    assert_eq!(
        conn.executed[0].params,
        vec![
            SqlValue::Text("alice".into()),
            SqlValue::Text("secret".into()),
            SqlValue::Null,
            SqlValue::Bool(true),
            SqlValue::Int(4),
        ]
    );
    assert!(sql[1].starts_with(
        "INSERT INTO `NM_Person_Tag` (`person_id`, `tag_id`) VALUES (?, ?), (?, ?) ON DUPLICATE KEY UPDATE"
    ));
    assert_eq!(
        conn.executed[1].params,
        vec![SqlValue::Int(7), SqlValue::Int(2), SqlValue::Int(7), SqlValue::Int(3)]
    );
}

#[test]
fn test_insert_reads_returned_key_on_postgres() {
    let registry = EntityRegistry::new();
    let tags = registry.repository::<Tag>().unwrap();
    let mut conn = MemoryConnection::postgres();
    conn.next_id(12);

    let mut tag = Tag {
        id: None,
        label: String::from("rust"),
    };
    assert_eq!(tags.save(&mut conn, &mut tag, &SaveOptions::default()).unwrap(), 12);
    assert_eq!(
        conn.sql(),
        [r#"INSERT INTO "Tag" ("label") VALUES ($1) RETURNING "id""#]
    );
}

#[test]
fn test_find_hydrates_typed_entity() {
    let registry = EntityRegistry::new();
    let people = registry.repository::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();
    conn.respond(vec![person_row(7, "alice", Some(4))]);

    let alice = people.find(&mut conn, 7).unwrap().unwrap();
    assert_eq!(alice.id, Some(7));
    assert_eq!(alice.full_name, "alice");
    assert!(alice.active);
    assert_eq!(alice.email, None);
    assert_eq!(alice.home_city, Some(Reference::Id(4)));
    assert!(alice.tags.is_empty());
    assert_eq!(alice.session, None);
    assert_eq!(
        conn.sql(),
        ["SELECT `Person`.`id`, `Person`.`full_name`, `Person`.`password`, `Person`.`email`, \
          `Person`.`active`, `Person`.`home_city_id` FROM `Person` WHERE `Person`.`id` = ? LIMIT 1"]
    );
}

#[test]
fn test_get_reports_missing_record() {
    let registry = EntityRegistry::new();
    let people = registry.repository::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();
    assert!(matches!(
        people.get(&mut conn, 99),
        Err(OrmError::NotFound { id: 99, .. })
    ));
}

#[test]
fn test_update_synchronizes_relations() {
    let registry = EntityRegistry::new();
    let people = registry.repository::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();

    let mut alice = Person::new("alice");
    alice.id = Some(7);
    alice.tags = RelationHandle::new([3]);
    people
        .save(&mut conn, &mut alice, &SaveOptions::default().with_relations())
        .unwrap();

    let sql = conn.sql();
    assert_eq!(
        sql[0],
        "UPDATE `Person` SET `full_name` = ?, `password` = ?, `email` = ?, `active` = ?, `home_city_id` = ? WHERE `id` = ?"
    );
    assert!(sql[1].starts_with("DELETE FROM `NM_Person_Tag` WHERE `person_id` = ? AND `tag_id` NOT IN"));
    assert!(sql[2].starts_with("INSERT INTO `NM_Person_Tag`"));
}

#[test]
fn test_update_of_selected_fields() {
    let registry = EntityRegistry::new();
    let people = registry.repository::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();

    let mut alice = Person::new("alice");
    alice.id = Some(7);
    alice.tags = RelationHandle::new([3]);
    people
        .save(&mut conn, &mut alice, &SaveOptions::default().fields(["active"]))
        .unwrap();
    assert_eq!(conn.sql(), ["UPDATE `Person` SET `active` = ? WHERE `id` = ?"]);
}

#[test]
fn test_delete() {
    let registry = EntityRegistry::new();
    let people = registry.repository::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();

    let mut alice = Person::new("alice");
    assert!(matches!(
        people.delete(&mut conn, &alice),
        Err(OrmError::MissingId { .. })
    ));
    alice.id = Some(7);
    assert!(people.delete(&mut conn, &alice).unwrap());
    assert_eq!(conn.sql(), ["DELETE FROM `Person` WHERE `id` = ?"]);
}

#[test]
fn test_count_and_exists() {
    let registry = EntityRegistry::new();
    let people = registry.repository::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();
    conn.respond(vec![row([("count", SqlValue::Int(3))])]);
    conn.respond(vec![row([("count", SqlValue::Int(0))])]);

    assert_eq!(people.count(&mut conn, None).unwrap(), 3);
    assert!(!people.exists(&mut conn, 8).unwrap());
    let sql = conn.sql();
    assert_eq!(sql[0], "SELECT COUNT(*) AS `count` FROM `Person`");
    assert_eq!(
        sql[1],
        "SELECT COUNT(*) AS `count` FROM `Person` WHERE `Person`.`id` = ?"
    );
}

#[test]
fn test_find_many_keeps_requested_order() {
    let registry = EntityRegistry::new();
    let people = registry.repository::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();
    conn.respond(vec![person_row(1, "alice", None), person_row(2, "bob", None)]);

    let found = people.find_many(&mut conn, &[2, 5, 1]).unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.full_name.as_str()).collect();
    assert_eq!(names, ["bob", "alice"]);
    assert!(conn.sql()[0].ends_with("WHERE `Person`.`id` IN (?, ?, ?)"));
    assert!(people.find_many(&mut conn, &[]).unwrap().is_empty());
    assert_eq!(conn.executed.len(), 1);
}

#[test]
fn test_direct_fetch_loads_references_and_relations() {
    let registry = EntityRegistry::new();
    let handler = registry.handler::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();
    let mut joined = person_row(7, "alice", Some(4)).iter().map(|(c, v)| (c.to_owned(), v.clone())).collect::<Vec<_>>();
    joined.push((String::from("home_city_name"), SqlValue::Text("Lyon".into())));
    conn.respond(vec![joined.into_iter().collect()]);
    conn.respond(vec![row([("person_id", SqlValue::Int(7)), ("tag_id", SqlValue::Int(2))])]);

    let query = handler.create_builder(FetchMode::Direct).unwrap();
    let records = handler.fetch(&mut conn, &query, None).unwrap();

    assert_eq!(records.len(), 1);
    let Some(FieldValue::Reference(city)) = records[0].get("homeCity") else {
        panic!("home city was not loaded");
    };
    assert_eq!(city.id(), Some(4));
    assert_eq!(
        city.get("name"),
        Some(&FieldValue::Scalar(SqlValue::Text("Lyon".into())))
    );
    assert!(!city.is_set("country"));
    assert_eq!(records[0].relation("tags").unwrap().ids(), [2]);
    assert_eq!(
        conn.sql()[1],
        "SELECT `person_id`, `tag_id` FROM `NM_Person_Tag` WHERE `person_id` IN (?)"
    );
}

#[test]
fn test_find_page() {
    let registry = EntityRegistry::new();
    let handler = registry.handler::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();
    conn.respond(vec![row([("count", SqlValue::Int(95))])]);
    conn.respond(vec![person_row(81, "zoe", None)]);

    let page = PageRequest {
        page: Some(6),
        count: Some(20),
        order_by: Some(String::from("full_name")),
        sort_order: Some(String::from("desc")),
    }
    .validate(&PaginationConfig::default(), &OrderColumns::new().allow("full_name"))
    .unwrap();
    let query = handler
        .create_builder(FetchMode::None)
        .unwrap()
        .where_eq("Person.active", true);
    let result = handler.find_page(&mut conn, query, &page).unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.pagination.current, 5);
    assert_eq!(result.pagination.page_count, 5);
    assert_eq!(result.pagination.total, 95);
    let sql = conn.sql();
    assert_eq!(
        sql[0],
        "SELECT COUNT(*) AS `count` FROM `Person` WHERE `Person`.`active` = ?"
    );
    assert!(sql[1].ends_with("ORDER BY `Person`.`full_name` DESC LIMIT 20 OFFSET 80"));
}

#[test]
fn test_execution_errors_carry_statement_shape() {
    let registry = EntityRegistry::new();
    let cities = registry.repository::<City>().unwrap();
    let mut conn = MemoryConnection::mysql();
    conn.fail_on("DELETE");

    let Err(OrmError::Execution(error)) = cities.handler().delete(&mut conn, 1) else {
        panic!("delete should fail");
    };
    assert!(error.to_string().contains("DELETE FROM `City`"));
    assert_eq!(quarry_orm::Connection::last_error(&conn), Some("scripted failure"));
}

#[derive(Debug, Clone, PartialEq, quarry_orm::Entity)]
struct Preference {
    id: Option<i64>,
    enabled: bool,
    settings: serde_json::Value,
}

fn preference_row(enabled: SqlValue, settings: SqlValue) -> quarry_orm::Row {
    row([("id", SqlValue::Int(1)), ("enabled", enabled), ("settings", settings)])
}

#[test]
fn test_row_without_selected_column() {
    let registry = EntityRegistry::new();
    let people = registry.repository::<Person>().unwrap();
    let mut conn = MemoryConnection::mysql();
    conn.respond(vec![row([
        ("id", SqlValue::Int(7)),
        ("full_name", SqlValue::Text("alice".into())),
        ("email", SqlValue::Null),
        ("active", SqlValue::Int(1)),
        ("home_city_id", SqlValue::Null),
    ])]);

    let error = people.find(&mut conn, 7).unwrap_err();
    match &error {
        OrmError::Hydration(HydrationError::MissingColumn { entity, column }) => {
            assert_eq!(entity, "Person");
            assert_eq!(column, "password");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        error.to_string(),
        "entity 'Person': column 'password' missing from row"
    );
}

#[test]
fn test_bool_and_json_columns_reject_foreign_values() {
    let registry = EntityRegistry::new();
    let preferences = registry.repository::<Preference>().unwrap();
    let mut conn = MemoryConnection::postgres();
    conn.respond(vec![preference_row(
        SqlValue::Text("maybe".into()),
        SqlValue::Text("{}".into()),
    )])
    .respond(vec![preference_row(SqlValue::Bool(true), SqlValue::Int(3))])
    .respond(vec![preference_row(
        SqlValue::Int(0),
        SqlValue::Text("{not json".into()),
    )])
    .respond(vec![preference_row(
        SqlValue::Text("t".into()),
        SqlValue::Text(r#"{"theme": "dark"}"#.into()),
    )]);

    assert!(matches!(
        preferences.find(&mut conn, 1),
        Err(OrmError::Hydration(HydrationError::TypeMismatch {
            ref column,
            expected: "bool",
            ref found,
            ..
        })) if column == "enabled" && found == "text"
    ));
    assert!(matches!(
        preferences.find(&mut conn, 1),
        Err(OrmError::Hydration(HydrationError::TypeMismatch {
            ref column,
            expected: "json",
            ref found,
            ..
        })) if column == "settings" && found == "int"
    ));
    assert!(matches!(
        preferences.find(&mut conn, 1),
        Err(OrmError::Hydration(HydrationError::Unparsable { ref entity, ref column, .. }))
            if entity == "Preference" && column == "settings"
    ));

    let preference = preferences.find(&mut conn, 1).unwrap().unwrap();
    assert!(preference.enabled);
    assert_eq!(preference.settings, serde_json::json!({"theme": "dark"}));
}
