use std::io::Write;

use quarry_migrate::{MigrateConfig, MigrateError, Patch};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_config_file() {
    let file = write_config(
        r#"{
            "entityLog": [
                { "table": "User", "insert": true, "update": true, "delete": true },
                { "table": "Order", "delete": true, "lifetime": 30 }
            ]
        }"#,
    );

    let config = MigrateConfig::load(file.path()).unwrap();

    assert_eq!(config.entity_log.len(), 2);
    assert_eq!(config.entity_log[1].table, "Order");
    assert_eq!(config.entity_log[1].config.lifetime(), 30);
    assert_eq!(config.entity_log[0].config.lifetime(), 90);

    let patch = config.entity_log_patch();
    assert_eq!(patch.name(), "entity_log");
    // log table, three procedures, three triggers for User and one for Order
    assert_eq!(patch.statements().unwrap().len(), 8);
}

#[test]
fn test_invalid_config_names_the_file() {
    let file = write_config(r#"{ "entityLog": [{ "insert": true }] }"#);

    let error = MigrateConfig::load(file.path()).unwrap_err();

    match &error {
        MigrateError::Config { path, .. } => assert_eq!(path, file.path()),
        other => panic!("unexpected error: {other}"),
    }
    assert!(error.to_string().contains("missing field `table`"));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let error = MigrateConfig::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(error, MigrateError::Io(_)));
}
