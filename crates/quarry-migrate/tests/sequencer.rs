mod common;

use common::RecordingConnection;
use quarry_migrate::{
    EntityLogPatch, Ledger, LoggedTable, MemoryLedger, MigrateError, PatchStatus, Sequencer,
    StatementError, StatementPatch, TableLedger,
};
use quarry_orm::{EntityLogConfig, EntityRegistry, Row};
use quarry_sql_core::{ColumnDefinition, CreateTable, SqlValue};

fn tag_table() -> CreateTable {
    CreateTable::new("Tag")
        .serial_primary_key("id")
        .column(ColumnDefinition::string("label", Some(32)))
}

fn sequencer() -> Sequencer {
    Sequencer::new()
        .with(StatementPatch::new("0001_tag").statement(tag_table()))
        .unwrap()
        .with(
            StatementPatch::new("0002_seed")
                .raw("INSERT INTO `Tag` (`label`) VALUES ('rust')")
                .raw("INSERT INTO `Tag` (`label`) VALUES ('sql')"),
        )
        .unwrap()
}

#[test]
fn test_apply_runs_patches_in_order() {
    let mut conn = RecordingConnection::mysql();
    let mut ledger = MemoryLedger::new();

    let report = sequencer().apply(&mut conn, &mut ledger).unwrap();

    assert_eq!(report.applied, ["0001_tag", "0002_seed"]);
    assert!(report.skipped.is_empty());
    assert_eq!(
        conn.sql(),
        [
            "CREATE TABLE `Tag` (`id` INTEGER AUTO_INCREMENT NOT NULL, `label` VARCHAR(32) NOT NULL, CONSTRAINT `pk_Tag` PRIMARY KEY (`id`))",
            "INSERT INTO `Tag` (`label`) VALUES ('rust')",
            "INSERT INTO `Tag` (`label`) VALUES ('sql')",
        ]
    );
    assert_eq!(ledger.names(), ["0001_tag", "0002_seed"]);
}

#[test]
fn test_applied_patches_are_skipped() {
    let mut conn = RecordingConnection::mysql();
    let mut ledger = MemoryLedger::with_applied(["0001_tag"]);

    let report = sequencer().apply(&mut conn, &mut ledger).unwrap();

    assert_eq!(report.applied, ["0002_seed"]);
    assert_eq!(report.skipped, ["0001_tag"]);
    assert_eq!(conn.executed.len(), 2);

    let again = sequencer().apply(&mut conn, &mut ledger).unwrap();
    assert!(again.applied.is_empty());
    assert_eq!(conn.executed.len(), 2);
}

#[test]
fn test_failure_reports_patch_and_statement() {
    let mut conn = RecordingConnection::mysql();
    conn.fail_on("'sql'");
    let mut ledger = MemoryLedger::new();

    let error = sequencer().apply(&mut conn, &mut ledger).unwrap_err();

    match &error {
        MigrateError::Patch {
            patch,
            index,
            source: StatementError::Execution(execution),
        } => {
            assert_eq!(patch, "0002_seed");
            assert_eq!(*index, 1);
            assert_eq!(execution.shape, "RAW");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        error.to_string(),
        "Patch '0002_seed' failed at statement 1: RAW: relation already exists"
    );
    // The failing patch is not recorded, the one before it is.
    assert_eq!(ledger.names(), ["0001_tag"]);
}

#[test]
fn test_duplicate_names_are_rejected() {
    let result = sequencer().with(StatementPatch::new("0002_seed"));
    assert!(matches!(result, Err(MigrateError::DuplicatePatch(name)) if name == "0002_seed"));
}

#[test]
fn test_status_and_pending() {
    let mut conn = RecordingConnection::mysql();
    let mut ledger = MemoryLedger::with_applied(["0001_tag"]);
    let sequencer = sequencer();

    let status = sequencer.status(&mut conn, &mut ledger).unwrap();
    assert_eq!(
        status,
        vec![
            (String::from("0001_tag"), PatchStatus::Applied(None)),
            (String::from("0002_seed"), PatchStatus::Pending),
        ]
    );
    assert_eq!(sequencer.pending(&mut conn, &mut ledger).unwrap(), ["0002_seed"]);
    assert!(conn.executed.is_empty());
}

#[test]
fn test_table_ledger_statements() {
    let mut conn = RecordingConnection::mysql();
    conn.respond(vec![Row::from_pairs([
        ("name", SqlValue::Text(String::from("0001_tag"))),
        ("applied_at", SqlValue::Text(String::from("2024-05-02 08:00:00"))),
    ])]);
    let mut ledger = TableLedger::new();

    let report = sequencer().apply(&mut conn, &mut ledger).unwrap();

    assert_eq!(report.skipped, ["0001_tag"]);
    assert_eq!(
        conn.sql(),
        [
            "CREATE TABLE IF NOT EXISTS `quarry_patches` (`id` INTEGER AUTO_INCREMENT NOT NULL, `name` VARCHAR(128) NOT NULL, `applied_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, CONSTRAINT `pk_quarry_patches` PRIMARY KEY (`id`), UNIQUE (`name`))",
            "SELECT `name`, `applied_at` FROM `quarry_patches` ORDER BY `id` ASC",
            "INSERT INTO `Tag` (`label`) VALUES ('rust')",
            "INSERT INTO `Tag` (`label`) VALUES ('sql')",
            "INSERT INTO `quarry_patches` (`name`) VALUES (?)",
        ]
    );
    let record = conn.executed.last().unwrap();
    assert_eq!(record.params, vec![SqlValue::Text(String::from("0002_seed"))]);
}

#[test]
fn test_ledger_read_failure() {
    let mut conn = RecordingConnection::postgres();
    conn.fail_on("SELECT");
    let error = TableLedger::new().applied(&mut conn).unwrap_err();
    assert!(matches!(error, MigrateError::Ledger(StatementError::Execution(_))));
}

#[test]
fn test_entity_log_patch_on_postgres() {
    let mut conn = RecordingConnection::postgres();
    let mut ledger = MemoryLedger::new();
    let sequencer = Sequencer::new()
        .with(EntityLogPatch::new().table(LoggedTable::new(
            "User",
            EntityLogConfig {
                delete: true,
                ..EntityLogConfig::default()
            },
        )))
        .unwrap();

    let report = sequencer.apply(&mut conn, &mut ledger).unwrap();

    assert_eq!(report.applied, [EntityLogPatch::NAME]);
    let shapes: Vec<&str> = conn.executed.iter().map(|query| query.shape.as_str()).collect();
    assert_eq!(
        shapes,
        [
            r#"CREATE TABLE "EntityLog""#,
            r#"CREATE PROCEDURE "InsertEntityLog""#,
            r#"CREATE PROCEDURE "UpdateEntityLog""#,
            r#"CREATE PROCEDURE "DeleteEntityLog""#,
            r#"CREATE TRIGGER "User_trg_delete""#,
        ]
    );
}

#[derive(Debug, quarry_orm::Entity)]
#[entity(log(delete))]
struct Invoice {
    id: Option<i64>,
    #[entity(max_length = 32)]
    number: String,
}

#[test]
fn test_schema_of_logged_entity_creates_procedures_first() {
    let registry = EntityRegistry::new();
    registry.register::<Invoice>().unwrap();
    let mut conn = RecordingConnection::postgres();
    let mut ledger = MemoryLedger::new();
    let sequencer = Sequencer::new()
        .with(StatementPatch::schema("0001_schema", &registry).unwrap())
        .unwrap();

    sequencer.apply(&mut conn, &mut ledger).unwrap();

    let shapes: Vec<&str> = conn.executed.iter().map(|query| query.shape.as_str()).collect();
    assert_eq!(
        shapes,
        [
            r#"CREATE TABLE "EntityLog""#,
            r#"CREATE PROCEDURE "InsertEntityLog""#,
            r#"CREATE PROCEDURE "UpdateEntityLog""#,
            r#"CREATE PROCEDURE "DeleteEntityLog""#,
            r#"CREATE TABLE "Invoice""#,
            r#"CREATE TRIGGER "Invoice_trg_delete""#,
        ]
    );
}
