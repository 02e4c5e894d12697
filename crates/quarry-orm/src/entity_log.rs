//! Audit trail of entity modifications.
//!
//! Tables with an entity log get AFTER triggers that record, per row, when
//! it was last inserted, updated or deleted in the `EntityLog` table. The
//! `lifetime` column tells a cleanup job how many days an entry is kept.

use quarry_sql_core::ast::{col, Expression};
use quarry_sql_core::builder::{
    CreateProcedure, CreateTable, CreateTrigger, Delete, Filtered, Insert, TriggerEvent,
    TriggerTiming, Update,
};
use quarry_sql_core::{ColumnDefinition, DefaultValue};
use serde::{Deserialize, Serialize};

pub const LOG_TABLE: &str = "EntityLog";
pub const INSERT_PROCEDURE: &str = "InsertEntityLog";
pub const UPDATE_PROCEDURE: &str = "UpdateEntityLog";
pub const DELETE_PROCEDURE: &str = "DeleteEntityLog";

/// Days an entry is kept when the table does not configure a lifetime.
pub const DEFAULT_LIFETIME: u32 = 90;

/// Which modifications of a table are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityLogConfig {
    pub insert: bool,
    pub update: bool,
    pub delete: bool,
    pub lifetime: Option<u32>,
}

impl EntityLogConfig {
    /// Logs every modification.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            insert: true,
            update: true,
            delete: true,
            lifetime: None,
        }
    }

    #[must_use]
    pub const fn with_lifetime(mut self, days: u32) -> Self {
        self.lifetime = Some(days);
        self
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.insert || self.update || self.delete
    }

    #[must_use]
    pub fn lifetime(&self) -> u32 {
        self.lifetime.unwrap_or(DEFAULT_LIFETIME)
    }
}

/// The `EntityLog` table.
#[must_use]
pub fn log_table() -> CreateTable {
    CreateTable::new(LOG_TABLE)
        .if_not_exists()
        .column(ColumnDefinition::int("entityId"))
        .column(ColumnDefinition::string("tableName", Some(64)))
        .column(ColumnDefinition::datetime("modified").default(DefaultValue::CurrentTimestamp))
        .column(ColumnDefinition::int("lifetime").default(DefaultValue::Integer(i64::from(
            DEFAULT_LIFETIME,
        ))))
        .unique(["entityId", "tableName"])
}

fn logged_row() -> [quarry_sql_core::Condition; 2] {
    [
        col("entityId").eq(Expression::current_column("id")),
        col("tableName").eq(Expression::CurrentTable),
    ]
}

/// The three procedures the triggers call.
#[must_use]
pub fn procedures() -> Vec<CreateProcedure> {
    let [same_entity, same_table] = logged_row();
    let insert = CreateProcedure::new(INSERT_PROCEDURE)
        .current_table_param()
        .row_column(ColumnDefinition::int("id"))
        .argument(ColumnDefinition::int("lifetime"))
        .returns_trigger()
        .statement(
            Insert::into(LOG_TABLE)
                .set("entityId", Expression::current_column("id"))
                .set("tableName", Expression::CurrentTable)
                .set("lifetime", Expression::current_column("lifetime"))
                .on_conflict(
                    quarry_sql_core::ast::UpdateStrategy::on(["entityId", "tableName"])
                        .set("modified", Expression::CurrentTimestamp)
                        .set_from_insert("lifetime"),
                ),
        );

    let update = CreateProcedure::new(UPDATE_PROCEDURE)
        .current_table_param()
        .row_column(ColumnDefinition::int("id"))
        .returns_trigger()
        .statement(
            Update::table(LOG_TABLE)
                .set("modified", Expression::CurrentTimestamp)
                .filter(same_entity)
                .filter(same_table),
        );

    let [same_entity, same_table] = logged_row();
    let delete = CreateProcedure::new(DELETE_PROCEDURE)
        .current_table_param()
        .row_column(ColumnDefinition::int("id"))
        .returns_trigger()
        .statement(Delete::from(LOG_TABLE).filter(same_entity).filter(same_table));

    vec![insert, update, delete]
}

/// Name of the trigger logging `event` on `table`.
#[must_use]
pub fn trigger_name(table: &str, event: TriggerEvent) -> String {
    let suffix = match event {
        TriggerEvent::Insert => "insert",
        TriggerEvent::Update => "update",
        TriggerEvent::Delete => "delete",
    };
    format!("{table}_trg_{suffix}")
}

/// The triggers `config` enables on `table`.
#[must_use]
pub fn triggers(table: &str, config: &EntityLogConfig) -> Vec<CreateTrigger> {
    let events = [
        (config.insert, TriggerEvent::Insert, INSERT_PROCEDURE),
        (config.update, TriggerEvent::Update, UPDATE_PROCEDURE),
        (config.delete, TriggerEvent::Delete, DELETE_PROCEDURE),
    ];
    events
        .into_iter()
        .filter(|(enabled, _, _)| *enabled)
        .map(|(_, event, procedure)| {
            let trigger = CreateTrigger::new(
                &trigger_name(table, event),
                TriggerTiming::After,
                event,
                table,
                procedure,
            )
            .if_not_exists()
            .argument(Expression::CurrentTable)
            .argument(Expression::current_column("id"));
            if event == TriggerEvent::Insert {
                trigger.argument(i64::from(config.lifetime()))
            } else {
                trigger
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_sql_core::dialect::{MySqlDialect, PostgresDialect};

    #[test]
    fn test_config_defaults() {
        let config = EntityLogConfig::default();
        assert!(!config.is_enabled());
        assert_eq!(config.lifetime(), 90);
        assert_eq!(EntityLogConfig::all().with_lifetime(30).lifetime(), 30);
    }

    #[test]
    fn test_config_from_json() {
        let config: EntityLogConfig =
            serde_json::from_str(r#"{"insert": true, "lifetime": 7}"#).unwrap();
        assert!(config.insert);
        assert!(!config.delete);
        assert_eq!(config.lifetime, Some(7));
    }

    #[test]
    fn test_log_table_mysql() {
        let query = log_table().build(&MySqlDialect).unwrap();
        assert_eq!(
            query.sql,
            "CREATE TABLE IF NOT EXISTS `EntityLog` (`entityId` INT NOT NULL, \
             `tableName` VARCHAR(64) NOT NULL, `modified` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, \
             `lifetime` INT NOT NULL DEFAULT 90, UNIQUE (`entityId`, `tableName`))"
        );
    }

    #[test]
    fn test_triggers_follow_config() {
        let config = EntityLogConfig {
            insert: true,
            update: false,
            delete: true,
            lifetime: Some(30),
        };
        let triggers = triggers("User", &config);
        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[1].event(), TriggerEvent::Delete);

        let insert = triggers[0].clone().build(&MySqlDialect).unwrap();
        assert_eq!(
            insert.sql,
            "CREATE TRIGGER IF NOT EXISTS `User_trg_insert` AFTER INSERT ON `User` FOR EACH ROW \
             CALL `InsertEntityLog`('User', NEW.`id`, 30)"
        );
    }

    #[test]
    fn test_procedures_build_on_both_dialects() {
        for procedure in procedures() {
            assert!(procedure.clone().build(&MySqlDialect).is_ok());
            let query = procedure.build(&PostgresDialect).unwrap();
            assert!(query.sql.ends_with("RETURN NEW; END; $$ LANGUAGE plpgsql"));
        }
    }

    #[test]
    fn test_delete_procedure_postgres() {
        let delete = procedures().remove(2).build(&PostgresDialect).unwrap();
        assert_eq!(
            delete.sql,
            r#"CREATE OR REPLACE FUNCTION "DeleteEntityLog"() RETURNS TRIGGER AS $$ BEGIN DELETE FROM "EntityLog" WHERE "entityId" = CASE WHEN TG_OP = 'DELETE' THEN OLD."id" ELSE NEW."id" END AND "tableName" = TG_TABLE_NAME; RETURN NEW; END; $$ LANGUAGE plpgsql"#
        );
    }
}
