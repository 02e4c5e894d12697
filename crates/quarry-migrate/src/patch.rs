//! Patches: named, ordered units of schema change.

use quarry_orm::entity_log::{self, EntityLogConfig};
use quarry_orm::EntityRegistry;
use quarry_sql_core::builder::Statement;
use serde::Deserialize;

use crate::error::{MigrateError, Result};

/// A named unit of schema change.
///
/// A patch is applied at most once per database: once all of its
/// statements ran, its name is recorded in the ledger.
pub trait Patch {
    /// Name recorded in the ledger. Must be unique within a sequence.
    fn name(&self) -> &str;

    /// Statements to run, in order.
    ///
    /// # Errors
    ///
    /// Any error raised while preparing the statements.
    fn statements(&self) -> Result<Vec<Statement>>;
}

/// A patch made of prepared statements.
#[derive(Debug, Clone)]
pub struct StatementPatch {
    name: String,
    statements: Vec<Statement>,
}

impl StatementPatch {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            statements: Vec::new(),
        }
    }

    /// Appends a statement.
    #[must_use]
    pub fn statement(mut self, statement: impl Into<Statement>) -> Self {
        self.statements.push(statement.into());
        self
    }

    /// Appends trusted SQL text.
    #[must_use]
    pub fn raw(mut self, sql: impl Into<String>) -> Self {
        self.statements.push(Statement::Raw(sql.into()));
        self
    }

    /// The schema of every entity registered in `registry`: the entity-log
    /// table and procedures when an entity is logged, tables in dependency
    /// order, predefined rows, entity-log triggers and junction tables.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Prepare`] when an entity's metadata is invalid.
    pub fn schema(name: impl Into<String>, registry: &EntityRegistry) -> Result<Self> {
        let name = name.into();
        let statements = registry
            .create_queries()
            .map_err(|source| MigrateError::Prepare {
                patch: name.clone(),
                source,
            })?;
        Ok(Self { name, statements })
    }
}

impl Patch for StatementPatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn statements(&self) -> Result<Vec<Statement>> {
        Ok(self.statements.clone())
    }
}

/// A table whose modifications are logged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggedTable {
    pub table: String,
    #[serde(flatten)]
    pub config: EntityLogConfig,
}

impl LoggedTable {
    #[must_use]
    pub fn new(table: impl Into<String>, config: EntityLogConfig) -> Self {
        Self {
            table: table.into(),
            config,
        }
    }
}

/// Creates the `EntityLog` table, its procedures and the triggers of the
/// logged tables.
///
/// Must run before the triggers' tables are written to, and after they
/// exist. A schema from [`StatementPatch::schema`] already carries the log
/// table and procedures of its logged entities.
#[derive(Debug, Clone)]
pub struct EntityLogPatch {
    name: String,
    tables: Vec<LoggedTable>,
}

impl EntityLogPatch {
    /// Default ledger name of the patch.
    pub const NAME: &'static str = "entity_log";

    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::from(Self::NAME),
            tables: Vec::new(),
        }
    }

    /// Renames the patch, e.g. to add triggers for more tables later.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn table(mut self, table: LoggedTable) -> Self {
        self.tables.push(table);
        self
    }

    #[must_use]
    pub fn tables<I: IntoIterator<Item = LoggedTable>>(mut self, tables: I) -> Self {
        self.tables.extend(tables);
        self
    }

    /// The tables of `registry` configured for logging.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Prepare`] when an entity's metadata is invalid.
    pub fn from_registry(registry: &EntityRegistry) -> Result<Self> {
        let order = registry
            .creation_order()
            .map_err(|source| MigrateError::Prepare {
                patch: String::from(Self::NAME),
                source: source.into(),
            })?;
        Ok(Self::new().tables(
            order
                .iter()
                .filter(|metadata| metadata.entity_log().is_enabled())
                .map(|metadata| LoggedTable::new(metadata.table(), *metadata.entity_log())),
        ))
    }

    #[must_use]
    pub fn logged_tables(&self) -> &[LoggedTable] {
        &self.tables
    }
}

impl Default for EntityLogPatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Patch for EntityLogPatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn statements(&self) -> Result<Vec<Statement>> {
        let mut statements = vec![Statement::from(entity_log::log_table())];
        statements.extend(entity_log::procedures().into_iter().map(Statement::from));
        for logged in &self.tables {
            statements.extend(
                entity_log::triggers(&logged.table, &logged.config)
                    .into_iter()
                    .map(Statement::from),
            );
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_log_patch_statements() {
        let patch = EntityLogPatch::new()
            .table(LoggedTable::new("User", EntityLogConfig::all()))
            .table(LoggedTable::new(
                "Order",
                EntityLogConfig {
                    delete: true,
                    ..EntityLogConfig::default()
                },
            ));
        let statements = patch.statements().unwrap();
        assert_eq!(statements.len(), 1 + 3 + 3 + 1);
        assert!(matches!(&statements[0], Statement::CreateTable(table) if table.name() == "EntityLog"));
        let triggers: Vec<&str> = statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::CreateTrigger(trigger) => Some(trigger.name()),
                _ => None,
            })
            .collect();
        assert_eq!(
            triggers,
            ["User_trg_insert", "User_trg_update", "User_trg_delete", "Order_trg_delete"]
        );
    }

    #[test]
    fn test_logged_table_from_json() {
        let table: LoggedTable =
            serde_json::from_str(r#"{"table": "User", "insert": true, "lifetime": 30}"#).unwrap();
        assert_eq!(table.table, "User");
        assert!(table.config.insert);
        assert!(!table.config.delete);
        assert_eq!(table.config.lifetime(), 30);
    }

    #[test]
    fn test_statement_patch() {
        let patch = StatementPatch::new("0001_seed").raw("SELECT 1");
        assert_eq!(patch.name(), "0001_seed");
        assert_eq!(patch.statements().unwrap(), vec![Statement::Raw(String::from("SELECT 1"))]);
    }
}
