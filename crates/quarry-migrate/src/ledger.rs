//! Ledger of applied patches.
//!
//! This module manages the `quarry_patches` table that records which
//! patches have been applied to a database.

use chrono::{DateTime, NaiveDateTime, Utc};
use quarry_orm::{Connection, Row};
use quarry_sql_core::builder::{CreateTable, Insert, Select, SortOrder};
use quarry_sql_core::schema::{ColumnDefinition, DefaultValue};
use quarry_sql_core::SqlValue;
use tracing::debug;

use crate::error::{MigrateError, Result, StatementError};

/// Table recording applied patches.
pub const LEDGER_TABLE: &str = "quarry_patches";

/// A record of an applied patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    pub name: String,
    /// When the patch was applied, if the backend reported it.
    pub applied_at: Option<NaiveDateTime>,
}

/// Where applied patch names are kept.
pub trait Ledger {
    /// Creates the ledger storage when missing.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Ledger`] when the storage cannot be created.
    fn ensure(&mut self, conn: &mut dyn Connection) -> Result<()>;

    /// Applied patches, oldest first.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Ledger`] when the ledger cannot be read.
    fn applied(&mut self, conn: &mut dyn Connection) -> Result<Vec<AppliedPatch>>;

    /// Records `name` as applied.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Ledger`] when the ledger cannot be written.
    fn record(&mut self, conn: &mut dyn Connection, name: &str) -> Result<()>;
}

fn ledger_error(error: impl Into<StatementError>) -> MigrateError {
    MigrateError::Ledger(error.into())
}

/// A ledger kept in the `quarry_patches` table of the database itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableLedger;

impl TableLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The CREATE TABLE of the ledger.
    #[must_use]
    pub fn create_table() -> CreateTable {
        CreateTable::new(LEDGER_TABLE)
            .if_not_exists()
            .serial_primary_key("id")
            .column(ColumnDefinition::string("name", Some(128)))
            .column(ColumnDefinition::datetime("applied_at").default(DefaultValue::CurrentTimestamp))
            .unique(["name"])
    }

    fn read_applied(row: &Row) -> Option<AppliedPatch> {
        let name = row.get("name").and_then(SqlValue::as_str)?.to_owned();
        let applied_at = match row.get("applied_at") {
            Some(SqlValue::Text(text)) => parse_timestamp(text),
            Some(SqlValue::Int(seconds)) => {
                DateTime::from_timestamp(*seconds, 0).map(|datetime| datetime.naive_utc())
            }
            _ => None,
        };
        Some(AppliedPatch { name, applied_at })
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(text)
        .map(|datetime| datetime.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

impl Ledger for TableLedger {
    fn ensure(&mut self, conn: &mut dyn Connection) -> Result<()> {
        for query in Self::create_table()
            .build_all(conn.dialect())
            .map_err(ledger_error)?
        {
            debug!(sql = %query.shape, "Ensuring ledger table");
            conn.execute(&query).map_err(ledger_error)?;
        }
        Ok(())
    }

    fn applied(&mut self, conn: &mut dyn Connection) -> Result<Vec<AppliedPatch>> {
        let query = Select::from(LEDGER_TABLE)
            .columns(["name", "applied_at"])
            .order_by("id", SortOrder::Asc)
            .build(conn.dialect())
            .map_err(ledger_error)?;
        let rows = conn.fetch(&query).map_err(ledger_error)?;
        Ok(rows.iter().filter_map(Self::read_applied).collect())
    }

    fn record(&mut self, conn: &mut dyn Connection, name: &str) -> Result<()> {
        let query = Insert::into(LEDGER_TABLE)
            .set("name", name)
            .build(conn.dialect())
            .map_err(ledger_error)?;
        conn.execute(&query).map_err(ledger_error)?;
        Ok(())
    }
}

/// A ledger held in memory, for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    applied: Vec<AppliedPatch>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger in which `names` are already applied.
    #[must_use]
    pub fn with_applied<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            applied: names
                .into_iter()
                .map(|name| AppliedPatch {
                    name: name.into(),
                    applied_at: None,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.applied.iter().map(|patch| patch.name.as_str()).collect()
    }
}

impl Ledger for MemoryLedger {
    fn ensure(&mut self, _conn: &mut dyn Connection) -> Result<()> {
        Ok(())
    }

    fn applied(&mut self, _conn: &mut dyn Connection) -> Result<Vec<AppliedPatch>> {
        Ok(self.applied.clone())
    }

    fn record(&mut self, _conn: &mut dyn Connection, name: &str) -> Result<()> {
        self.applied.push(AppliedPatch {
            name: String::from(name),
            applied_at: Some(Utc::now().naive_utc()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_sql_core::dialect::{MySqlDialect, PostgresDialect};

    #[test]
    fn test_ledger_table_postgres() {
        let queries = TableLedger::create_table().build_all(&PostgresDialect).unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0].sql,
            r#"CREATE TABLE IF NOT EXISTS "quarry_patches" ("id" SERIAL NOT NULL, "name" VARCHAR(128) NOT NULL, "applied_at" TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, CONSTRAINT "pk_quarry_patches" PRIMARY KEY ("id"), UNIQUE ("name"))"#
        );
    }

    #[test]
    fn test_ledger_table_mysql() {
        let query = TableLedger::create_table().build(&MySqlDialect).unwrap();
        assert!(query.sql.starts_with(
            "CREATE TABLE IF NOT EXISTS `quarry_patches` (`id` INTEGER AUTO_INCREMENT NOT NULL"
        ));
    }

    #[test]
    fn test_read_applied_rows() {
        let row = Row::from_pairs([
            ("name", SqlValue::Text("0001_schema".into())),
            ("applied_at", SqlValue::Text("2024-03-01 12:30:00".into())),
        ]);
        let applied = TableLedger::read_applied(&row).unwrap();
        assert_eq!(applied.name, "0001_schema");
        assert_eq!(
            applied.applied_at.map(|at| at.to_string()),
            Some(String::from("2024-03-01 12:30:00"))
        );

        let row = Row::from_pairs([("name", SqlValue::Text("0002".into())), ("applied_at", SqlValue::Null)]);
        assert_eq!(TableLedger::read_applied(&row).unwrap().applied_at, None);
    }

    #[test]
    fn test_memory_ledger() {
        let ledger = MemoryLedger::with_applied(["a", "b"]);
        assert_eq!(ledger.names(), ["a", "b"]);
    }
}
