//! CREATE TABLE builder.

use super::{single, BuiltQuery};
use crate::ast::{Constraint, OnDelete};
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};
use crate::schema::ColumnDefinition;

/// CREATE TABLE builder.
///
/// Constraint shortcuts follow a fixed naming scheme: `pk_<table>` for the
/// primary key and `fk_<table>_<referenced>_<column>` for foreign keys.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub(crate) name: String,
    pub(crate) columns: Vec<ColumnDefinition>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) if_not_exists: bool,
}

impl CreateTable {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            columns: Vec::new(),
            constraints: Vec::new(),
            if_not_exists: false,
        }
    }

    #[must_use]
    pub const fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Adds a serial column and the `pk_<table>` primary key over it.
    #[must_use]
    pub fn serial_primary_key(self, column: &str) -> Self {
        let name = format!("pk_{}", self.name);
        self.column(ColumnDefinition::serial(column))
            .constraint(Constraint::primary_key(&name, [column]))
    }

    /// Adds a foreign key from `column` to `references_table.id`.
    #[must_use]
    pub fn foreign_key(self, column: &str, references_table: &str, on_delete: OnDelete) -> Self {
        let name = format!("fk_{}_{references_table}_{column}", self.name);
        self.constraint(
            Constraint::foreign_key(column, references_table, "id", on_delete).named(&name),
        )
    }

    #[must_use]
    pub fn unique<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraint(Constraint::unique(columns))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Builds the statement.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyTable`], or [`BuildError::MultipleStatements`]
    /// when the dialect needs supporting statements (PostgreSQL enum types).
    pub fn build(self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        let queries = self.build_all(dialect)?;
        single(dialect, queries)
    }

    /// Builds the supporting statements followed by the CREATE TABLE.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyTable`] when no column was declared.
    pub fn build_all(self, dialect: &dyn Dialect) -> Result<Vec<BuiltQuery>> {
        if self.columns.is_empty() {
            return Err(BuildError::EmptyTable { table: self.name });
        }
        let shape = format!("CREATE TABLE {}", dialect.quote_path(&self.name));
        let mut queries: Vec<BuiltQuery> = dialect
            .create_table_prelude(&self)
            .into_iter()
            .map(|sql| BuiltQuery::text(sql, shape.clone()))
            .collect();
        queries.push(BuiltQuery::text(dialect.create_table(&self), shape));
        Ok(queries)
    }
}
