//! ALTER TABLE builder.

use super::{single, BuiltQuery};
use crate::ast::Constraint;
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};
use crate::schema::ColumnDefinition;

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDefinition),
    /// Replaces the definition of an existing column.
    ModifyColumn(ColumnDefinition),
    DropColumn(String),
    AddConstraint(Constraint),
    /// Drops a named constraint; the kind selects the MySQL syntax.
    DropConstraint(Constraint),
    ResetAutoIncrement,
    /// Adds `value` to the enum column whose current definition is given.
    AddEnumValue {
        column: ColumnDefinition,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub(crate) table: String,
    pub(crate) actions: Vec<AlterAction>,
}

impl AlterTable {
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            table: String::from(table),
            actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn action(mut self, action: AlterAction) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn add_column(self, column: ColumnDefinition) -> Self {
        self.action(AlterAction::AddColumn(column))
    }

    #[must_use]
    pub fn modify_column(self, column: ColumnDefinition) -> Self {
        self.action(AlterAction::ModifyColumn(column))
    }

    #[must_use]
    pub fn drop_column(self, column: &str) -> Self {
        self.action(AlterAction::DropColumn(String::from(column)))
    }

    #[must_use]
    pub fn add_constraint(self, constraint: Constraint) -> Self {
        self.action(AlterAction::AddConstraint(constraint))
    }

    #[must_use]
    pub fn drop_constraint(self, constraint: Constraint) -> Self {
        self.action(AlterAction::DropConstraint(constraint))
    }

    #[must_use]
    pub fn reset_auto_increment(self) -> Self {
        self.action(AlterAction::ResetAutoIncrement)
    }

    #[must_use]
    pub fn add_enum_value(self, column: ColumnDefinition, value: &str) -> Self {
        self.action(AlterAction::AddEnumValue {
            column,
            value: String::from(value),
        })
    }

    /// Builds the statement.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyAlter`], an action unsupported by the dialect, or
    /// [`BuildError::MultipleStatements`].
    pub fn build(self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        let queries = self.build_all(dialect)?;
        single(dialect, queries)
    }

    /// Builds every statement the actions need, in execution order.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyAlter`] or an action unsupported by the dialect.
    pub fn build_all(self, dialect: &dyn Dialect) -> Result<Vec<BuiltQuery>> {
        if self.actions.is_empty() {
            return Err(BuildError::EmptyAlter { table: self.table });
        }
        let texts = dialect.alter_table(&self)?;
        let shape = format!("ALTER TABLE {}", dialect.quote_path(&self.table));
        Ok(texts
            .into_iter()
            .map(|sql| BuiltQuery::text(sql, shape.clone()))
            .collect())
    }
}
