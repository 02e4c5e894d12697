//! INSERT statement builder.

use super::{BuiltQuery, RenderContext};
use crate::ast::{Expression, UpdateStrategy};
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};

/// INSERT builder supporting several rows, an upsert policy and RETURNING.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<Expression>>,
    pub(crate) on_conflict: Option<UpdateStrategy>,
    pub(crate) returning: Vec<String>,
}

impl Insert {
    #[must_use]
    pub fn into(table: &str) -> Self {
        Self {
            table: String::from(table),
            columns: Vec::new(),
            rows: Vec::new(),
            on_conflict: None,
            returning: Vec::new(),
        }
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Appends one row of values, in column order.
    #[must_use]
    pub fn values<I, E>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a column and its value to a single-row insert.
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<Expression>) -> Self {
        self.columns.push(String::from(column));
        match self.rows.first_mut() {
            Some(row) => row.push(value.into()),
            None => self.rows.push(vec![value.into()]),
        }
        self
    }

    /// Starts a single row with no explicit values (`DEFAULT VALUES`).
    #[must_use]
    pub fn default_row(mut self) -> Self {
        self.rows.push(Vec::new());
        self
    }

    #[must_use]
    pub fn on_conflict(mut self, strategy: UpdateStrategy) -> Self {
        self.on_conflict = Some(strategy);
        self
    }

    #[must_use]
    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returning.extend(columns.into_iter().map(Into::into));
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.rows.is_empty() {
            return Err(BuildError::EmptyInsert {
                table: self.table.clone(),
            });
        }
        for row in &self.rows {
            if row.len() != self.columns.len() {
                return Err(BuildError::RowArity {
                    table: self.table.clone(),
                    expected: self.columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(())
    }

    /// Builds the statement.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyInsert`], [`BuildError::RowArity`], or an
    /// unsupported RETURNING list.
    pub fn build(self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        let mut ctx = RenderContext::new();
        let sql = dialect.insert(&self, &mut ctx)?;
        let (_, returning) = dialect.returning(&self.returning)?;
        Ok(BuiltQuery {
            sql,
            params: ctx.into_params(),
            returning,
            shape: format!("INSERT INTO {}", dialect.quote_path(&self.table)),
        })
    }
}
