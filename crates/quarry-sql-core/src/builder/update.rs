//! UPDATE statement builder.

use super::filter::Filtered;
use super::{BuiltQuery, RenderContext, Returning};
use crate::ast::{Condition, Expression};
use crate::dialect::Dialect;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub(crate) table: String,
    pub(crate) assignments: Vec<(String, Expression)>,
    pub(crate) conditions: Vec<Condition>,
}

impl Update {
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            table: String::from(table),
            assignments: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// `column = value`; the value may be any expression.
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<Expression>) -> Self {
        self.assignments.push((String::from(column), value.into()));
        self
    }

    /// Builds the statement.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyUpdate`](crate::BuildError::EmptyUpdate) without SET clauses, or any error raised
    /// by the values and conditions.
    pub fn build(self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        let mut ctx = RenderContext::new();
        let sql = dialect.update(&self, &mut ctx)?;
        Ok(BuiltQuery {
            sql,
            params: ctx.into_params(),
            returning: Returning::None,
            shape: format!("UPDATE {}", dialect.quote_path(&self.table)),
        })
    }
}

impl Filtered for Update {
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}
