//! DELETE statement builder.

use super::filter::Filtered;
use super::{BuiltQuery, RenderContext, Returning};
use crate::ast::Condition;
use crate::dialect::Dialect;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub(crate) table: String,
    pub(crate) conditions: Vec<Condition>,
}

impl Delete {
    #[must_use]
    pub fn from(table: &str) -> Self {
        Self {
            table: String::from(table),
            conditions: Vec::new(),
        }
    }

    /// Builds the statement.
    ///
    /// # Errors
    ///
    /// Any error raised by the conditions.
    pub fn build(self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        let mut ctx = RenderContext::new();
        let sql = dialect.delete(&self, &mut ctx)?;
        Ok(BuiltQuery {
            sql,
            params: ctx.into_params(),
            returning: Returning::None,
            shape: format!("DELETE FROM {}", dialect.quote_path(&self.table)),
        })
    }
}

impl Filtered for Delete {
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}
