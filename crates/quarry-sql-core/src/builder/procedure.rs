//! CREATE PROCEDURE builder.

use super::{BuiltQuery, Statement};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::schema::{ColumnDefinition, ColumnType};

/// A declared procedure parameter.
///
/// Trigger procedures receive their data differently per backend. MySQL
/// passes everything explicitly through `CALL`; PostgreSQL exposes the row
/// as `NEW`/`OLD` and the remaining values as `TG_ARGV`. The parameter kind
/// tells the dialect which of the two a value is.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcedureParam {
    /// Name of the table the procedure runs for.
    CurrentTable,
    /// A column of the row the procedure runs for.
    RowColumn(ColumnDefinition),
    /// A plain argument supplied by the caller.
    Argument(ColumnDefinition),
}

impl ProcedureParam {
    /// Column name behind a row or argument parameter.
    #[must_use]
    pub fn column(&self) -> Option<&ColumnDefinition> {
        match self {
            Self::CurrentTable => None,
            Self::RowColumn(column) | Self::Argument(column) => Some(column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureReturn {
    /// The procedure is a trigger body.
    Trigger,
    /// A scalar result.
    Type(ColumnType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateProcedure {
    pub(crate) name: String,
    pub(crate) parameters: Vec<ProcedureParam>,
    pub(crate) returns: Option<ProcedureReturn>,
    pub(crate) body: Vec<Statement>,
}

impl CreateProcedure {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            parameters: Vec::new(),
            returns: None,
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn current_table_param(mut self) -> Self {
        self.parameters.push(ProcedureParam::CurrentTable);
        self
    }

    #[must_use]
    pub fn row_column(mut self, column: ColumnDefinition) -> Self {
        self.parameters.push(ProcedureParam::RowColumn(column));
        self
    }

    #[must_use]
    pub fn argument(mut self, column: ColumnDefinition) -> Self {
        self.parameters.push(ProcedureParam::Argument(column));
        self
    }

    #[must_use]
    pub fn returns(mut self, returns: ProcedureReturn) -> Self {
        self.returns = Some(returns);
        self
    }

    #[must_use]
    pub fn returns_trigger(self) -> Self {
        self.returns(ProcedureReturn::Trigger)
    }

    #[must_use]
    pub fn statement(mut self, statement: impl Into<Statement>) -> Self {
        self.body.push(statement.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parameters(&self) -> &[ProcedureParam] {
        &self.parameters
    }

    #[must_use]
    pub const fn is_trigger(&self) -> bool {
        matches!(self.returns, Some(ProcedureReturn::Trigger))
    }

    /// Finds the parameter bound to a column name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ProcedureParam> {
        self.parameters
            .iter()
            .find(|param| param.column().is_some_and(|column| column.name == name))
    }

    /// Zero-based position of `name` among the argument parameters.
    #[must_use]
    pub fn argument_index(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .filter(|param| matches!(param, ProcedureParam::Argument(_)))
            .position(|param| param.column().is_some_and(|column| column.name == name))
    }

    /// Builds the statement. The body is rendered with values inlined.
    ///
    /// # Errors
    ///
    /// Any error raised while rendering the body, such as
    /// [`BuildError::UnknownParameter`](crate::BuildError::UnknownParameter).
    pub fn build(self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        let sql = dialect.create_procedure(&self)?;
        Ok(BuiltQuery::text(
            sql,
            format!("CREATE PROCEDURE {}", dialect.quote_path(&self.name)),
        ))
    }
}
