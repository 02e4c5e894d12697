//! CREATE TRIGGER builder.

use super::BuiltQuery;
use crate::ast::Expression;
use crate::dialect::Dialect;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
}

impl TriggerTiming {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Row variable holding the affected row.
    #[must_use]
    pub const fn row_variable(self) -> &'static str {
        match self {
            Self::Delete => "OLD",
            Self::Insert | Self::Update => "NEW",
        }
    }
}

/// CREATE TRIGGER builder. The trigger calls `procedure` for each row.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTrigger {
    pub(crate) name: String,
    pub(crate) timing: TriggerTiming,
    pub(crate) event: TriggerEvent,
    pub(crate) table: String,
    pub(crate) procedure: String,
    pub(crate) arguments: Vec<Expression>,
    pub(crate) if_not_exists: bool,
}

impl CreateTrigger {
    #[must_use]
    pub fn new(
        name: &str,
        timing: TriggerTiming,
        event: TriggerEvent,
        table: &str,
        procedure: &str,
    ) -> Self {
        Self {
            name: String::from(name),
            timing,
            event,
            table: String::from(table),
            procedure: String::from(procedure),
            arguments: Vec::new(),
            if_not_exists: false,
        }
    }

    #[must_use]
    pub fn argument(mut self, argument: impl Into<Expression>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    #[must_use]
    pub const fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn event(&self) -> TriggerEvent {
        self.event
    }

    /// Builds the statement.
    ///
    /// # Errors
    ///
    /// An argument the dialect cannot pass to a trigger procedure.
    pub fn build(self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        let sql = dialect.create_trigger(&self)?;
        Ok(BuiltQuery::text(
            sql,
            format!("CREATE TRIGGER {}", dialect.quote_path(&self.name)),
        ))
    }
}
