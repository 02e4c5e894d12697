//! Statement builders.
//!
//! Every builder is an owned accumulator for one statement. `build()`
//! consumes it and produces SQL text plus the ordered parameter list for
//! one dialect.
//!
//! # Example
//!
//! ```rust
//! use quarry_sql_core::ast::SqlValue;
//! use quarry_sql_core::builder::{Filtered, Update};
//! use quarry_sql_core::dialect::PostgresDialect;
//!
//! let query = Update::table("User")
//!     .set("name", "alice")
//!     .where_eq("id", 7)
//!     .build(&PostgresDialect)
//!     .unwrap();
//!
//! assert_eq!(query.sql, r#"UPDATE "User" SET "name" = $1 WHERE "id" = $2"#);
//! assert_eq!(query.params, vec![SqlValue::Text("alice".into()), SqlValue::Int(7)]);
//! ```

mod alter_table;
mod create_table;
mod delete;
mod drop;
mod filter;
mod insert;
mod procedure;
mod select;
mod trigger;
mod truncate;
mod update;

use crate::ast::SqlValue;
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};

pub use alter_table::{AlterAction, AlterTable};
pub use create_table::CreateTable;
pub use delete::Delete;
pub use drop::{DropKind, DropStatement};
pub use filter::Filtered;
pub use insert::Insert;
pub use procedure::{CreateProcedure, ProcedureParam, ProcedureReturn};
pub use select::{Join, JoinType, Select, SortOrder, TableRef};
pub use trigger::{CreateTrigger, TriggerEvent, TriggerTiming};
pub use truncate::Truncate;
pub use update::Update;

/// How the generated key of an INSERT reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Returning {
    /// Nothing is returned.
    #[default]
    None,
    /// The statement itself returns rows with these columns.
    Rows(Vec<String>),
    /// The backend does not return rows; the connection's last insert id
    /// stands for this column.
    LastInsertId(String),
}

/// A compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    /// SQL text with placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<SqlValue>,
    /// How generated keys are returned.
    pub returning: Returning,
    /// Statement kind and target (`INSERT INTO "User"`), safe to log.
    pub shape: String,
}

impl BuiltQuery {
    /// A parameterless statement.
    #[must_use]
    pub fn text(sql: String, shape: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
            returning: Returning::None,
            shape,
        }
    }
}

/// Where an expression is rendered; decides how the current-table and
/// current-column markers resolve.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// An ordinary statement.
    Statement,
    /// The body of a procedure.
    Procedure(&'a CreateProcedure),
    /// The argument list of a trigger's procedure call.
    TriggerCall(&'a CreateTrigger),
}

/// Parameter buffer and scope threaded through rendering.
#[derive(Debug)]
pub struct RenderContext<'a> {
    params: Vec<SqlValue>,
    inline: bool,
    scope: Scope<'a>,
}

impl Default for RenderContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RenderContext<'a> {
    /// Binds values as placeholders.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            params: Vec::new(),
            inline: false,
            scope: Scope::Statement,
        }
    }

    /// Renders values as escaped literals.
    #[must_use]
    pub const fn inline(scope: Scope<'a>) -> Self {
        Self {
            params: Vec::new(),
            inline: true,
            scope,
        }
    }

    #[must_use]
    pub const fn scope(&self) -> Scope<'a> {
        self.scope
    }

    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.inline
    }

    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Appends a bound value and returns its 1-based position.
    pub fn push(&mut self, value: SqlValue) -> usize {
        self.params.push(value);
        self.params.len()
    }

    #[must_use]
    pub fn into_params(self) -> Vec<SqlValue> {
        self.params
    }
}

/// Any buildable statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Truncate(Truncate),
    Drop(DropStatement),
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    CreateProcedure(CreateProcedure),
    CreateTrigger(CreateTrigger),
    /// Trusted SQL text.
    Raw(String),
}

impl Statement {
    /// Builds the statement, failing when it needs several SQL texts.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`] of the underlying builder, or
    /// [`BuildError::MultipleStatements`].
    pub fn build(self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        match self {
            Self::Select(s) => s.build(dialect),
            Self::Insert(s) => s.build(dialect),
            Self::Update(s) => s.build(dialect),
            Self::Delete(s) => s.build(dialect),
            Self::Truncate(s) => Ok(s.build(dialect)),
            Self::Drop(s) => Ok(s.build(dialect)),
            Self::CreateTable(s) => s.build(dialect),
            Self::AlterTable(s) => s.build(dialect),
            Self::CreateProcedure(s) => s.build(dialect),
            Self::CreateTrigger(s) => s.build(dialect),
            Self::Raw(sql) => Ok(BuiltQuery::text(sql, String::from("RAW"))),
        }
    }

    /// Builds every SQL text the statement needs, in execution order.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`] of the underlying builder.
    pub fn build_all(self, dialect: &dyn Dialect) -> Result<Vec<BuiltQuery>> {
        match self {
            Self::CreateTable(s) => s.build_all(dialect),
            Self::AlterTable(s) => s.build_all(dialect),
            other => other.build(dialect).map(|query| vec![query]),
        }
    }
}

macro_rules! statement_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Statement {
                fn from(statement: $ty) -> Self {
                    Self::$variant(statement)
                }
            }
        )*
    };
}

statement_from!(
    Select => Select,
    Insert => Insert,
    Update => Update,
    Delete => Delete,
    Truncate => Truncate,
    Drop => DropStatement,
    CreateTable => CreateTable,
    AlterTable => AlterTable,
    CreateProcedure => CreateProcedure,
    CreateTrigger => CreateTrigger,
);

/// Collapses a multi-text rendering into the single statement `build()`
/// promises.
pub(crate) fn single(
    dialect: &dyn Dialect,
    mut queries: Vec<BuiltQuery>,
) -> Result<BuiltQuery> {
    if queries.len() == 1 {
        if let Some(query) = queries.pop() {
            return Ok(query);
        }
    }
    Err(BuildError::MultipleStatements {
        dialect: dialect.name(),
        count: queries.len(),
    })
}
