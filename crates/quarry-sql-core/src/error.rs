//! Build errors.

use thiserror::Error;

/// Errors raised while compiling a statement to SQL text.
///
/// Every construct a backend cannot express is reported here, before any
/// text reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// An IN condition without candidates.
    #[error("IN condition requires at least one candidate value")]
    EmptyInList,

    /// An INSERT without any row.
    #[error("INSERT into '{table}' has no rows")]
    EmptyInsert { table: String },

    /// An INSERT row whose length differs from the column list.
    #[error("INSERT into '{table}' expects {expected} values per row, got {found}")]
    RowArity {
        table: String,
        expected: usize,
        found: usize,
    },

    /// An UPDATE without any SET clause.
    #[error("UPDATE of '{table}' has no SET clauses")]
    EmptyUpdate { table: String },

    /// An ALTER TABLE without any action.
    #[error("ALTER TABLE '{table}' has no actions")]
    EmptyAlter { table: String },

    /// A CREATE TABLE without columns.
    #[error("CREATE TABLE '{table}' has no columns")]
    EmptyTable { table: String },

    /// An AND/OR group, or a function argument list, without members.
    #[error("empty {0} group")]
    EmptyGroup(&'static str),

    /// A construct the active dialect cannot express.
    #[error("{construct} is not supported by the {dialect} dialect")]
    UnsupportedConstruct {
        dialect: &'static str,
        construct: String,
    },

    /// A current-column marker naming a column the procedure does not declare.
    #[error("procedure '{procedure}' has no parameter named '{parameter}'")]
    UnknownParameter { procedure: String, parameter: String },

    /// A DROP CONSTRAINT on an unnamed constraint.
    #[error("constraint on '{table}' has no name and cannot be dropped")]
    UnnamedConstraint { table: String },

    /// `build()` called on a statement needing several SQL texts.
    #[error("statement renders as {count} SQL statements on {dialect}, use build_all()")]
    MultipleStatements { dialect: &'static str, count: usize },
}

impl BuildError {
    pub(crate) fn unsupported(dialect: &'static str, construct: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            dialect,
            construct: construct.into(),
        }
    }
}

/// Result alias for builder operations.
pub type Result<T> = std::result::Result<T, BuildError>;
