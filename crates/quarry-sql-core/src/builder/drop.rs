//! DROP TABLE / PROCEDURE / TRIGGER builder.

use super::BuiltQuery;
use crate::dialect::Dialect;

/// What is dropped. Triggers carry their table, which PostgreSQL requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropKind {
    Table,
    Procedure,
    Trigger { table: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropStatement {
    pub(crate) kind: DropKind,
    pub(crate) name: String,
    pub(crate) if_exists: bool,
}

impl DropStatement {
    #[must_use]
    pub fn table(name: &str) -> Self {
        Self::new(DropKind::Table, name)
    }

    #[must_use]
    pub fn procedure(name: &str) -> Self {
        Self::new(DropKind::Procedure, name)
    }

    #[must_use]
    pub fn trigger(name: &str, table: &str) -> Self {
        Self::new(
            DropKind::Trigger {
                table: String::from(table),
            },
            name,
        )
    }

    fn new(kind: DropKind, name: &str) -> Self {
        Self {
            kind,
            name: String::from(name),
            if_exists: false,
        }
    }

    #[must_use]
    pub const fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    #[must_use]
    pub fn build(self, dialect: &dyn Dialect) -> BuiltQuery {
        let sql = dialect.drop_statement(&self);
        let shape = sql.clone();
        BuiltQuery::text(sql, shape)
    }
}
