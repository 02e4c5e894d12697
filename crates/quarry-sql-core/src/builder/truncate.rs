//! TRUNCATE statement builder.

use super::BuiltQuery;
use crate::dialect::Dialect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncate {
    pub(crate) table: String,
}

impl Truncate {
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            table: String::from(table),
        }
    }

    #[must_use]
    pub fn build(self, dialect: &dyn Dialect) -> BuiltQuery {
        BuiltQuery::text(
            dialect.truncate(&self),
            format!("TRUNCATE {}", dialect.quote_path(&self.table)),
        )
    }
}
