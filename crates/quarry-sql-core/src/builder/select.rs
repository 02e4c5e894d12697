//! SELECT statement builder.

use std::fmt;
use std::str::FromStr;

use super::filter::Filtered;
use super::{BuiltQuery, RenderContext, Returning};
use crate::ast::{col, Condition, Expression};
use crate::dialect::Dialect;
use crate::error::Result;

/// A table with an optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            alias: None,
        }
    }

    #[must_use]
    pub fn aliased(name: &str, alias: &str) -> Self {
        Self {
            name: String::from(name),
            alias: Some(String::from(alias)),
        }
    }

    /// The name columns of this table are qualified with.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Condition,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Error for an unknown sort direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSortOrderError(pub String);

impl fmt::Display for ParseSortOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sort order '{}', expected asc or desc", self.0)
    }
}

impl std::error::Error for ParseSortOrderError {}

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(ParseSortOrderError(String::from(s)))
        }
    }
}

/// SELECT builder. An empty column list selects `*`.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub(crate) table: TableRef,
    pub(crate) columns: Vec<Expression>,
    pub(crate) distinct: bool,
    pub(crate) joins: Vec<Join>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) group_by: Vec<Expression>,
    pub(crate) having: Vec<Condition>,
    pub(crate) order_by: Vec<(Expression, SortOrder)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) for_update: bool,
}

impl Select {
    #[must_use]
    pub fn from(table: &str) -> Self {
        Self::from_table(TableRef::new(table))
    }

    #[must_use]
    pub fn from_aliased(table: &str, alias: &str) -> Self {
        Self::from_table(TableRef::aliased(table, alias))
    }

    #[must_use]
    pub const fn from_table(table: TableRef) -> Self {
        Self {
            table,
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            for_update: false,
        }
    }

    /// Adds plain column references.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns
            .extend(columns.into_iter().map(|c| col(c.as_ref())));
        self
    }

    #[must_use]
    pub fn column(mut self, column: &str) -> Self {
        self.columns.push(col(column));
        self
    }

    /// Adds an arbitrary selected expression.
    #[must_use]
    pub fn expression(mut self, expression: Expression) -> Self {
        self.columns.push(expression);
        self
    }

    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    #[must_use]
    pub fn join(mut self, join_type: JoinType, table: TableRef, on: Condition) -> Self {
        self.joins.push(Join {
            join_type,
            table,
            on,
        });
        self
    }

    /// `INNER JOIN table ON (left = right)`.
    #[must_use]
    pub fn inner_join(self, table: TableRef, left: &str, right: &str) -> Self {
        self.join(JoinType::Inner, table, col(left).eq(col(right)))
    }

    /// `LEFT JOIN table ON (left = right)`.
    #[must_use]
    pub fn left_join(self, table: TableRef, left: &str, right: &str) -> Self {
        self.join(JoinType::Left, table, col(left).eq(col(right)))
    }

    #[must_use]
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(col(column));
        self
    }

    #[must_use]
    pub fn having(mut self, condition: Condition) -> Self {
        self.having.push(condition);
        self
    }

    /// Orders by a column; the name is not checked against the selection.
    #[must_use]
    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.order_by.push((col(column), order));
        self
    }

    #[must_use]
    pub fn order_by_expression(mut self, expression: Expression, order: SortOrder) -> Self {
        self.order_by.push((expression, order));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub const fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    /// Drops the selection, ordering and paging, keeping source and filters.
    #[must_use]
    pub fn reselect(mut self, columns: Vec<Expression>) -> Self {
        self.columns = columns;
        self.order_by.clear();
        self.limit = None;
        self.offset = None;
        self
    }

    #[must_use]
    pub const fn table(&self) -> &TableRef {
        &self.table
    }

    /// Names under which selected values are addressable: the alias when
    /// aliased, the column path otherwise.
    #[must_use]
    pub fn selected_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter_map(|expression| match expression {
                Expression::Column(name) => Some(name.clone()),
                Expression::Alias { alias, .. } => Some(alias.clone()),
                _ => None,
            })
            .collect()
    }

    /// Builds the statement.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`](crate::BuildError) raised by the conditions or
    /// expressions.
    pub fn build(self, dialect: &dyn Dialect) -> Result<BuiltQuery> {
        let mut ctx = RenderContext::new();
        let sql = dialect.select(&self, &mut ctx)?;
        Ok(BuiltQuery {
            sql,
            params: ctx.into_params(),
            returning: Returning::None,
            shape: format!("SELECT FROM {}", dialect.quote_path(&self.table.name)),
        })
    }
}

impl Filtered for Select {
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }
}
