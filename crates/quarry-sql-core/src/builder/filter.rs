//! Predicate accumulation shared by every filtered statement.

use crate::ast::{col, Condition, Expression};

/// A statement carrying a WHERE clause.
///
/// Conditions added one after another are AND-ed.
pub trait Filtered: Sized {
    /// The accumulated conditions.
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    /// Adds a condition.
    #[must_use]
    fn filter(mut self, condition: Condition) -> Self {
        self.conditions_mut().push(condition);
        self
    }

    /// Adds one OR-group made of every given condition.
    #[must_use]
    fn where_any<I: IntoIterator<Item = Condition>>(self, conditions: I) -> Self {
        self.filter(Condition::or(conditions))
    }

    #[must_use]
    fn where_eq(self, column: &str, value: impl Into<Expression>) -> Self {
        self.filter(col(column).eq(value))
    }

    #[must_use]
    fn where_neq(self, column: &str, value: impl Into<Expression>) -> Self {
        self.filter(col(column).ne(value))
    }

    #[must_use]
    fn where_gt(self, column: &str, value: impl Into<Expression>) -> Self {
        self.filter(col(column).gt(value))
    }

    #[must_use]
    fn where_lt(self, column: &str, value: impl Into<Expression>) -> Self {
        self.filter(col(column).lt(value))
    }

    #[must_use]
    fn where_true(self, column: &str) -> Self {
        self.filter(col(column).eq(true))
    }

    #[must_use]
    fn where_false(self, column: &str) -> Self {
        self.filter(col(column).eq(false))
    }

    #[must_use]
    fn where_in<I, E>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        self.filter(col(column).in_list(values))
    }

    #[must_use]
    fn where_null(self, column: &str) -> Self {
        self.filter(col(column).is_null())
    }
}
