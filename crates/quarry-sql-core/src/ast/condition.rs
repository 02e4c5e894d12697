//! Boolean condition nodes.

use super::expression::Expression;
use crate::builder::Select;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Right-hand side of an IN condition.
#[derive(Debug, Clone, PartialEq)]
pub enum InCandidates {
    List(Vec<Expression>),
    Select(Box<Select>),
}

/// A boolean node of the SQL tree.
///
/// `And`, `Or` and `Not` always render parenthesized.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        left: Expression,
        op: CompareOp,
        right: Expression,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    IsNull {
        expression: Expression,
        negated: bool,
    },
    Like {
        expression: Expression,
        pattern: Expression,
        negated: bool,
    },
    Regex {
        expression: Expression,
        pattern: Expression,
    },
    In {
        needle: Expression,
        candidates: InCandidates,
        negated: bool,
    },
    Exists(Box<Select>),
    /// A boolean expression used as a predicate.
    Bool(Expression),
}

impl Condition {
    /// AND-group of every given condition.
    #[must_use]
    pub fn and<I: IntoIterator<Item = Self>>(conditions: I) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    /// OR-group of every given condition.
    #[must_use]
    pub fn or<I: IntoIterator<Item = Self>>(conditions: I) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Self) -> Self {
        Self::Not(Box::new(condition))
    }

    #[must_use]
    pub fn exists(select: Select) -> Self {
        Self::Exists(Box::new(select))
    }
}
