//! Expression nodes.

use super::condition::{CompareOp, Condition, InCandidates};
use super::value::{SqlValue, ToSqlValue};
use crate::builder::Select;

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFunction {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
        }
    }
}

/// Units for date arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalUnit {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Second => "SECOND",
            Self::Minute => "MINUTE",
            Self::Hour => "HOUR",
            Self::Day => "DAY",
            Self::Week => "WEEK",
            Self::Month => "MONTH",
            Self::Year => "YEAR",
        }
    }
}

/// SHA-2 digests, rendered as lowercase hex text on every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Digest length in bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Self::Sha224 => 224,
            Self::Sha256 => 256,
            Self::Sha384 => 384,
            Self::Sha512 => 512,
        }
    }
}

/// A value-producing node of the SQL tree.
///
/// Columns are identifiers and are quoted by the dialect; values are bound
/// as parameters. `Raw` is emitted verbatim and must only carry trusted
/// fragments such as keywords.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Column reference, optionally qualified (`table.column`).
    Column(String),
    /// A bound value.
    Value(SqlValue),
    /// Trusted SQL text.
    Raw(String),
    /// `CURRENT_TIMESTAMP`.
    CurrentTimestamp,
    /// `left op right`.
    Arithmetic {
        left: Box<Expression>,
        op: ArithmeticOp,
        right: Box<Expression>,
    },
    /// `CASE WHEN condition THEN then ELSE otherwise END`.
    CaseWhen {
        condition: Box<Condition>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },
    /// `FUNC(argument)`; a missing argument renders `*`.
    Aggregate {
        function: AggregateFunction,
        argument: Option<Box<Expression>>,
    },
    /// `COALESCE(a, b, ...)`.
    Coalesce(Vec<Expression>),
    /// `base` shifted by `amount` units; negative amounts subtract.
    DateShift {
        base: Box<Expression>,
        amount: i64,
        unit: IntervalUnit,
    },
    /// JSON array aggregate of the expression.
    JsonArrayAgg(Box<Expression>),
    /// JSON object aggregate of `key: value` pairs.
    JsonObjectAgg {
        key: Box<Expression>,
        value: Box<Expression>,
    },
    /// Digest of the expression.
    Hash {
        argument: Box<Expression>,
        algorithm: HashAlgorithm,
    },
    /// `expression AS alias`.
    Alias {
        expression: Box<Expression>,
        alias: String,
    },
    /// A parenthesized sub-select.
    Subquery(Box<Select>),
    /// The table a procedure or trigger is running for.
    CurrentTable,
    /// A column of the row a procedure or trigger is running for.
    CurrentColumn(String),
}

/// Creates a column reference.
#[must_use]
pub fn col(name: &str) -> Expression {
    Expression::Column(String::from(name))
}

/// Creates a bound value.
#[must_use]
pub fn val<T: ToSqlValue>(value: T) -> Expression {
    Expression::Value(value.to_sql_value())
}

/// `COUNT(*) AS count`.
#[must_use]
pub fn count_all() -> Expression {
    Expression::Aggregate {
        function: AggregateFunction::Count,
        argument: None,
    }
    .alias("count")
}

impl Expression {
    /// Creates an aggregate over this expression.
    #[must_use]
    pub fn aggregate(function: AggregateFunction, argument: impl Into<Self>) -> Self {
        Self::Aggregate {
            function,
            argument: Some(Box::new(argument.into())),
        }
    }

    #[must_use]
    pub fn case_when(condition: Condition, then: impl Into<Self>, otherwise: impl Into<Self>) -> Self {
        Self::CaseWhen {
            condition: Box::new(condition),
            then: Box::new(then.into()),
            otherwise: Box::new(otherwise.into()),
        }
    }

    #[must_use]
    pub fn coalesce<I, E>(expressions: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Self>,
    {
        Self::Coalesce(expressions.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn json_array_agg(expression: impl Into<Self>) -> Self {
        Self::JsonArrayAgg(Box::new(expression.into()))
    }

    #[must_use]
    pub fn json_object_agg(key: impl Into<Self>, value: impl Into<Self>) -> Self {
        Self::JsonObjectAgg {
            key: Box::new(key.into()),
            value: Box::new(value.into()),
        }
    }

    #[must_use]
    pub fn hash(self, algorithm: HashAlgorithm) -> Self {
        Self::Hash {
            argument: Box::new(self),
            algorithm,
        }
    }

    #[must_use]
    pub fn subquery(select: Select) -> Self {
        Self::Subquery(Box::new(select))
    }

    #[must_use]
    pub fn current_column(name: &str) -> Self {
        Self::CurrentColumn(String::from(name))
    }

    #[must_use]
    pub fn alias(self, alias: &str) -> Self {
        Self::Alias {
            expression: Box::new(self),
            alias: String::from(alias),
        }
    }

    /// Shifts a date expression by `amount` units.
    #[must_use]
    pub fn shift(self, amount: i64, unit: IntervalUnit) -> Self {
        Self::DateShift {
            base: Box::new(self),
            amount,
            unit,
        }
    }

    fn arithmetic(self, op: ArithmeticOp, right: impl Into<Self>) -> Self {
        Self::Arithmetic {
            left: Box::new(self),
            op,
            right: Box::new(right.into()),
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(self, right: impl Into<Self>) -> Self {
        self.arithmetic(ArithmeticOp::Add, right)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, right: impl Into<Self>) -> Self {
        self.arithmetic(ArithmeticOp::Sub, right)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, right: impl Into<Self>) -> Self {
        self.arithmetic(ArithmeticOp::Mul, right)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn div(self, right: impl Into<Self>) -> Self {
        self.arithmetic(ArithmeticOp::Div, right)
    }

    fn compare(self, op: CompareOp, right: impl Into<Self>) -> Condition {
        Condition::Compare {
            left: self,
            op,
            right: right.into(),
        }
    }

    #[must_use]
    pub fn eq(self, right: impl Into<Self>) -> Condition {
        self.compare(CompareOp::Eq, right)
    }

    #[must_use]
    pub fn ne(self, right: impl Into<Self>) -> Condition {
        self.compare(CompareOp::Ne, right)
    }

    #[must_use]
    pub fn lt(self, right: impl Into<Self>) -> Condition {
        self.compare(CompareOp::Lt, right)
    }

    #[must_use]
    pub fn le(self, right: impl Into<Self>) -> Condition {
        self.compare(CompareOp::Le, right)
    }

    #[must_use]
    pub fn gt(self, right: impl Into<Self>) -> Condition {
        self.compare(CompareOp::Gt, right)
    }

    #[must_use]
    pub fn ge(self, right: impl Into<Self>) -> Condition {
        self.compare(CompareOp::Ge, right)
    }

    #[must_use]
    pub fn is_null(self) -> Condition {
        Condition::IsNull {
            expression: self,
            negated: false,
        }
    }

    #[must_use]
    pub fn is_not_null(self) -> Condition {
        Condition::IsNull {
            expression: self,
            negated: true,
        }
    }

    #[must_use]
    pub fn like(self, pattern: impl Into<Self>) -> Condition {
        Condition::Like {
            expression: self,
            pattern: pattern.into(),
            negated: false,
        }
    }

    #[must_use]
    pub fn not_like(self, pattern: impl Into<Self>) -> Condition {
        Condition::Like {
            expression: self,
            pattern: pattern.into(),
            negated: true,
        }
    }

    #[must_use]
    pub fn regex(self, pattern: impl Into<Self>) -> Condition {
        Condition::Regex {
            expression: self,
            pattern: pattern.into(),
        }
    }

    fn in_candidates(self, candidates: InCandidates, negated: bool) -> Condition {
        Condition::In {
            needle: self,
            candidates,
            negated,
        }
    }

    #[must_use]
    pub fn in_list<I, E>(self, candidates: I) -> Condition
    where
        I: IntoIterator<Item = E>,
        E: Into<Self>,
    {
        let list = candidates.into_iter().map(Into::into).collect();
        self.in_candidates(InCandidates::List(list), false)
    }

    #[must_use]
    pub fn not_in_list<I, E>(self, candidates: I) -> Condition
    where
        I: IntoIterator<Item = E>,
        E: Into<Self>,
    {
        let list = candidates.into_iter().map(Into::into).collect();
        self.in_candidates(InCandidates::List(list), true)
    }

    #[must_use]
    pub fn in_select(self, select: Select) -> Condition {
        self.in_candidates(InCandidates::Select(Box::new(select)), false)
    }

    #[must_use]
    pub fn not_in_select(self, select: Select) -> Condition {
        self.in_candidates(InCandidates::Select(Box::new(select)), true)
    }

    /// Uses a boolean expression as a condition.
    #[must_use]
    pub fn is_true(self) -> Condition {
        Condition::Bool(self)
    }
}

impl From<SqlValue> for Expression {
    fn from(value: SqlValue) -> Self {
        Self::Value(value)
    }
}

macro_rules! value_into_expression {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expression {
                fn from(value: $ty) -> Self {
                    Self::Value(value.to_sql_value())
                }
            }
        )*
    };
}

value_into_expression!(bool, i64, i32, i16, i8, u32, u16, u8, f64, f32, String, &str, Vec<u8>);

impl<T: ToSqlValue> From<Option<T>> for Expression {
    fn from(value: Option<T>) -> Self {
        Self::Value(value.to_sql_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_all_is_aliased() {
        match count_all() {
            Expression::Alias { expression, alias } => {
                assert_eq!(alias, "count");
                assert!(matches!(
                    *expression,
                    Expression::Aggregate {
                        function: AggregateFunction::Count,
                        argument: None
                    }
                ));
            }
            other => panic!("unexpected expression {other:?}"),
        }
    }

    #[test]
    fn test_literals_become_values() {
        assert_eq!(Expression::from("a"), Expression::Value(SqlValue::Text("a".into())));
        assert_eq!(Expression::from(None::<i64>), Expression::Value(SqlValue::Null));
        assert_eq!(col("User.name"), Expression::Column("User.name".into()));
    }
}
