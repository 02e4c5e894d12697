//! Expression, condition and constraint trees.
//!
//! These are closed sum types. Rendering lives in the
//! [`Dialect`](crate::dialect::Dialect) trait, which matches them
//! exhaustively.

mod condition;
mod constraint;
mod expression;
mod value;

pub use condition::{CompareOp, Condition, InCandidates};
pub use constraint::{Constraint, OnDelete, UpdateStrategy};
pub use expression::{
    col, count_all, val, AggregateFunction, ArithmeticOp, Expression, HashAlgorithm,
    IntervalUnit,
};
pub use value::{SqlValue, ToSqlValue};
