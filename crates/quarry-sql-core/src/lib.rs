//! # quarry-sql-core
//!
//! A dialect-agnostic SQL expression tree and statement builders.
//!
//! This crate provides:
//! - Closed `Expression` and `Condition` trees rendered against a dialect
//! - Builders for DML (SELECT, INSERT, UPDATE, DELETE, TRUNCATE) and DDL
//!   (CREATE/ALTER/DROP TABLE, CREATE PROCEDURE, CREATE TRIGGER)
//! - MySQL and PostgreSQL dialects
//!
//! ## Building a query
//!
//! Values are always bound as parameters, identifiers are always quoted:
//!
//! ```rust
//! use quarry_sql_core::builder::{Filtered, Select};
//! use quarry_sql_core::dialect::PostgresDialect;
//!
//! let query = Select::from("User")
//!     .columns(["id", "name"])
//!     .where_eq("name", "'; DROP TABLE users; --")
//!     .limit(10)
//!     .build(&PostgresDialect)
//!     .unwrap();
//!
//! assert_eq!(
//!     query.sql,
//!     r#"SELECT "id", "name" FROM "User" WHERE "name" = $1 LIMIT 10"#
//! );
//! assert_eq!(query.params.len(), 1);
//! ```
//!
//! ## Composing conditions
//!
//! Composite conditions are always parenthesized, so nesting never changes
//! precedence:
//!
//! ```rust
//! use quarry_sql_core::ast::{col, Condition};
//! use quarry_sql_core::builder::{Filtered, Select};
//! use quarry_sql_core::dialect::MySqlDialect;
//!
//! let query = Select::from("User")
//!     .filter(Condition::or([col("age").lt(18), col("age").gt(65)]))
//!     .filter(col("deleted").is_null())
//!     .build(&MySqlDialect)
//!     .unwrap();
//!
//! assert_eq!(
//!     query.sql,
//!     "SELECT * FROM `User` WHERE (`age` < ? OR `age` > ?) AND `deleted` IS NULL"
//! );
//! ```

pub mod ast;
pub mod builder;
pub mod dialect;
mod error;
pub mod schema;

pub use ast::{col, val, Condition, Expression, SqlValue, ToSqlValue};
pub use builder::{
    AlterTable, BuiltQuery, CreateProcedure, CreateTable, CreateTrigger, Delete, DropStatement,
    Filtered, Insert, Returning, Select, Statement, Truncate, Update,
};
pub use dialect::{Dialect, MySqlDialect, PostgresDialect};
pub use error::{BuildError, Result};
pub use schema::{ColumnDefinition, ColumnType, DefaultValue};
