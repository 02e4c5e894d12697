//! Column and table schema definitions.

mod column;

pub use column::{ColumnDefinition, ColumnType, DefaultValue};
