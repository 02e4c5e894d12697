//! Column definitions.
//!
//! Provides a fluent API for defining columns of CREATE TABLE, ALTER TABLE
//! and procedure parameter lists.

static NULL_DEFAULT: DefaultValue = DefaultValue::Null;

/// Portable column types. Each dialect maps them to a concrete type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-incrementing integer key.
    Serial,
    /// Variable text, bounded when `max_length` is set.
    String { max_length: Option<u32> },
    Int { unsigned: bool },
    BigInt { unsigned: bool },
    Bool,
    Float,
    Double,
    Numeric {
        total: Option<u32>,
        decimals: Option<u32>,
    },
    DateTime,
    /// JSON document (stored as text where the backend lacks a JSON type).
    Json,
    /// Closed set of string values.
    Enum { values: Vec<String> },
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Boolean(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// `CURRENT_TIMESTAMP`.
    CurrentTimestamp,
    /// Raw SQL expression.
    Expression(String),
}

/// A complete column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Portable type.
    pub column_type: ColumnType,
    /// Whether the column accepts NULL. Columns are NOT NULL unless marked.
    pub nullable: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
}

impl ColumnDefinition {
    /// Creates a NOT NULL column without default.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            default: None,
        }
    }

    #[must_use]
    pub fn serial(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Serial)
    }

    #[must_use]
    pub fn string(name: impl Into<String>, max_length: Option<u32>) -> Self {
        Self::new(name, ColumnType::String { max_length })
    }

    #[must_use]
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Int { unsigned: false })
    }

    #[must_use]
    pub fn big_int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::BigInt { unsigned: false })
    }

    #[must_use]
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Bool)
    }

    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Float)
    }

    #[must_use]
    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Double)
    }

    #[must_use]
    pub fn numeric(name: impl Into<String>, total: Option<u32>, decimals: Option<u32>) -> Self {
        Self::new(name, ColumnType::Numeric { total, decimals })
    }

    #[must_use]
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::DateTime)
    }

    #[must_use]
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Json)
    }

    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            ColumnType::Enum {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Makes an integer column unsigned. Other types are left untouched.
    #[must_use]
    pub fn unsigned(mut self) -> Self {
        match &mut self.column_type {
            ColumnType::Int { unsigned } | ColumnType::BigInt { unsigned } => *unsigned = true,
            _ => {}
        }
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Whether a DEFAULT clause is emitted: an explicit default, or
    /// `DEFAULT NULL` on nullable columns. Serial columns never carry one.
    #[must_use]
    pub fn effective_default(&self) -> Option<&DefaultValue> {
        if self.column_type == ColumnType::Serial {
            return None;
        }
        match &self.default {
            Some(value) => Some(value),
            None if self.nullable => Some(&NULL_DEFAULT),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_not_null_by_default() {
        let column = ColumnDefinition::string("name", Some(32));
        assert!(!column.nullable);
        assert_eq!(column.effective_default(), None);
    }

    #[test]
    fn test_nullable_column_defaults_to_null() {
        let column = ColumnDefinition::int("age").nullable();
        assert_eq!(column.effective_default(), Some(&DefaultValue::Null));
    }

    #[test]
    fn test_explicit_default_wins() {
        let column = ColumnDefinition::bool("active")
            .nullable()
            .default(DefaultValue::Boolean(true));
        assert_eq!(column.effective_default(), Some(&DefaultValue::Boolean(true)));
    }

    #[test]
    fn test_serial_has_no_default() {
        let column = ColumnDefinition::serial("id").default(DefaultValue::Integer(1));
        assert_eq!(column.effective_default(), None);
    }

    #[test]
    fn test_unsigned() {
        assert_eq!(
            ColumnDefinition::big_int("n").unsigned().column_type,
            ColumnType::BigInt { unsigned: true }
        );
        assert_eq!(ColumnDefinition::bool("b").unsigned().column_type, ColumnType::Bool);
    }
}
