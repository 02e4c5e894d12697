//! The blocking boundary between the ORM and a database driver.

use quarry_sql_core::{BuiltQuery, Dialect, SqlValue};

use crate::error::ExecutionError;

/// One result row, addressable by column label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a row; surplus labels or values are dropped.
    #[must_use]
    pub fn new(mut columns: Vec<String>, mut values: Vec<SqlValue>) -> Self {
        let len = columns.len().min(values.len());
        columns.truncate(len);
        values.truncate(len);
        Self { columns, values }
    }

    /// Creates a row from `(label, value)` pairs.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, SqlValue)>,
        S: Into<String>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(column, value)| (column.into(), value))
            .unzip();
        Self { columns, values }
    }

    /// The first value labelled `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|index| &self.values[index])
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The columns starting with `prefix`, with the prefix stripped.
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Self {
        self.iter()
            .filter_map(|(column, value)| {
                column
                    .strip_prefix(prefix)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_owned(), value.clone()))
            })
            .collect()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// A synchronous database connection.
///
/// Each call runs one statement to completion before returning.
pub trait Connection {
    /// Dialect statements for this connection are compiled with.
    fn dialect(&self) -> &dyn Dialect;

    /// Runs a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// The backend's message together with the statement shape.
    fn execute(&mut self, query: &BuiltQuery) -> Result<u64, ExecutionError>;

    /// Runs a statement and returns its rows.
    ///
    /// # Errors
    ///
    /// The backend's message together with the statement shape.
    fn fetch(&mut self, query: &BuiltQuery) -> Result<Vec<Row>, ExecutionError>;

    /// Key generated by the last INSERT, if any.
    fn last_insert_id(&self) -> Option<i64>;

    /// Rows affected by the last statement.
    fn affected_rows(&self) -> u64;

    /// Message of the last failed statement.
    fn last_error(&self) -> Option<&str>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::from_pairs([
            ("id", SqlValue::Int(1)),
            ("group_id", SqlValue::Int(7)),
            ("group_name", SqlValue::Text("admins".into())),
            ("name", SqlValue::Text("alice".into())),
        ])
    }

    #[test]
    fn test_row_lookup() {
        let row = row();
        assert_eq!(row.get("name"), Some(&SqlValue::Text("alice".into())));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 4);
    }

    #[test]
    fn test_prefixed_strips_prefix() {
        let nested = row().prefixed("group_");
        assert_eq!(nested.columns(), ["id", "name"]);
        assert_eq!(nested.get("id"), Some(&SqlValue::Int(7)));
    }

    #[test]
    fn test_new_truncates_to_shorter_side() {
        let row = Row::new(vec!["a".into(), "b".into()], vec![SqlValue::Null]);
        assert_eq!(row.len(), 1);
    }
}
