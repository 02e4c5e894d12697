//! Recording connection shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use quarry_orm::{Connection, ExecutionError, Row};
use quarry_sql_core::dialect::{Dialect, MySqlDialect, PostgresDialect};
use quarry_sql_core::BuiltQuery;

/// Records every statement; fetches return scripted rows.
pub struct RecordingConnection {
    dialect: Box<dyn Dialect>,
    pub executed: Vec<BuiltQuery>,
    responses: VecDeque<Vec<Row>>,
    fail_on: Option<String>,
    last_error: Option<String>,
}

impl RecordingConnection {
    pub fn mysql() -> Self {
        Self::with_dialect(Box::new(MySqlDialect))
    }

    pub fn postgres() -> Self {
        Self::with_dialect(Box::new(PostgresDialect))
    }

    fn with_dialect(dialect: Box<dyn Dialect>) -> Self {
        Self {
            dialect,
            executed: Vec::new(),
            responses: VecDeque::new(),
            fail_on: None,
            last_error: None,
        }
    }

    pub fn respond(&mut self, rows: Vec<Row>) -> &mut Self {
        self.responses.push_back(rows);
        self
    }

    /// Fails statements whose SQL contains `fragment`.
    pub fn fail_on(&mut self, fragment: &str) -> &mut Self {
        self.fail_on = Some(fragment.to_owned());
        self
    }

    pub fn sql(&self) -> Vec<&str> {
        self.executed.iter().map(|query| query.sql.as_str()).collect()
    }

    fn record(&mut self, query: &BuiltQuery) -> Result<(), ExecutionError> {
        self.executed.push(query.clone());
        if let Some(fragment) = &self.fail_on {
            if query.sql.contains(fragment.as_str()) {
                self.last_error = Some(String::from("relation already exists"));
                return Err(ExecutionError::new(
                    query.shape.clone(),
                    "relation already exists",
                ));
            }
        }
        self.last_error = None;
        Ok(())
    }
}

impl Connection for RecordingConnection {
    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn execute(&mut self, query: &BuiltQuery) -> Result<u64, ExecutionError> {
        self.record(query)?;
        Ok(0)
    }

    fn fetch(&mut self, query: &BuiltQuery) -> Result<Vec<Row>, ExecutionError> {
        self.record(query)?;
        Ok(self.responses.pop_front().unwrap_or_default())
    }

    fn last_insert_id(&self) -> Option<i64> {
        None
    }

    fn affected_rows(&self) -> u64 {
        0
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
