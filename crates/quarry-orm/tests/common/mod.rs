//! In-memory connection and entities shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use quarry_orm::{Connection, ExecutionError, Reference, RelationHandle, Row};
use quarry_sql_core::dialect::{Dialect, MySqlDialect, PostgresDialect};
use quarry_sql_core::{BuiltQuery, Returning, SqlValue};

/// Records every statement and answers fetches with scripted rows.
pub struct MemoryConnection {
    dialect: Box<dyn Dialect>,
    pub executed: Vec<BuiltQuery>,
    responses: VecDeque<Vec<Row>>,
    next_id: i64,
    last_id: Option<i64>,
    affected: u64,
    fail_on: Option<String>,
    last_error: Option<String>,
}

impl MemoryConnection {
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
            next_id: 1,
            last_id: None,
            affected: 0,
            fail_on: None,
            last_error: None,
        }
    }

    /// Queues the rows returned by the next fetch.
    pub fn respond(&mut self, rows: Vec<Row>) -> &mut Self {
        self.responses.push_back(rows);
        self
    }

    /// Sets the next generated key.
    pub fn next_id(&mut self, id: i64) -> &mut Self {
        self.next_id = id;
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
                self.last_error = Some(String::from("scripted failure"));
                return Err(ExecutionError::new(query.shape.clone(), "scripted failure"));
            }
        }
        self.last_error = None;
        Ok(())
    }
}

impl Connection for MemoryConnection {
    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn execute(&mut self, query: &BuiltQuery) -> Result<u64, ExecutionError> {
        self.record(query)?;
        if matches!(query.returning, Returning::LastInsertId(_)) {
            self.last_id = Some(self.next_id);
            self.next_id += 1;
        }
        self.affected = 1;
        Ok(self.affected)
    }

    fn fetch(&mut self, query: &BuiltQuery) -> Result<Vec<Row>, ExecutionError> {
        self.record(query)?;
        if matches!(query.returning, Returning::Rows(_)) {
            let id = self.next_id;
            self.next_id += 1;
            return Ok(vec![Row::from_pairs([("id", SqlValue::Int(id))])]);
        }
        let rows = self.responses.pop_front().unwrap_or_default();
        self.affected = rows.len() as u64;
        Ok(rows)
    }

    fn last_insert_id(&self) -> Option<i64> {
        self.last_id
    }

    fn affected_rows(&self) -> u64 {
        self.affected
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

pub fn row<const N: usize>(pairs: [(&str, SqlValue); N]) -> Row {
    Row::from_pairs(pairs)
}

#[derive(Debug, Clone, PartialEq, quarry_orm::Entity)]
pub struct Country {
    pub id: Option<i64>,
    #[entity(max_length = 64, unique)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, quarry_orm::Entity)]
pub struct City {
    pub id: Option<i64>,
    pub name: String,
    pub country: Reference<Country>,
}

#[derive(Debug, Clone, PartialEq, quarry_orm::Entity)]
pub struct Tag {
    pub id: Option<i64>,
    #[entity(max_length = 32)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, quarry_orm::Entity)]
#[entity(name = "Person", unique(full_name, home_city))]
pub struct Person {
    pub id: Option<i64>,
    #[entity(max_length = 64)]
    pub full_name: String,
    #[entity(hidden)]
    pub password: String,
    #[entity(visible_to("admin"))]
    pub email: Option<String>,
    pub active: bool,
    pub home_city: Option<Reference<City>>,
    #[entity(many = Tag)]
    pub tags: RelationHandle,
    #[entity(transient)]
    pub session: Option<String>,
}

impl Person {
    pub fn new(full_name: &str) -> Self {
        Self {
            id: None,
            full_name: full_name.to_owned(),
            password: String::from("secret"),
            email: None,
            active: true,
            home_city: None,
            tags: RelationHandle::default(),
            session: None,
        }
    }
}
