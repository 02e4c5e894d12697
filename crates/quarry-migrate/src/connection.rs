//! Blocking [`Connection`] over an sqlx pool.

use clap::ValueEnum;
use quarry_orm::{Connection, ExecutionError, Row};
use quarry_sql_core::{BuiltQuery, Dialect, MySqlDialect, PostgresDialect, SqlValue};
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Row as _};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::error::{MigrateError, Result};

/// Supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectKind {
    #[value(name = "mysql")]
    MySql,
    #[value(name = "postgres")]
    Postgres,
}

impl DialectKind {
    /// Infers the backend from the scheme of a database URL.
    ///
    /// # Errors
    ///
    /// [`MigrateError::UnsupportedUrl`] for any other scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split_once("://").map_or("", |(scheme, _)| scheme);
        match scheme {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(MigrateError::UnsupportedUrl(redact(url))),
        }
    }

    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::MySql => &MySqlDialect,
            Self::Postgres => &PostgresDialect,
        }
    }
}

/// Drops the credentials of a URL before it is shown.
fn redact(url: &str) -> String {
    match (url.split_once("://"), url.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, host))) => format!("{scheme}://***@{host}"),
        _ => url.to_owned(),
    }
}

/// A single-connection sqlx pool driven by a private current-thread
/// runtime. Every call blocks until the database answered.
pub struct SqlxConnection {
    runtime: Runtime,
    pool: AnyPool,
    kind: DialectKind,
    last_insert_id: Option<i64>,
    affected_rows: u64,
    last_error: Option<String>,
}

impl SqlxConnection {
    /// Connects to `url`. The dialect is inferred from the URL unless
    /// given.
    ///
    /// # Errors
    ///
    /// [`MigrateError::UnsupportedUrl`], [`MigrateError::Io`] when the
    /// runtime cannot start, or [`MigrateError::Database`] when the
    /// connection fails.
    pub fn connect(url: &str, kind: Option<DialectKind>) -> Result<Self> {
        let kind = match kind {
            Some(kind) => kind,
            None => DialectKind::from_url(url)?,
        };
        sqlx::any::install_default_drivers();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let pool = runtime.block_on(AnyPoolOptions::new().max_connections(1).connect(url))?;
        debug!(dialect = kind.dialect().name(), "Connected");
        Ok(Self {
            runtime,
            pool,
            kind,
            last_insert_id: None,
            affected_rows: 0,
            last_error: None,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> DialectKind {
        self.kind
    }

    fn fail(&mut self, query: &BuiltQuery, error: &sqlx::Error) -> ExecutionError {
        let message = error.to_string();
        self.last_error = Some(message.clone());
        ExecutionError::new(query.shape.clone(), message)
    }
}

fn bind_params<'q>(query: &'q BuiltQuery) -> Query<'q, Any, AnyArguments<'q>> {
    let mut statement = sqlx::query(&query.sql);
    for param in &query.params {
        statement = match param {
            SqlValue::Null => statement.bind(None::<String>),
            SqlValue::Bool(value) => statement.bind(*value),
            SqlValue::Int(value) => statement.bind(*value),
            SqlValue::Float(value) => statement.bind(*value),
            SqlValue::Text(value) => statement.bind(value.as_str()),
            SqlValue::Blob(value) => statement.bind(value.as_slice()),
        };
    }
    statement
}

fn decode_value(row: &AnyRow, index: usize) -> SqlValue {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map_or(SqlValue::Null, SqlValue::Int);
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map_or(SqlValue::Null, SqlValue::Float);
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map_or(SqlValue::Null, SqlValue::Bool);
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.map_or(SqlValue::Null, SqlValue::Text);
    }
    row.try_get::<Option<Vec<u8>>, _>(index)
        .ok()
        .flatten()
        .map_or(SqlValue::Null, SqlValue::Blob)
}

fn decode_row(row: &AnyRow) -> Row {
    row.columns()
        .iter()
        .map(|column| (column.name().to_owned(), decode_value(row, column.ordinal())))
        .collect()
}

impl Connection for SqlxConnection {
    fn dialect(&self) -> &dyn Dialect {
        self.kind.dialect()
    }

    fn execute(&mut self, query: &BuiltQuery) -> std::result::Result<u64, ExecutionError> {
        debug!(sql = %query.shape, "Executing");
        let outcome = self.runtime.block_on(bind_params(query).execute(&self.pool));
        match outcome {
            Ok(done) => {
                self.last_error = None;
                self.affected_rows = done.rows_affected();
                if let Some(id) = done.last_insert_id() {
                    self.last_insert_id = Some(id);
                }
                Ok(self.affected_rows)
            }
            Err(error) => Err(self.fail(query, &error)),
        }
    }

    fn fetch(&mut self, query: &BuiltQuery) -> std::result::Result<Vec<Row>, ExecutionError> {
        debug!(sql = %query.shape, "Fetching");
        let outcome = self.runtime.block_on(bind_params(query).fetch_all(&self.pool));
        match outcome {
            Ok(rows) => {
                self.last_error = None;
                self.affected_rows = rows.len() as u64;
                Ok(rows.iter().map(decode_row).collect())
            }
            Err(error) => Err(self.fail(query, &error)),
        }
    }

    fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(
            DialectKind::from_url("mysql://root@localhost/app").unwrap(),
            DialectKind::MySql
        );
        assert_eq!(
            DialectKind::from_url("postgresql://localhost/app").unwrap(),
            DialectKind::Postgres
        );
        assert_eq!(DialectKind::Postgres.dialect().name(), "PostgreSQL");
    }

    #[test]
    fn test_unsupported_url_hides_credentials() {
        let error = DialectKind::from_url("sqlite://admin:secret@db/app").unwrap_err();
        assert!(matches!(
            &error,
            MigrateError::UnsupportedUrl(url) if url == "sqlite://***@db/app"
        ));
        assert!(!error.to_string().contains("secret"));
    }
}
