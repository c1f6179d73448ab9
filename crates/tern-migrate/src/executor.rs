//! Query execution.
//!
//! Everything in this crate that touches a database goes through
//! [`QueryExecutor`], a single async `query(sql, params)` call returning
//! decoded rows and an affected-row count. Driver errors are boxed so no
//! driver type leaks into the runner's error surface.
//!
//! Implementations are provided for [`SqlitePool`], [`PgPool`] and the
//! [`Database`] enum. Statements without parameters run through
//! [`sqlx::raw_sql`], so a migration file holding several statements is
//! executed in one call.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Either, Executor, Row as _};
use tern_core::dialect::{Dialect, DialectKind};

/// Boxed driver error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A decoded result row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// A bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Text.
    Text(String),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Rows returned by a statement plus the number of rows it affected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    /// Decoded rows.
    pub rows: Vec<Row>,
    /// Rows affected (or returned, for drivers that do not distinguish).
    pub row_count: u64,
}

/// Runs SQL against a database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes `sql` with positional `params`.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, BoxError>;
}

#[async_trait]
impl QueryExecutor for SqlitePool {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, BoxError> {
        let mut stream = if params.is_empty() {
            self.fetch_many(sqlx::raw_sql(sql))
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = match param {
                    SqlValue::Null => query.bind(None::<String>),
                    SqlValue::Bool(b) => query.bind(*b),
                    SqlValue::Int(i) => query.bind(*i),
                    SqlValue::Float(f) => query.bind(*f),
                    SqlValue::Text(s) => query.bind(s.as_str()),
                };
            }
            self.fetch_many(query)
        };

        let mut output = QueryOutput::default();
        while let Some(item) = stream.try_next().await? {
            match item {
                Either::Left(done) => output.row_count += done.rows_affected(),
                Either::Right(row) => output.rows.push(decode_sqlite_row(&row)),
            }
        }
        Ok(output)
    }
}

#[async_trait]
impl QueryExecutor for PgPool {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, BoxError> {
        let mut stream = if params.is_empty() {
            self.fetch_many(sqlx::raw_sql(sql))
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = match param {
                    SqlValue::Null => query.bind(None::<String>),
                    SqlValue::Bool(b) => query.bind(*b),
                    SqlValue::Int(i) => query.bind(*i),
                    SqlValue::Float(f) => query.bind(*f),
                    SqlValue::Text(s) => query.bind(s.as_str()),
                };
            }
            self.fetch_many(query)
        };

        let mut output = QueryOutput::default();
        while let Some(item) = stream.try_next().await? {
            match item {
                Either::Left(done) => output.row_count += done.rows_affected(),
                Either::Right(row) => output.rows.push(decode_pg_row(&row)),
            }
        }
        Ok(output)
    }
}

fn float_value(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// SQLite values are dynamically typed, so each column is probed from the
/// narrowest type outwards.
fn decode_sqlite_row(row: &SqliteRow) -> Row {
    let mut record = Row::new();
    for column in row.columns() {
        let i = column.ordinal();
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
            v.map_or(Value::Null, Value::from)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
            v.map_or(Value::Null, float_value)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(i) {
            v.map_or(Value::Null, Value::String)
        } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
            v.map_or(Value::Null, |bytes| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        } else {
            Value::Null
        };
        record.insert(column.name().to_string(), value);
    }
    record
}

fn decode_pg_row(row: &PgRow) -> Row {
    let mut record = Row::new();
    for column in row.columns() {
        let i = column.ordinal();
        let value = if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
            v.map_or(Value::Null, Value::Bool)
        } else if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
            v.map_or(Value::Null, Value::from)
        } else if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
            v.map_or(Value::Null, Value::from)
        } else if let Ok(v) = row.try_get::<Option<i16>, _>(i) {
            v.map_or(Value::Null, Value::from)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
            v.map_or(Value::Null, float_value)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(i) {
            v.map_or(Value::Null, Value::String)
        } else if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(i) {
            v.map_or(Value::Null, |dt| Value::String(dt.to_rfc3339()))
        } else if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(i) {
            v.map_or(Value::Null, |dt| Value::String(dt.and_utc().to_rfc3339()))
        } else {
            Value::Null
        };
        record.insert(column.name().to_string(), value);
    }
    record
}

/// A connection pool for either supported engine.
#[derive(Debug, Clone)]
pub enum Database {
    /// SQLite pool.
    Sqlite(SqlitePool),
    /// PostgreSQL pool.
    Postgres(PgPool),
}

impl Database {
    /// Connects to `url`, choosing the engine from the URL scheme.
    ///
    /// SQLite database files are created if missing. SQLite pools hold a
    /// single connection so `sqlite::memory:` behaves as one database.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the URL is invalid or the connection fails.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        match DialectKind::from_url(url) {
            DialectKind::Postgres => PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .map(Self::Postgres),
            DialectKind::Sqlite => {
                let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect_with(options)
                    .await
                    .map(Self::Sqlite)
            }
        }
    }

    /// The engine behind this pool.
    #[must_use]
    pub const fn kind(&self) -> DialectKind {
        match self {
            Self::Sqlite(_) => DialectKind::Sqlite,
            Self::Postgres(_) => DialectKind::Postgres,
        }
    }

    /// The dialect matching this pool's engine.
    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.kind().dialect()
    }
}

impl From<SqlitePool> for Database {
    fn from(pool: SqlitePool) -> Self {
        Self::Sqlite(pool)
    }
}

impl From<PgPool> for Database {
    fn from(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }
}

#[async_trait]
impl QueryExecutor for Database {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, BoxError> {
        match self {
            Self::Sqlite(pool) => pool.query(sql, params).await,
            Self::Postgres(pool) => pool.query(sql, params).await,
        }
    }
}
