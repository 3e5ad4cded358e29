//! Storage collaborator beneath the virtual-object backend.
//!
//! Inserts report either the generated identifier or a [`StorageFailure`] carrying
//! the storage error code and info. Pooling and transactions stay with the implementation.

use crate::sql::params::{quoted, QueryBuf};
use crate::sql::QueryValue;
use async_trait::async_trait;
use sqlx::{PgPool, Row as _};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Column name -> value. Ordered so generated SQL is stable.
pub type Row = BTreeMap<String, QueryValue>;

/// Error info and error code reported by storage after a failed operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageFailure {
    pub code: String,
    pub info: String,
}

impl StorageFailure {
    pub fn new(code: impl Into<String>, info: impl Into<String>) -> Self {
        StorageFailure {
            code: code.into(),
            info: info.into(),
        }
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts `row` into `table` and returns the last insert id as reported by storage.
    async fn insert(&self, table: &str, row: &Row) -> Result<String, StorageFailure>;

    /// Renders `value` as a literal safe to embed in SQL text for `table`.
    fn full_quote_str(&self, value: &QueryValue, _table: &str) -> String {
        quote_literal(value)
    }

    /// Whether storage is reachable (used by readiness checks).
    async fn ping(&self) -> bool {
        true
    }
}

/// Standard SQL literal: strings single-quoted with quotes doubled, numbers and booleans bare.
pub fn quote_literal(value: &QueryValue) -> String {
    match value {
        QueryValue::Null => "NULL".to_string(),
        QueryValue::Bool(true) => "TRUE".to_string(),
        QueryValue::Bool(false) => "FALSE".to_string(),
        QueryValue::Int(n) => n.to_string(),
        QueryValue::Float(n) if n.is_finite() => n.to_string(),
        QueryValue::Float(n) => format!("'{}'", n),
        QueryValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        QueryValue::List(items) => format!(
            "({})",
            items.iter().map(quote_literal).collect::<Vec<_>>().join(",")
        ),
    }
}

/// PostgreSQL storage: parameterized `INSERT ... RETURNING <identifier>`.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
    identifier_column: String,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        PgStorage {
            pool,
            identifier_column: "uid".to_string(),
        }
    }

    /// Column whose generated value is returned as the last insert id. Default: `uid`.
    pub fn with_identifier_column(mut self, column: impl Into<String>) -> Self {
        self.identifier_column = column.into();
        self
    }
}

fn insert_statement<'a>(table: &str, identifier_column: &str, row: &'a Row) -> QueryBuf<'a> {
    let mut q = QueryBuf::new();
    let returning = format!("({})::text", quoted(identifier_column));
    if row.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", quoted(table), returning);
        return q;
    }
    let mut cols = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());
    for (column, value) in row {
        cols.push(quoted(column));
        placeholders.push(q.push_param(value));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(table),
        cols.join(", "),
        placeholders.join(", "),
        returning
    );
    q
}

fn failure_from_sqlx(e: sqlx::Error) -> StorageFailure {
    match &e {
        sqlx::Error::Database(db) => StorageFailure::new(
            db.code().map(|c| c.into_owned()).unwrap_or_default(),
            db.message(),
        ),
        _ => StorageFailure::new("", e.to_string()),
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn insert(&self, table: &str, row: &Row) -> Result<String, StorageFailure> {
        let q = insert_statement(table, &self.identifier_column, row);
        tracing::debug!(sql = %q.sql, params = q.params.len(), "insert");
        let result = q.bind_all().fetch_one(&self.pool).await.map_err(failure_from_sqlx)?;
        result.try_get::<String, _>(0).map_err(failure_from_sqlx)
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await.is_ok()
    }
}

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    tables: HashMap<String, Vec<Row>>,
    fail_next: Option<StorageFailure>,
}

/// In-process storage: auto-incrementing ids per process, optional injected failure.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next operation fails with this error code and info.
    pub fn fail_next(&self, code: impl Into<String>, info: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = Some(StorageFailure::new(code, info));
        }
    }

    /// Rows inserted into `table`, in insert order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .map(|state| state.tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert(&self, table: &str, row: &Row) -> Result<String, StorageFailure> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StorageFailure::new("HY000", "memory storage lock poisoned"))?;
        if let Some(failure) = state.fail_next.take() {
            return Err(failure);
        }
        state.last_id += 1;
        let id = state.last_id;
        state.tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(id.to_string())
    }
}
