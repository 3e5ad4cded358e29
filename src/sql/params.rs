//! Bind query values to PostgreSQL statements with their native types.

use crate::sql::QueryValue;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Quote identifier for PostgreSQL. Callers validate names before they get here.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Statement text plus the values to bind, in placeholder order.
pub struct QueryBuf<'a> {
    pub sql: String,
    pub params: Vec<&'a QueryValue>,
}

impl<'a> QueryBuf<'a> {
    pub fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Returns the placeholder for the value: `NULL` is written inline so it needs no type.
    pub fn push_param(&mut self, v: &'a QueryValue) -> String {
        if v.is_null() {
            return "NULL".to_string();
        }
        self.params.push(v);
        format!("${}", self.params.len())
    }

    pub fn bind_all(&self) -> PgQuery<'_> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, value| bind_value(query, value))
    }
}

impl Default for QueryBuf<'_> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn bind_value<'q>(query: PgQuery<'q>, value: &'q QueryValue) -> PgQuery<'q> {
    match value {
        QueryValue::Null => query.bind(None::<String>),
        QueryValue::Bool(b) => query.bind(*b),
        QueryValue::Int(n) => query.bind(*n),
        QueryValue::Float(n) => query.bind(*n),
        QueryValue::Text(s) => query.bind(s.as_str()),
        QueryValue::List(_) => query.bind(sqlx::types::Json(value.to_json())),
    }
}
