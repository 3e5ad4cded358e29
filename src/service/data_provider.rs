//! Data providers: property-level data access for a resource type.

use crate::config::VirtualObjectConfiguration;
use crate::error::AppError;
use crate::sql::{Constraint, Direction, ObjectConfiguration, Query, QueryValue, Row, VirtualObjectBackend};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

const DEFAULT_LIMIT: u64 = 100;
const MAX_LIMIT: u64 = 1000;

#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Builds a structured query from request query parameters.
    fn query_from_params(&self, params: &[(String, String)]) -> Result<Query, AppError>;

    async fn fetch_all(&self, query: &Query) -> Result<Vec<Value>, AppError>;

    async fn fetch(&self, identifier: &str) -> Result<Option<Value>, AppError>;

    /// Returns the generated identifier.
    async fn create(&self, data: &Map<String, Value>) -> Result<i64, AppError>;

    async fn update(&self, identifier: &str, data: &Map<String, Value>) -> Result<(), AppError>;

    async fn remove(&self, identifier: &str) -> Result<(), AppError>;
}

/// Maps properties to the columns of one table and delegates to [`VirtualObjectBackend`].
pub struct VirtualObjectDataProvider {
    backend: VirtualObjectBackend,
    configuration: Arc<VirtualObjectConfiguration>,
}

impl VirtualObjectDataProvider {
    pub fn new(backend: VirtualObjectBackend, configuration: Arc<VirtualObjectConfiguration>) -> Self {
        VirtualObjectDataProvider { backend, configuration }
    }

    fn column_for(&self, property: &str) -> Result<String, AppError> {
        self.configuration
            .source_key_for_property(property)
            .ok_or_else(|| AppError::InvalidColumnName(format!("the given property '{}' is not defined", property)))
    }

    fn identifier_query(&self, identifier: &str) -> Query {
        let property = self
            .configuration
            .property_for_column(&self.configuration.identifier)
            .unwrap_or(&self.configuration.identifier)
            .to_string();
        Query::structured()
            .constrain(property, Constraint::equal_to(param_value(identifier)))
            .limit(1)
    }

    fn row_from_data(&self, data: &Map<String, Value>) -> Result<Row, AppError> {
        let mut row = Row::new();
        for (property, value) in data {
            row.insert(self.column_for(property)?, QueryValue::from_json(value)?);
        }
        Ok(row)
    }

    fn object_from_row(&self, row: Row) -> Value {
        let object: Map<String, Value> = row
            .into_iter()
            .filter_map(|(column, value)| {
                self.configuration
                    .property_for_column(&column)
                    .map(|property| (property.to_string(), value.to_json()))
            })
            .collect();
        Value::Object(object)
    }
}

/// Query-string values: integers when they parse, text otherwise.
fn param_value(s: &str) -> QueryValue {
    s.parse::<i64>()
        .map(QueryValue::Int)
        .unwrap_or_else(|_| QueryValue::Text(s.to_string()))
}

fn parse_count(name: &str, value: &str) -> Result<u64, AppError> {
    value
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a non-negative integer", name)))
}

#[async_trait]
impl DataProvider for VirtualObjectDataProvider {
    fn query_from_params(&self, params: &[(String, String)]) -> Result<Query, AppError> {
        let mut query = Query::structured().limit(DEFAULT_LIMIT);
        for (key, value) in params {
            match key.as_str() {
                "limit" => query = query.limit(parse_count("limit", value)?.min(MAX_LIMIT)),
                "offset" => query = query.offset(parse_count("offset", value)?),
                "sort" => {
                    for field in value.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                        let (property, direction) = match field.strip_prefix('-') {
                            Some(p) => (p, Direction::Desc),
                            None => (field, Direction::Asc),
                        };
                        query = query.order_by(self.column_for(property)?, direction);
                    }
                }
                property => query = query.constrain(property, Constraint::equal_to(param_value(value))),
            }
        }
        Ok(query)
    }

    async fn fetch_all(&self, query: &Query) -> Result<Vec<Value>, AppError> {
        let rows = self
            .backend
            .object_data_by_query(&self.configuration.table, query, Some(self.configuration.as_ref()))
            .await?;
        Ok(rows.into_iter().map(|row| self.object_from_row(row)).collect())
    }

    async fn fetch(&self, identifier: &str) -> Result<Option<Value>, AppError> {
        let query = self.identifier_query(identifier);
        let rows = self
            .backend
            .object_data_by_query(&self.configuration.table, &query, Some(self.configuration.as_ref()))
            .await?;
        Ok(rows.into_iter().next().map(|row| self.object_from_row(row)))
    }

    async fn create(&self, data: &Map<String, Value>) -> Result<i64, AppError> {
        let row = self.row_from_data(data)?;
        self.backend.insert_row(&self.configuration.table, &row).await
    }

    async fn update(&self, identifier: &str, data: &Map<String, Value>) -> Result<(), AppError> {
        let row = self.row_from_data(data)?;
        let query = self.identifier_query(identifier);
        self.backend
            .update_row(&self.configuration.table, &query, &row)
            .await
            .map(|_| ())
    }

    async fn remove(&self, identifier: &str) -> Result<(), AppError> {
        let query = self.identifier_query(identifier);
        self.backend
            .remove_row(&self.configuration.table, &query)
            .await
            .map(|_| ())
    }
}
