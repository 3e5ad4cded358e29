//! Virtual-object backend: row insertion plus query compilation over a [`Storage`].
//!
//! Only inserts are executed by this backend. Update, delete, count and
//! select-by-query fail with [`AppError::NotImplemented`] once their arguments
//! have been validated.

use crate::error::AppError;
use crate::sql::compiler::{check_column_name, check_table_name, ObjectConfiguration, QueryCompiler};
use crate::sql::query::Query;
use crate::sql::storage::{Row, Storage};
use std::sync::Arc;

/// WHERE / ORDER BY / LIMIT fragments for one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledQuery {
    pub where_clause: String,
    pub order_by: String,
    pub limit: String,
}

#[derive(Clone)]
pub struct VirtualObjectBackend {
    storage: Arc<dyn Storage>,
}

impl VirtualObjectBackend {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        VirtualObjectBackend { storage }
    }

    pub fn compiler(&self) -> QueryCompiler<'_> {
        QueryCompiler::new(self.storage.as_ref())
    }

    /// Compiles every fragment of `query`; no storage call is made.
    pub fn compile(
        &self,
        table: &str,
        query: &Query,
        configuration: Option<&dyn ObjectConfiguration>,
    ) -> Result<CompiledQuery, AppError> {
        let compiler = self.compiler();
        Ok(CompiledQuery {
            where_clause: compiler.compile_where(query, table, configuration)?,
            order_by: compiler.compile_order_by(query)?,
            limit: compiler.compile_limit(query),
        })
    }

    /// Inserts `row` and returns the identifier generated by storage.
    pub async fn insert_row(&self, table: &str, row: &Row) -> Result<i64, AppError> {
        check_table_name(table)?;
        for column in row.keys() {
            check_column_name(column)?;
        }
        let id = self.storage.insert(table, row).await.map_err(|failure| {
            tracing::error!(table, code = %failure.code, info = %failure.info, "insert failed");
            AppError::Storage {
                code: failure.code,
                message: failure.info,
            }
        })?;
        id.trim().parse::<i64>().map_err(|_| AppError::Storage {
            code: String::new(),
            message: format!("storage returned a non-numeric identifier '{}'", id),
        })
    }

    pub async fn update_row(&self, table: &str, _query: &Query, _row: &Row) -> Result<u64, AppError> {
        check_table_name(table)?;
        Err(AppError::NotImplemented("update"))
    }

    pub async fn remove_row(&self, table: &str, _identifier: &Query) -> Result<u64, AppError> {
        check_table_name(table)?;
        Err(AppError::NotImplemented("delete"))
    }

    pub async fn object_count_by_query(
        &self,
        table: &str,
        query: &Query,
        configuration: Option<&dyn ObjectConfiguration>,
    ) -> Result<u64, AppError> {
        self.compile(table, query, configuration)?;
        Err(AppError::NotImplemented("count"))
    }

    pub async fn object_data_by_query(
        &self,
        table: &str,
        query: &Query,
        configuration: Option<&dyn ObjectConfiguration>,
    ) -> Result<Vec<Row>, AppError> {
        let compiled = self.compile(table, query, configuration)?;
        tracing::debug!(table, where_clause = %compiled.where_clause, "select by query");
        Err(AppError::NotImplemented("select by query"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::query::{Constraint, QueryValue};
    use crate::sql::storage::MemoryStorage;

    fn backend() -> (Arc<MemoryStorage>, VirtualObjectBackend) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), VirtualObjectBackend::new(storage))
    }

    fn row() -> Row {
        Row::from([("title".to_string(), QueryValue::from("Hello"))])
    }

    #[tokio::test]
    async fn insert_returns_storage_identifier() {
        let (storage, backend) = backend();
        assert_eq!(backend.insert_row("tx_news", &row()).await.unwrap(), 1);
        assert_eq!(backend.insert_row("tx_news", &row()).await.unwrap(), 2);
        assert_eq!(storage.rows("tx_news").len(), 2);
    }

    #[tokio::test]
    async fn insert_surfaces_storage_errors_verbatim() {
        let (storage, backend) = backend();
        storage.fail_next("1146", "Table 'tx_missing' doesn't exist");
        match backend.insert_row("tx_missing", &row()).await {
            Err(AppError::Storage { code, message }) => {
                assert_eq!(code, "1146");
                assert_eq!(message, "Table 'tx_missing' doesn't exist");
            }
            other => panic!("expected storage error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn insert_validates_names_before_storage() {
        let (storage, backend) = backend();
        assert!(matches!(
            backend.insert_row("news; DROP", &row()).await,
            Err(AppError::InvalidTableName(_))
        ));
        let bad = Row::from([("ti tle".to_string(), QueryValue::from("x"))]);
        assert!(matches!(
            backend.insert_row("news", &bad).await,
            Err(AppError::InvalidColumnName(_))
        ));
        assert!(storage.rows("news").is_empty());
    }

    #[tokio::test]
    async fn unsupported_operations_fail_fast() {
        let (_, backend) = backend();
        let q = Query::structured().constrain("uid", Constraint::equal_to(1));
        assert!(matches!(backend.update_row("t", &q, &row()).await, Err(AppError::NotImplemented(_))));
        assert!(matches!(backend.remove_row("t", &q).await, Err(AppError::NotImplemented(_))));
        assert!(matches!(
            backend.object_count_by_query("t", &q, None).await,
            Err(AppError::NotImplemented(_))
        ));
        assert!(matches!(
            backend.object_data_by_query("t", &q, None).await,
            Err(AppError::NotImplemented(_))
        ));
    }

    #[tokio::test]
    async fn select_reports_validation_errors_first() {
        let (_, backend) = backend();
        let q = Query::statement("a = ?", vec![]);
        assert!(matches!(
            backend.object_data_by_query("t", &q, None).await,
            Err(AppError::MalformedQuery(_))
        ));
    }
}
