//! Handlers turn an authorized request into a response.

use crate::error::AppError;
use crate::request::RestRequest;
use crate::response::{success_many, success_one, success_one_ok, RestResponse};
use crate::service::DataProvider;
use async_trait::async_trait;
use axum::http::{header, HeaderValue, Method};
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    List,
    Show,
    Create,
    Update,
    Delete,
    Options,
}

impl Operation {
    /// Maps method and presence of an identifier to an operation.
    pub fn for_request(method: &Method, has_identifier: bool) -> Result<Self, AppError> {
        match (method, has_identifier) {
            (&Method::OPTIONS, _) => Ok(Operation::Options),
            (&Method::GET | &Method::HEAD, false) => Ok(Operation::List),
            (&Method::GET | &Method::HEAD, true) => Ok(Operation::Show),
            (&Method::POST, false) => Ok(Operation::Create),
            (&Method::PUT | &Method::PATCH, true) => Ok(Operation::Update),
            (&Method::DELETE, true) => Ok(Operation::Delete),
            (m, true) => Err(AppError::MethodNotAllowed(format!("{} on a single object", m))),
            (m, false) => Err(AppError::MethodNotAllowed(format!("{} on a collection", m))),
        }
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &RestRequest, operation: Operation) -> Result<RestResponse, AppError>;
}

/// List/show/create/update/delete over a [`DataProvider`].
pub struct CrudHandler {
    data_provider: Arc<dyn DataProvider>,
    read_only: bool,
}

impl CrudHandler {
    pub fn new(data_provider: Arc<dyn DataProvider>) -> Self {
        CrudHandler {
            data_provider,
            read_only: false,
        }
    }

    pub fn read_only(data_provider: Arc<dyn DataProvider>) -> Self {
        CrudHandler {
            data_provider,
            read_only: true,
        }
    }
}

fn body_object(request: &RestRequest) -> Result<&Map<String, Value>, AppError> {
    request
        .body
        .as_ref()
        .and_then(Value::as_object)
        .ok_or_else(|| AppError::BadRequest("request body must be a JSON object".into()))
}

fn identifier(request: &RestRequest) -> Result<&str, AppError> {
    request
        .identifier
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("missing identifier".into()))
}

#[async_trait]
impl Handler for CrudHandler {
    async fn handle(&self, request: &RestRequest, operation: Operation) -> Result<RestResponse, AppError> {
        if self.read_only && !matches!(operation, Operation::List | Operation::Show) {
            return Err(AppError::MethodNotAllowed(format!(
                "resource type '{}' is read-only",
                request.resource_type
            )));
        }
        match operation {
            Operation::List => {
                let query = self.data_provider.query_from_params(&request.query)?;
                let objects = self.data_provider.fetch_all(&query).await?;
                Ok(success_many(objects))
            }
            Operation::Show => {
                let id = identifier(request)?;
                match self.data_provider.fetch(id).await? {
                    Some(object) => Ok(success_one_ok(object)),
                    None => Err(AppError::NotFound(format!("{}/{}", request.resource_type, id))),
                }
            }
            Operation::Create => {
                let id = self.data_provider.create(body_object(request)?).await?;
                tracing::info!(request_id = %request.id, resource_type = %request.resource_type, id, "created");
                Ok(success_one(json!({ "id": id })))
            }
            Operation::Update => {
                let id = identifier(request)?;
                self.data_provider.update(id, body_object(request)?).await?;
                Ok(success_one_ok(json!({ "id": id })))
            }
            Operation::Delete => {
                self.data_provider.remove(identifier(request)?).await?;
                Ok(RestResponse::no_content())
            }
            Operation::Options => Err(AppError::MethodNotAllowed("OPTIONS".into())),
        }
    }
}

/// Answers OPTIONS with the allowed methods.
pub struct OptionsHandler {
    allow: HeaderValue,
}

impl OptionsHandler {
    pub fn new(read_only: bool) -> Self {
        let allow = if read_only {
            "GET, HEAD, OPTIONS"
        } else {
            "GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS"
        };
        OptionsHandler {
            allow: HeaderValue::from_static(allow),
        }
    }
}

#[async_trait]
impl Handler for OptionsHandler {
    async fn handle(&self, _request: &RestRequest, _operation: Operation) -> Result<RestResponse, AppError> {
        Ok(RestResponse::no_content().with_header(header::ALLOW, self.allow.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VirtualObjectConfiguration;
    use crate::service::VirtualObjectDataProvider;
    use crate::sql::{MemoryStorage, VirtualObjectBackend};
    use axum::http::StatusCode;
    use std::collections::BTreeMap;

    fn data_provider() -> (Arc<MemoryStorage>, Arc<dyn DataProvider>) {
        let storage = Arc::new(MemoryStorage::new());
        let configuration = Arc::new(VirtualObjectConfiguration {
            table: "tx_news".into(),
            identifier: "uid".into(),
            properties: BTreeMap::from([
                ("title".to_string(), "header".to_string()),
                ("uid".to_string(), "uid".to_string()),
            ]),
        });
        let provider = VirtualObjectDataProvider::new(VirtualObjectBackend::new(storage.clone()), configuration);
        (storage, Arc::new(provider))
    }

    #[test]
    fn operations_follow_method_and_identifier() {
        assert_eq!(Operation::for_request(&Method::GET, false).unwrap(), Operation::List);
        assert_eq!(Operation::for_request(&Method::GET, true).unwrap(), Operation::Show);
        assert_eq!(Operation::for_request(&Method::POST, false).unwrap(), Operation::Create);
        assert_eq!(Operation::for_request(&Method::PATCH, true).unwrap(), Operation::Update);
        assert_eq!(Operation::for_request(&Method::DELETE, true).unwrap(), Operation::Delete);
        assert_eq!(Operation::for_request(&Method::OPTIONS, true).unwrap(), Operation::Options);
        assert!(matches!(
            Operation::for_request(&Method::POST, true),
            Err(AppError::MethodNotAllowed(_))
        ));
        assert!(matches!(
            Operation::for_request(&Method::DELETE, false),
            Err(AppError::MethodNotAllowed(_))
        ));
    }

    #[tokio::test]
    async fn create_returns_201_with_identifier() {
        let (storage, provider) = data_provider();
        let handler = CrudHandler::new(provider);
        let request = RestRequest::new(Method::POST, "/news")
            .unwrap()
            .with_body(Some(json!({"title": "Hello"})));
        let response = handler.handle(&request, Operation::Create).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body, Some(json!({"data": {"id": 1}})));
        assert_eq!(storage.rows("tx_news").len(), 1);
    }

    #[tokio::test]
    async fn create_requires_object_body() {
        let (_, provider) = data_provider();
        let handler = CrudHandler::new(provider);
        let request = RestRequest::new(Method::POST, "/news").unwrap().with_body(Some(json!([1])));
        assert!(matches!(
            handler.handle(&request, Operation::Create).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn read_only_rejects_writes() {
        let (storage, provider) = data_provider();
        let handler = CrudHandler::read_only(provider);
        let request = RestRequest::new(Method::POST, "/news")
            .unwrap()
            .with_body(Some(json!({"title": "Hello"})));
        assert!(matches!(
            handler.handle(&request, Operation::Create).await,
            Err(AppError::MethodNotAllowed(_))
        ));
        assert!(storage.rows("tx_news").is_empty());
    }

    #[tokio::test]
    async fn options_lists_allowed_methods() {
        let request = RestRequest::new(Method::OPTIONS, "/news").unwrap();
        let response = OptionsHandler::new(true)
            .handle(&request, Operation::Options)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert_eq!(response.headers[header::ALLOW], "GET, HEAD, OPTIONS");
    }
}
