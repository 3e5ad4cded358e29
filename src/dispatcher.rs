//! Request dispatch: authentication, authorization, handler, cache.

use crate::error::AppError;
use crate::object_manager::ObjectManager;
use crate::request::RestRequest;
use crate::response::RestResponse;
use crate::service::AccessDecision;
use std::sync::Arc;

#[derive(Clone)]
pub struct Dispatcher {
    object_manager: Arc<ObjectManager>,
}

impl Dispatcher {
    pub fn new(object_manager: Arc<ObjectManager>) -> Self {
        Dispatcher { object_manager }
    }

    pub fn object_manager(&self) -> &Arc<ObjectManager> {
        &self.object_manager
    }

    /// Runs the stages in a fixed order. Authentication and authorization
    /// failures return before the handler or the cache are consulted.
    pub async fn dispatch(&self, request: RestRequest) -> Result<RestResponse, AppError> {
        let manager = &self.object_manager;
        let resource_type = request.resource_type.clone();
        tracing::info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            resource_type = %resource_type,
            "dispatch"
        );

        manager.configuration(&resource_type)?;

        let principal = manager
            .resolve_authentication_provider(&resource_type, Some(&request))?
            .authenticate(&request)?;

        let access = manager.resolve_access_controller(&resource_type, Some(&request))?;
        match access.authorize(&request, principal.as_ref()) {
            AccessDecision::Granted => {}
            AccessDecision::LoginRequired => {
                tracing::info!(request_id = %request.id, "login required");
                return Err(AppError::Authentication(format!(
                    "login required for '{}'",
                    resource_type
                )));
            }
            AccessDecision::Denied => {
                tracing::info!(request_id = %request.id, user = ?principal.as_ref().map(|p| &p.username), "access denied");
                return Err(AppError::Authorization(format!(
                    "access to '{}' denied",
                    resource_type
                )));
            }
        }

        let resolved = manager.resolve_handler(&resource_type, Some(&request))?;
        let cache = manager.cache(&resource_type)?;
        if let Some(hit) = cache.get(&request) {
            tracing::debug!(request_id = %request.id, "cache hit");
            return Ok(cache.decorate(hit));
        }

        let response = resolved.handler.handle(&request, resolved.operation).await?;
        cache.set(&request, &response);
        tracing::debug!(request_id = %request.id, status = %response.status, "handled");
        Ok(cache.decorate(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_from_str, resolve};
    use crate::object_manager::{Lifecycle, Service, ServiceKind, ServiceRegistry, TypeTag};
    use crate::response::success_many;
    use crate::service::{Handler, Operation, CACHE_STATUS_HEADER};
    use crate::sql::MemoryStorage;
    use async_trait::async_trait;
    use axum::http::{header, Method, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CONFIG: &str = r#"{
        "resource_types": {
            "open": {"read": "allow", "write": "allow", "handler": "counting", "cache_life_time": 30},
            "members": {"read": "require", "handler": "counting"},
            "members_cached": {"read": "require", "handler": "counting", "cache_life_time": 30},
            "closed": {"read": "deny", "handler": "counting"},
            "articles": {
                "read": "allow",
                "write": "require",
                "virtual_object": {"table": "tx_articles", "properties": {"title": "header"}}
            }
        },
        "users": [{"username": "editor", "password": "s3cret"}]
    }"#;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Handler for Counting {
        async fn handle(&self, _request: &RestRequest, _operation: Operation) -> Result<RestResponse, AppError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(success_many(vec![json!({"title": "x"})]))
        }
    }

    fn dispatcher() -> (Arc<AtomicUsize>, Arc<MemoryStorage>, Dispatcher) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ServiceRegistry::with_defaults();
        let counter = calls.clone();
        registry.register(TypeTag::new(ServiceKind::Handler, "counting"), Lifecycle::Shared, move |_| {
            Ok(Service::Handler(Arc::new(Counting(counter.clone()))))
        });
        let storage = Arc::new(MemoryStorage::new());
        let configuration = resolve(&load_from_str(CONFIG).unwrap()).unwrap();
        let manager = ObjectManager::new(registry, Arc::new(configuration), storage.clone());
        (calls, storage, Dispatcher::new(Arc::new(manager)))
    }

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
    }

    #[tokio::test]
    async fn unauthenticated_request_never_reaches_handler() {
        let (calls, _, dispatcher) = dispatcher();
        let request = RestRequest::new(Method::GET, "/members").unwrap();
        assert!(matches!(dispatcher.dispatch(request).await, Err(AppError::Authentication(_))));

        let request = RestRequest::new(Method::GET, "/members")
            .unwrap()
            .with_header(header::AUTHORIZATION, &basic("editor", "wrong"))
            .unwrap();
        assert!(matches!(dispatcher.dispatch(request).await, Err(AppError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let request = RestRequest::new(Method::GET, "/members")
            .unwrap()
            .with_header(header::AUTHORIZATION, &basic("editor", "s3cret"))
            .unwrap();
        assert_eq!(dispatcher.dispatch(request).await.unwrap().status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denied_request_never_reaches_handler() {
        let (calls, _, dispatcher) = dispatcher();
        let request = RestRequest::new(Method::GET, "/closed")
            .unwrap()
            .with_header(header::AUTHORIZATION, &basic("editor", "s3cret"))
            .unwrap();
        assert!(matches!(dispatcher.dispatch(request).await, Err(AppError::Authorization(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cache_hit_skips_handler() {
        let (calls, _, dispatcher) = dispatcher();
        let first = dispatcher
            .dispatch(RestRequest::new(Method::GET, "/open").unwrap())
            .await
            .unwrap();
        assert!(!first.headers.contains_key(CACHE_STATUS_HEADER));

        let second = dispatcher
            .dispatch(RestRequest::new(Method::GET, "/open").unwrap())
            .await
            .unwrap();
        assert_eq!(second.headers[CACHE_STATUS_HEADER], "HIT");
        assert_eq!(second.body, first.body);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn warm_cache_does_not_bypass_authentication() {
        let (calls, _, dispatcher) = dispatcher();
        let request = RestRequest::new(Method::GET, "/members_cached")
            .unwrap()
            .with_header(header::AUTHORIZATION, &basic("editor", "s3cret"))
            .unwrap();
        assert_eq!(dispatcher.dispatch(request).await.unwrap().status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let anonymous = RestRequest::new(Method::GET, "/members_cached").unwrap();
        assert!(matches!(dispatcher.dispatch(anonymous).await, Err(AppError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let request = RestRequest::new(Method::GET, "/members_cached")
            .unwrap()
            .with_header(header::AUTHORIZATION, &basic("editor", "s3cret"))
            .unwrap();
        let hit = dispatcher.dispatch(request).await.unwrap();
        assert_eq!(hit.headers[CACHE_STATUS_HEADER], "HIT");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unconfigured_resource_type_is_not_found() {
        let (_, _, dispatcher) = dispatcher();
        let request = RestRequest::new(Method::GET, "/nothing").unwrap();
        assert!(matches!(
            dispatcher.dispatch(request).await,
            Err(AppError::ConfigurationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn authenticated_post_inserts_row() {
        let (_, storage, dispatcher) = dispatcher();
        let request = RestRequest::new(Method::POST, "/articles")
            .unwrap()
            .with_header(header::AUTHORIZATION, &basic("editor", "s3cret"))
            .unwrap()
            .with_body(Some(json!({"title": "Hello"})));
        let response = dispatcher.dispatch(request).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body, Some(json!({"data": {"id": 1}})));
        assert_eq!(storage.rows("tx_articles").len(), 1);
    }
}
