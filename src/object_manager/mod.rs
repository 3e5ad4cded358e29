//! Object manager: resolves the collaborators of a resource type.
//!
//! Every resolution goes through [`ObjectManager::get`]. Shared services are
//! memoized per (tag, configured resource type, args); construction happens
//! outside the lock, so two racing resolutions may both build and the last
//! insert wins.

mod registry;
pub use registry::{
    ConstructionContext, Factory, Lifecycle, Service, ServiceKind, ServiceRegistry, TypeTag, OPTIONS_HANDLER,
};

use crate::config::{ConfigurationProvider, ResourceConfiguration};
use crate::error::AppError;
use crate::request::RestRequest;
use crate::resource_type::ResourceType;
use crate::service::{AccessController, AuthenticationProvider, Cache, DataProvider, Handler, Operation};
use crate::sql::Storage;
use axum::http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A handler plus the operation it should run for the request.
#[derive(Clone)]
pub struct ResolvedHandler {
    pub handler: Arc<dyn Handler>,
    pub operation: Operation,
}

pub struct ObjectManager {
    registry: ServiceRegistry,
    configuration: Arc<dyn ConfigurationProvider>,
    storage: Arc<dyn Storage>,
    instances: RwLock<HashMap<(TypeTag, ResourceType, String), Service>>,
}

fn args_key(args: &[Value]) -> String {
    if args.is_empty() {
        String::new()
    } else {
        Value::from(args.to_vec()).to_string()
    }
}

fn mismatch(tag: &TypeTag, service: &Service) -> AppError {
    AppError::UnresolvableType(format!(
        "factory for {} built a {}",
        tag,
        service.kind().as_str()
    ))
}

impl ObjectManager {
    pub fn new(
        registry: ServiceRegistry,
        configuration: Arc<dyn ConfigurationProvider>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        ObjectManager {
            registry,
            configuration,
            storage,
            instances: RwLock::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }

    pub fn configuration_provider(&self) -> Arc<dyn ConfigurationProvider> {
        self.configuration.clone()
    }

    /// Configuration for `resource_type` (or the `all` fallback).
    pub fn configuration(&self, resource_type: &ResourceType) -> Result<Arc<ResourceConfiguration>, AppError> {
        self.configuration
            .resource_configuration(resource_type)
            .ok_or_else(|| AppError::ConfigurationNotFound(resource_type.to_string()))
    }

    /// Builds (or returns the memoized) service registered under `tag`.
    ///
    /// Shared services are memoized per configured resource type, so every type
    /// that falls back to `all` shares one slot. Constructor `args` are handed to
    /// the factory and are part of the memo key.
    pub fn get(
        &self,
        tag: &TypeTag,
        resource_type: &ResourceType,
        request: Option<&RestRequest>,
        args: &[Value],
    ) -> Result<Service, AppError> {
        let registration = self
            .registry
            .registration(tag)
            .ok_or_else(|| AppError::UnresolvableType(format!("no implementation registered for {}", tag)))?;

        let configuration = self.configuration(resource_type)?;
        let scope = &configuration.resource_type;
        if scope.is_fallback() && scope != resource_type {
            tracing::debug!(tag = %tag, requested = %resource_type, "using fallback configuration");
        }

        let key = (tag.clone(), scope.clone(), args_key(args));
        if registration.lifecycle == Lifecycle::Shared {
            let cached = self
                .instances
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
                .cloned();
            if let Some(service) = cached {
                return Ok(service);
            }
        }

        let ctx = ConstructionContext {
            manager: self,
            resource_type: scope,
            configuration: &configuration,
            request,
            args,
        };
        let service = (registration.factory)(&ctx)?;
        if service.kind() != tag.kind {
            return Err(mismatch(tag, &service));
        }
        tracing::debug!(tag = %tag, resource_type = %scope, "constructed service");

        if registration.lifecycle == Lifecycle::Shared {
            self.instances
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, service.clone());
        }
        Ok(service)
    }

    #[cfg(test)]
    fn memoized(&self) -> usize {
        self.instances.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Resource type of the request, or the fallback for request-less callers.
    fn scope(&self, request: Option<&RestRequest>, stage: &str) -> ResourceType {
        match request {
            Some(r) => r.resource_type.clone(),
            None => {
                tracing::warn!(stage, "resolving without a request is deprecated; using fallback resource type");
                ResourceType::fallback()
            }
        }
    }

    pub fn data_provider(&self, request: Option<&RestRequest>) -> Result<Arc<dyn DataProvider>, AppError> {
        let resource_type = self.scope(request, "data_provider");
        self.resolve_data_provider(&resource_type, request)
    }

    pub fn resolve_data_provider(
        &self,
        resource_type: &ResourceType,
        request: Option<&RestRequest>,
    ) -> Result<Arc<dyn DataProvider>, AppError> {
        let configuration = self.configuration(resource_type)?;
        let tag = TypeTag::new(ServiceKind::DataProvider, configuration.data_provider.as_str());
        match self.get(&tag, resource_type, request, &[])? {
            Service::DataProvider(s) => Ok(s),
            other => Err(mismatch(&tag, &other)),
        }
    }

    pub fn authentication_provider(
        &self,
        request: Option<&RestRequest>,
    ) -> Result<Arc<dyn AuthenticationProvider>, AppError> {
        let resource_type = self.scope(request, "authentication");
        self.resolve_authentication_provider(&resource_type, request)
    }

    pub fn resolve_authentication_provider(
        &self,
        resource_type: &ResourceType,
        request: Option<&RestRequest>,
    ) -> Result<Arc<dyn AuthenticationProvider>, AppError> {
        let configuration = self.configuration(resource_type)?;
        let tag = TypeTag::new(ServiceKind::AuthenticationProvider, configuration.authentication.as_str());
        match self.get(&tag, resource_type, request, &[])? {
            Service::AuthenticationProvider(s) => Ok(s),
            other => Err(mismatch(&tag, &other)),
        }
    }

    pub fn access_controller(&self, request: Option<&RestRequest>) -> Result<Arc<dyn AccessController>, AppError> {
        let resource_type = self.scope(request, "access_controller");
        self.resolve_access_controller(&resource_type, request)
    }

    pub fn resolve_access_controller(
        &self,
        resource_type: &ResourceType,
        request: Option<&RestRequest>,
    ) -> Result<Arc<dyn AccessController>, AppError> {
        let configuration = self.configuration(resource_type)?;
        let tag = TypeTag::new(ServiceKind::AccessController, configuration.access_controller.as_str());
        match self.get(&tag, resource_type, request, &[])? {
            Service::AccessController(s) => Ok(s),
            other => Err(mismatch(&tag, &other)),
        }
    }

    /// The only stage that looks at the verb and path shape of the request.
    /// Without a request, the configured handler is returned for a listing.
    pub fn handler(&self, request: Option<&RestRequest>) -> Result<ResolvedHandler, AppError> {
        let resource_type = self.scope(request, "handler");
        self.resolve_handler(&resource_type, request)
    }

    pub fn resolve_handler(
        &self,
        resource_type: &ResourceType,
        request: Option<&RestRequest>,
    ) -> Result<ResolvedHandler, AppError> {
        let configuration = self.configuration(resource_type)?;
        let operation = match request {
            Some(r) => Operation::for_request(&r.method, r.identifier.is_some())?,
            None => Operation::List,
        };
        let name = match request {
            Some(r) if r.method == Method::OPTIONS => OPTIONS_HANDLER,
            _ => configuration.handler.as_str(),
        };
        let tag = TypeTag::new(ServiceKind::Handler, name);
        match self.get(&tag, resource_type, request, &[])? {
            Service::Handler(handler) => Ok(ResolvedHandler { handler, operation }),
            other => Err(mismatch(&tag, &other)),
        }
    }

    /// Caches depend on the resource type only.
    pub fn cache(&self, resource_type: &ResourceType) -> Result<Arc<dyn Cache>, AppError> {
        let configuration = self.configuration(resource_type)?;
        let tag = TypeTag::new(ServiceKind::Cache, configuration.cache.as_str());
        match self.get(&tag, resource_type, None, &[])? {
            Service::Cache(s) => Ok(s),
            other => Err(mismatch(&tag, &other)),
        }
    }

    /// Checks that every implementation named in configuration is registered.
    pub fn verify(&self) -> Result<(), AppError> {
        let mut missing = Vec::new();
        for resource_type in self.configuration.resource_types() {
            let configuration = self.configuration(&resource_type)?;
            for tag in [
                TypeTag::new(ServiceKind::DataProvider, configuration.data_provider.as_str()),
                TypeTag::new(ServiceKind::AuthenticationProvider, configuration.authentication.as_str()),
                TypeTag::new(ServiceKind::AccessController, configuration.access_controller.as_str()),
                TypeTag::new(ServiceKind::Handler, configuration.handler.as_str()),
                TypeTag::new(ServiceKind::Cache, configuration.cache.as_str()),
            ] {
                if !self.registry.contains(&tag) {
                    missing.push(format!("{} ({})", tag, resource_type));
                }
            }
        }
        let options = TypeTag::new(ServiceKind::Handler, OPTIONS_HANDLER);
        if !self.registry.contains(&options) {
            missing.push(options.to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::UnresolvableType(format!(
                "unregistered implementations: {}",
                missing.join(", ")
            )))
        }
    }
}
