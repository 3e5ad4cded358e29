//! Type tags, factories and the default registrations.

use crate::config::ResourceConfiguration;
use crate::error::AppError;
use crate::object_manager::ObjectManager;
use crate::request::RestRequest;
use crate::resource_type::ResourceType;
use crate::service::{
    AccessController, AnonymousAuthenticationProvider, AuthenticationProvider, BasicAuthenticationProvider, Cache,
    ConfigurationAccessController, CrudHandler, DataProvider, Handler, MemoryCache, NoopCache, OptionsHandler,
    VirtualObjectDataProvider,
};
use crate::sql::VirtualObjectBackend;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Handler selected for `OPTIONS` regardless of configuration.
pub const OPTIONS_HANDLER: &str = "options";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    DataProvider,
    AuthenticationProvider,
    AccessController,
    Handler,
    Cache,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::DataProvider => "data_provider",
            ServiceKind::AuthenticationProvider => "authentication",
            ServiceKind::AccessController => "access_controller",
            ServiceKind::Handler => "handler",
            ServiceKind::Cache => "cache",
        }
    }
}

/// Names one registered implementation of a service kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    pub kind: ServiceKind,
    pub name: String,
}

impl TypeTag {
    pub fn new(kind: ServiceKind, name: impl Into<String>) -> Self {
        TypeTag {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Built once per resource type and memoized by the object manager.
    Shared,
    /// Built on every resolution.
    PerRequest,
}

/// A constructed collaborator.
#[derive(Clone)]
pub enum Service {
    DataProvider(Arc<dyn DataProvider>),
    AuthenticationProvider(Arc<dyn AuthenticationProvider>),
    AccessController(Arc<dyn AccessController>),
    Handler(Arc<dyn Handler>),
    Cache(Arc<dyn Cache>),
}

impl Service {
    pub fn kind(&self) -> ServiceKind {
        match self {
            Service::DataProvider(_) => ServiceKind::DataProvider,
            Service::AuthenticationProvider(_) => ServiceKind::AuthenticationProvider,
            Service::AccessController(_) => ServiceKind::AccessController,
            Service::Handler(_) => ServiceKind::Handler,
            Service::Cache(_) => ServiceKind::Cache,
        }
    }
}

/// Everything a factory may depend on.
pub struct ConstructionContext<'a> {
    pub manager: &'a ObjectManager,
    pub resource_type: &'a ResourceType,
    pub configuration: &'a ResourceConfiguration,
    pub request: Option<&'a RestRequest>,
    /// Caller-supplied constructor arguments.
    pub args: &'a [Value],
}

pub type Factory = Arc<dyn Fn(&ConstructionContext<'_>) -> Result<Service, AppError> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) factory: Factory,
}

#[derive(Clone, Default)]
pub struct ServiceRegistry {
    entries: HashMap<TypeTag, Registration>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in implementations.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            TypeTag::new(ServiceKind::DataProvider, "virtual_object"),
            Lifecycle::Shared,
            |ctx| {
                let configuration = ctx.configuration.virtual_object.clone().ok_or_else(|| {
                    AppError::UnresolvableType(format!(
                        "resource type '{}' has no virtual_object configuration",
                        ctx.resource_type
                    ))
                })?;
                let backend = VirtualObjectBackend::new(ctx.manager.storage());
                Ok(Service::DataProvider(Arc::new(VirtualObjectDataProvider::new(
                    backend,
                    configuration,
                ))))
            },
        );
        registry.register(
            TypeTag::new(ServiceKind::AuthenticationProvider, "none"),
            Lifecycle::Shared,
            |_| Ok(Service::AuthenticationProvider(Arc::new(AnonymousAuthenticationProvider))),
        );
        registry.register(
            TypeTag::new(ServiceKind::AuthenticationProvider, "basic"),
            Lifecycle::Shared,
            |ctx| {
                Ok(Service::AuthenticationProvider(Arc::new(BasicAuthenticationProvider::new(
                    ctx.manager.configuration_provider(),
                ))))
            },
        );
        registry.register(
            TypeTag::new(ServiceKind::AccessController, "configuration"),
            Lifecycle::Shared,
            |ctx| {
                Ok(Service::AccessController(Arc::new(ConfigurationAccessController::new(
                    ctx.configuration.read,
                    ctx.configuration.write,
                ))))
            },
        );
        registry.register(TypeTag::new(ServiceKind::Handler, "crud"), Lifecycle::Shared, |ctx| {
            let data_provider = ctx.manager.resolve_data_provider(ctx.resource_type, ctx.request)?;
            Ok(Service::Handler(Arc::new(CrudHandler::new(data_provider))))
        });
        registry.register(TypeTag::new(ServiceKind::Handler, "read_only"), Lifecycle::Shared, |ctx| {
            let data_provider = ctx.manager.resolve_data_provider(ctx.resource_type, ctx.request)?;
            Ok(Service::Handler(Arc::new(CrudHandler::read_only(data_provider))))
        });
        registry.register(
            TypeTag::new(ServiceKind::Handler, OPTIONS_HANDLER),
            Lifecycle::Shared,
            |ctx| {
                let read_only = ctx.configuration.handler == "read_only";
                Ok(Service::Handler(Arc::new(OptionsHandler::new(read_only))))
            },
        );
        registry.register(TypeTag::new(ServiceKind::Cache, "memory"), Lifecycle::Shared, |ctx| {
            Ok(Service::Cache(Arc::new(MemoryCache::new(
                ctx.configuration.cache_life_time,
                ctx.configuration.expires_header_life_time,
            ))))
        });
        registry.register(TypeTag::new(ServiceKind::Cache, "none"), Lifecycle::Shared, |_| {
            Ok(Service::Cache(Arc::new(NoopCache)))
        });
        registry
    }

    /// Adds or replaces the factory for `tag`.
    pub fn register<F>(&mut self, tag: TypeTag, lifecycle: Lifecycle, factory: F) -> &mut Self
    where
        F: Fn(&ConstructionContext<'_>) -> Result<Service, AppError> + Send + Sync + 'static,
    {
        self.entries.insert(
            tag,
            Registration {
                lifecycle,
                factory: Arc::new(factory),
            },
        );
        self
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.entries.contains_key(tag)
    }

    pub(crate) fn registration(&self, tag: &TypeTag) -> Option<&Registration> {
        self.entries.get(tag)
    }
}
