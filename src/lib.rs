//! REST request dispatch: resolves per-resource-type collaborators, runs
//! authentication, authorization, handler and cache in order, and compiles
//! virtual-object queries to injection-safe SQL.

pub mod case;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extractors;
pub mod object_manager;
pub mod request;
pub mod resource_type;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load_from_path, load_from_str, resolve, ConfigurationProvider, ResolvedConfiguration, RestConfig, Settings};
pub use dispatcher::Dispatcher;
pub use error::{AppError, ConfigError};
pub use object_manager::{Lifecycle, ObjectManager, Service, ServiceKind, ServiceRegistry, TypeTag};
pub use request::RestRequest;
pub use resource_type::ResourceType;
pub use response::{success_many, success_one, RestResponse};
pub use routes::{common_routes, common_routes_with_ready, rest_routes};
pub use sql::{MemoryStorage, PgStorage, Storage};
pub use state::AppState;
