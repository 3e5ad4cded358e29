//! Collaborator services resolved per resource type: authentication, access control,
//! data providers, handlers and caches.

mod access;
mod auth;
mod cache;
mod data_provider;
mod handler;
pub use access::{AccessController, AccessDecision, ConfigurationAccessController};
pub use auth::{AnonymousAuthenticationProvider, AuthenticationProvider, BasicAuthenticationProvider, Principal};
pub use cache::{Cache, MemoryCache, NoopCache, CACHE_STATUS_HEADER};
pub use data_provider::{DataProvider, VirtualObjectDataProvider};
pub use handler::{CrudHandler, Handler, Operation, OptionsHandler};
