//! Configuration: raw file types, loading, validation, and the resolved per-resource-type view.

pub mod types;
pub mod loader;
pub mod validator;
pub mod resolved;

pub use types::*;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
