//! Virtual-object SQL layer: query model, injection-safe compiler, storage.

mod backend;
mod compiler;
pub mod params;
mod query;
pub mod storage;
pub use backend::*;
pub use compiler::*;
pub use query::*;
pub use storage::{quote_literal, MemoryStorage, PgStorage, Row, Storage, StorageFailure};
