//! HTTP routes.

mod common;
mod rest;
pub use common::{common_routes, common_routes_with_ready};
pub use rest::rest_routes;
