//! Request extractors.

mod rest_request;
pub use rest_request::MAX_BODY_BYTES;
