//! Typed errors and HTTP mapping.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("config parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid resource type name: '{0}'")]
    InvalidResourceType(String),
    #[error("invalid identifier in {context}: '{name}'")]
    InvalidIdentifier { context: String, name: String },
    #[error("duplicate user: {0}")]
    DuplicateUser(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("malformed query: {0}")]
    MalformedQuery(String),
    #[error("invalid column name: {0}")]
    InvalidColumnName(String),
    #[error("invalid table name: {0}")]
    InvalidTableName(String),
    #[error("invalid operator: {0}")]
    InvalidOperator(String),
    #[error("storage error #{code}: {message}")]
    Storage { code: String, message: String },
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("no configuration for resource type '{0}'")]
    ConfigurationNotFound(String),
    #[error("unresolvable type: {0}")]
    UnresolvableType(String),
    #[error("authentication required: {0}")]
    Authentication(String),
    #[error("forbidden: {0}")]
    Authorization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Status and machine-readable code for the error body.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::MalformedQuery(_) => (StatusCode::BAD_REQUEST, "malformed_query"),
            AppError::InvalidColumnName(_) => (StatusCode::BAD_REQUEST, "invalid_column_name"),
            AppError::InvalidTableName(_) => (StatusCode::BAD_REQUEST, "invalid_table_name"),
            AppError::InvalidOperator(_) => (StatusCode::BAD_REQUEST, "invalid_operator"),
            AppError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            AppError::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "not_implemented"),
            AppError::ConfigurationNotFound(_) => (StatusCode::NOT_FOUND, "configuration_not_found"),
            AppError::UnresolvableType(_) => (StatusCode::INTERNAL_SERVER_ERROR, "unresolvable_type"),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "authentication_required"),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let details = match &self {
            AppError::Storage { code, .. } => Some(serde_json::json!({ "storage_code": code })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        let mut response = (status, Json(body)).into_response();
        if matches!(self, AppError::Authentication(_)) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"rest\""),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_client_errors() {
        for err in [
            AppError::MalformedQuery("x".into()),
            AppError::InvalidColumnName("x".into()),
            AppError::InvalidOperator("x".into()),
        ] {
            assert!(err.status_and_code().0.is_client_error(), "{err}");
        }
    }

    #[test]
    fn storage_and_resolution_errors_map_to_server_errors() {
        let storage = AppError::Storage {
            code: "23505".into(),
            message: "duplicate key".into(),
        };
        assert_eq!(storage.status_and_code(), (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"));
        assert_eq!(storage.to_string(), "storage error #23505: duplicate key");
        assert!(AppError::UnresolvableType("handler 'x'".into())
            .status_and_code()
            .0
            .is_server_error());
    }

    #[test]
    fn authentication_error_sets_challenge_header() {
        let response = AppError::Authentication("login required".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let response = AppError::Authorization("denied".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
