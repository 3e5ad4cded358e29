//! Authentication providers: extract and check credentials from a request.

use crate::config::ConfigurationProvider;
use crate::error::AppError;
use crate::request::RestRequest;
use axum::http::header::AUTHORIZATION;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

pub trait AuthenticationProvider: Send + Sync {
    /// `Ok(None)` when the request carries no credentials this provider understands;
    /// `Err(AppError::Authentication)` when it carries credentials that do not check out.
    fn authenticate(&self, request: &RestRequest) -> Result<Option<Principal>, AppError>;
}

/// Never authenticates anyone.
pub struct AnonymousAuthenticationProvider;

impl AuthenticationProvider for AnonymousAuthenticationProvider {
    fn authenticate(&self, _request: &RestRequest) -> Result<Option<Principal>, AppError> {
        Ok(None)
    }
}

/// HTTP Basic against the configured users.
pub struct BasicAuthenticationProvider {
    configuration: Arc<dyn ConfigurationProvider>,
}

impl BasicAuthenticationProvider {
    pub fn new(configuration: Arc<dyn ConfigurationProvider>) -> Self {
        BasicAuthenticationProvider { configuration }
    }
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn decode_basic(header: &str) -> Option<Result<(String, String), AppError>> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let malformed = || AppError::Authentication("malformed basic credentials".into());
    let decoded = match STANDARD.decode(encoded.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return Some(Err(malformed())),
    };
    let decoded = match String::from_utf8(decoded) {
        Ok(s) => s,
        Err(_) => return Some(Err(malformed())),
    };
    Some(
        decoded
            .split_once(':')
            .map(|(u, p)| (u.to_string(), p.to_string()))
            .ok_or_else(malformed),
    )
}

impl AuthenticationProvider for BasicAuthenticationProvider {
    fn authenticate(&self, request: &RestRequest) -> Result<Option<Principal>, AppError> {
        let Some(header) = request.headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let header = header
            .to_str()
            .map_err(|_| AppError::Authentication("malformed authorization header".into()))?;
        let Some(credentials) = decode_basic(header) else {
            return Ok(None);
        };
        let (username, password) = credentials?;
        match self.configuration.password_for(&username) {
            Some(expected) if constant_time_eq(expected.as_bytes(), password.as_bytes()) => {
                Ok(Some(Principal { username }))
            }
            _ => {
                tracing::warn!(request_id = %request.id, username = %username, "basic authentication failed");
                Err(AppError::Authentication("invalid credentials".into()))
            }
        }
    }
}
