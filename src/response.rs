//! Response type produced by handlers, plus the standard envelope helpers.

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct RestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RestResponse {
    pub fn new(status: StatusCode, body: Option<Value>) -> Self {
        RestResponse {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, None)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl IntoResponse for RestResponse {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        };
        response.headers_mut().extend(self.headers);
        response
    }
}

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

fn envelope<T: Serialize>(status: StatusCode, body: T) -> RestResponse {
    match serde_json::to_value(body) {
        Ok(body) => RestResponse::new(status, Some(body)),
        Err(e) => {
            tracing::error!(error = %e, "response serialization failed");
            RestResponse::new(StatusCode::INTERNAL_SERVER_ERROR, None)
        }
    }
}

pub fn success_one<T: Serialize>(data: T) -> RestResponse {
    envelope(StatusCode::CREATED, SuccessOne { data, meta: None })
}

pub fn success_one_ok<T: Serialize>(data: T) -> RestResponse {
    envelope(StatusCode::OK, SuccessOne { data, meta: None })
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> RestResponse {
    let count = data.len() as u64;
    envelope(
        StatusCode::OK,
        SuccessMany {
            data,
            meta: MetaCount { count },
        },
    )
}
