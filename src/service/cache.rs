//! Response caches, one instance per resource type.

use crate::request::RestRequest;
use crate::response::RestResponse;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use std::time::Duration;

pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-rest-cache");

/// Upper bound on responses held per resource type.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

pub trait Cache: Send + Sync {
    fn get(&self, request: &RestRequest) -> Option<RestResponse>;

    fn set(&self, request: &RestRequest, response: &RestResponse);

    /// Adds caching headers to a response leaving the dispatcher.
    fn decorate(&self, response: RestResponse) -> RestResponse {
        response
    }
}

pub struct NoopCache;

impl Cache for NoopCache {
    fn get(&self, _request: &RestRequest) -> Option<RestResponse> {
        None
    }

    fn set(&self, _request: &RestRequest, _response: &RestResponse) {}
}

/// Caches successful GET responses for `life_time`; a zero life time disables it.
pub struct MemoryCache {
    entries: Option<moka::sync::Cache<String, RestResponse>>,
    expires_header_life_time: Option<Duration>,
}

impl MemoryCache {
    pub fn new(life_time: Duration, expires_header_life_time: Option<Duration>) -> Self {
        Self::with_capacity(life_time, expires_header_life_time, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(life_time: Duration, expires_header_life_time: Option<Duration>, max_entries: u64) -> Self {
        let entries = (!life_time.is_zero()).then(|| {
            moka::sync::Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(life_time)
                .build()
        });
        MemoryCache {
            entries,
            expires_header_life_time,
        }
    }

    fn entries_for(&self, request: &RestRequest) -> Option<&moka::sync::Cache<String, RestResponse>> {
        self.entries.as_ref().filter(|_| request.method == Method::GET)
    }

    pub fn len(&self) -> usize {
        match &self.entries {
            Some(entries) => {
                entries.run_pending_tasks();
                entries.entry_count() as usize
            }
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, request: &RestRequest) -> Option<RestResponse> {
        let response = self.entries_for(request)?.get(&request.cache_key())?;
        Some(response.with_header(CACHE_STATUS_HEADER, HeaderValue::from_static("HIT")))
    }

    fn set(&self, request: &RestRequest, response: &RestResponse) {
        if response.status != StatusCode::OK {
            return;
        }
        if let Some(entries) = self.entries_for(request) {
            entries.insert(request.cache_key(), response.clone());
        }
    }

    fn decorate(&self, response: RestResponse) -> RestResponse {
        let Some(expires_in) = self.expires_header_life_time else {
            return response;
        };
        let Some(expires) = chrono::Duration::from_std(expires_in)
            .ok()
            .and_then(|d| chrono::Utc::now().checked_add_signed(d))
        else {
            tracing::warn!(?expires_in, "expires header life time out of range; header skipped");
            return response;
        };
        let expires = expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        match HeaderValue::from_str(&expires) {
            Ok(value) => response.with_header(header::EXPIRES, value),
            Err(_) => response,
        }
    }
}
