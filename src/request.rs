//! One inbound REST request, independent of the HTTP framework.

use crate::error::AppError;
use crate::resource_type::ResourceType;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;
use uuid::Uuid;

/// Parsed from `/<resource_type>[/<identifier>]`.
#[derive(Clone, Debug)]
pub struct RestRequest {
    pub id: Uuid,
    pub method: Method,
    pub path: String,
    pub resource_type: ResourceType,
    pub identifier: Option<String>,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RestRequest {
    pub fn new(method: Method, path: &str) -> Result<Self, AppError> {
        let trimmed = path.trim_matches('/');
        let mut segments = trimmed.split('/').filter(|s| !s.is_empty());
        let segment = segments
            .next()
            .ok_or_else(|| AppError::NotFound("no resource type in path".into()))?;
        let resource_type = ResourceType::new(segment)
            .map_err(|_| AppError::BadRequest(format!("invalid resource type '{}'", segment)))?;
        let identifier = segments.next().map(str::to_string);
        if segments.next().is_some() {
            return Err(AppError::NotFound(format!("unsupported path '{}'", path)));
        }
        Ok(RestRequest {
            id: Uuid::new_v4(),
            method,
            path: format!("/{}", trimmed),
            resource_type,
            identifier,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        })
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, AppError> {
        let value = HeaderValue::from_str(value).map_err(|_| AppError::BadRequest("invalid header value".into()))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// GET, HEAD and OPTIONS are reads; everything else writes.
    pub fn is_read(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    /// Method, path and sorted query; equal for requests that must get the same response.
    pub fn cache_key(&self) -> String {
        let mut query = self.query.clone();
        query.sort();
        let query: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{} {}?{}", self.method, self.path, query.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_type_and_identifier() {
        let r = RestRequest::new(Method::GET, "/BlogPost/12").unwrap();
        assert_eq!(r.resource_type.as_str(), "blog_post");
        assert_eq!(r.identifier.as_deref(), Some("12"));
        assert_eq!(r.path, "/BlogPost/12");

        let r = RestRequest::new(Method::GET, "articles/").unwrap();
        assert_eq!(r.resource_type.as_str(), "articles");
        assert!(r.identifier.is_none());
    }

    #[test]
    fn rejects_empty_and_deep_paths() {
        assert!(matches!(RestRequest::new(Method::GET, "/"), Err(AppError::NotFound(_))));
        assert!(matches!(RestRequest::new(Method::GET, "/a/b/c"), Err(AppError::NotFound(_))));
        assert!(matches!(RestRequest::new(Method::GET, "/a;b"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn cache_key_ignores_query_order() {
        let a = RestRequest::new(Method::GET, "/articles")
            .unwrap()
            .with_query(vec![("b".into(), "2".into()), ("a".into(), "1".into())]);
        let b = RestRequest::new(Method::GET, "/articles")
            .unwrap()
            .with_query(vec![("a".into(), "1".into()), ("b".into(), "2".into())]);
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
