//! Resource type: the lookup key for configuration and resolved services.

use crate::case::normalize_dashed;
use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Name of the fallback configuration and of the resource type used when no request is given.
pub const FALLBACK_RESOURCE_TYPE: &str = "all";

fn name_token() -> Result<&'static Regex, ConfigError> {
    static TOKEN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"^[a-z0-9_]+(-[a-z0-9_]+)*$"))
        .as_ref()
        .map_err(|e| ConfigError::Validation(format!("resource type pattern: {}", e)))
}

/// Immutable, normalized resource type name (e.g. "articles", "vendor-blog_post").
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceType(String);

impl ResourceType {
    /// Normalizes `name` and checks it is a name token.
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        let normalized = normalize_dashed(name);
        if normalized.is_empty() || !name_token()?.is_match(&normalized) {
            return Err(ConfigError::InvalidResourceType(name.to_string()));
        }
        Ok(ResourceType(normalized))
    }

    pub fn fallback() -> Self {
        ResourceType(FALLBACK_RESOURCE_TYPE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_fallback(&self) -> bool {
        self.0 == FALLBACK_RESOURCE_TYPE
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ResourceType::new(&value)
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.0
    }
}

impl std::str::FromStr for ResourceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::new(s)
    }
}
