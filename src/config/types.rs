//! Raw config types matching the JSON configuration file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Access policy for reading or writing a resource type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Allow,
    #[default]
    Deny,
    /// Allowed for authenticated principals only.
    Require,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyConfig {
    Column(String),
    Detailed { column: String },
}

impl PropertyConfig {
    pub fn column(&self) -> &str {
        match self {
            PropertyConfig::Column(c) => c,
            PropertyConfig::Detailed { column } => column,
        }
    }
}

fn default_identifier() -> String {
    "uid".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VirtualObjectConfig {
    pub table: String,
    /// Column holding the generated identifier.
    #[serde(default = "default_identifier")]
    pub identifier: String,
    /// Property name -> column.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyConfig>,
}

fn default_handler() -> String {
    "crud".into()
}

fn default_data_provider() -> String {
    "virtual_object".into()
}

fn default_authentication() -> String {
    "basic".into()
}

fn default_access_controller() -> String {
    "configuration".into()
}

fn default_cache() -> String {
    "memory".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceTypeConfig {
    #[serde(default)]
    pub read: AccessMode,
    #[serde(default)]
    pub write: AccessMode,
    #[serde(default = "default_handler")]
    pub handler: String,
    #[serde(default = "default_data_provider")]
    pub data_provider: String,
    #[serde(default = "default_authentication")]
    pub authentication: String,
    #[serde(default = "default_access_controller")]
    pub access_controller: String,
    #[serde(default = "default_cache")]
    pub cache: String,
    /// Seconds a cached response stays valid; 0 disables caching.
    #[serde(default)]
    pub cache_life_time: u64,
    /// Seconds added to the response `Expires` header.
    #[serde(default)]
    pub expires_header_life_time: Option<u64>,
    #[serde(default)]
    pub virtual_object: Option<VirtualObjectConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
}

/// Whole configuration file. The resource type `all` is the fallback for unconfigured types.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default)]
    pub resource_types: BTreeMap<String, ResourceTypeConfig>,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}
