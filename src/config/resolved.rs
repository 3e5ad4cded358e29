//! Resolved configuration: validated and keyed by resource type for runtime lookup.

use crate::config::{validate, AccessMode, RestConfig};
use crate::error::ConfigError;
use crate::resource_type::ResourceType;
use crate::sql::ObjectConfiguration;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Table, identifier column and property -> column mapping of a virtual object.
#[derive(Clone, Debug)]
pub struct VirtualObjectConfiguration {
    pub table: String,
    pub identifier: String,
    pub properties: BTreeMap<String, String>,
}

impl VirtualObjectConfiguration {
    pub fn property_for_column(&self, column: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(_, c)| c.as_str() == column)
            .map(|(p, _)| p.as_str())
    }
}

impl ObjectConfiguration for VirtualObjectConfiguration {
    fn has_property(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    fn source_key_for_property(&self, property: &str) -> Option<String> {
        self.properties.get(property).cloned()
    }
}

#[derive(Clone, Debug)]
pub struct ResourceConfiguration {
    pub resource_type: ResourceType,
    pub read: AccessMode,
    pub write: AccessMode,
    pub handler: String,
    pub data_provider: String,
    pub authentication: String,
    pub access_controller: String,
    pub cache: String,
    pub cache_life_time: Duration,
    pub expires_header_life_time: Option<Duration>,
    pub virtual_object: Option<Arc<VirtualObjectConfiguration>>,
}

/// Supplies per-resource-type configuration and user credentials.
pub trait ConfigurationProvider: Send + Sync {
    /// Configuration for `resource_type`, falling back to the `all` entry when present.
    fn resource_configuration(&self, resource_type: &ResourceType) -> Option<Arc<ResourceConfiguration>>;

    /// Explicitly configured resource types.
    fn resource_types(&self) -> Vec<ResourceType>;

    fn password_for(&self, username: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedConfiguration {
    by_type: HashMap<ResourceType, Arc<ResourceConfiguration>>,
    users: HashMap<String, String>,
}

impl ConfigurationProvider for ResolvedConfiguration {
    fn resource_configuration(&self, resource_type: &ResourceType) -> Option<Arc<ResourceConfiguration>> {
        self.by_type
            .get(resource_type)
            .or_else(|| self.by_type.get(&ResourceType::fallback()))
            .cloned()
    }

    fn resource_types(&self) -> Vec<ResourceType> {
        let mut types: Vec<_> = self.by_type.keys().cloned().collect();
        types.sort();
        types
    }

    fn password_for(&self, username: &str) -> Option<String> {
        self.users.get(username).cloned()
    }
}

/// Build resolved configuration from the raw file (validates first).
pub fn resolve(config: &RestConfig) -> Result<ResolvedConfiguration, ConfigError> {
    validate(config)?;

    let mut by_type = HashMap::new();
    for (name, rt) in &config.resource_types {
        let resource_type = ResourceType::new(name)?;
        let virtual_object = rt.virtual_object.as_ref().map(|vo| {
            let mut properties: BTreeMap<String, String> = vo
                .properties
                .iter()
                .map(|(p, c)| (p.clone(), c.column().to_string()))
                .collect();
            if !properties.values().any(|c| *c == vo.identifier) {
                properties.insert(vo.identifier.clone(), vo.identifier.clone());
            }
            Arc::new(VirtualObjectConfiguration {
                table: vo.table.clone(),
                identifier: vo.identifier.clone(),
                properties,
            })
        });
        let resolved = ResourceConfiguration {
            resource_type: resource_type.clone(),
            read: rt.read,
            write: rt.write,
            handler: rt.handler.trim().to_string(),
            data_provider: rt.data_provider.trim().to_string(),
            authentication: rt.authentication.trim().to_string(),
            access_controller: rt.access_controller.trim().to_string(),
            cache: rt.cache.trim().to_string(),
            cache_life_time: Duration::from_secs(rt.cache_life_time),
            expires_header_life_time: rt.expires_header_life_time.map(Duration::from_secs),
            virtual_object,
        };
        by_type.insert(resource_type, Arc::new(resolved));
    }

    let users = config
        .users
        .iter()
        .map(|u| (u.username.clone(), u.password.clone()))
        .collect();

    Ok(ResolvedConfiguration { by_type, users })
}
