//! Config validation: resource type names, SQL identifiers and users.

use crate::config::RestConfig;
use crate::error::ConfigError;
use crate::resource_type::ResourceType;
use crate::sql::is_valid_identifier;
use std::collections::HashSet;

fn check_identifier(context: String, name: &str) -> Result<(), ConfigError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            context,
            name: name.to_string(),
        })
    }
}

pub fn validate(config: &RestConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (name, rt) in &config.resource_types {
        let resource_type = ResourceType::new(name)?;
        if !seen.insert(resource_type.clone()) {
            return Err(ConfigError::Validation(format!(
                "resource type '{}' is configured more than once",
                resource_type
            )));
        }

        for (kind, implementation) in [
            ("handler", &rt.handler),
            ("data_provider", &rt.data_provider),
            ("authentication", &rt.authentication),
            ("access_controller", &rt.access_controller),
            ("cache", &rt.cache),
        ] {
            if implementation.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{}: {} must not be empty", name, kind)));
            }
        }

        if let Some(vo) = &rt.virtual_object {
            check_identifier(format!("{}.virtual_object.table", name), &vo.table)?;
            check_identifier(format!("{}.virtual_object.identifier", name), &vo.identifier)?;
            for (property, column) in &vo.properties {
                if property.trim().is_empty() {
                    return Err(ConfigError::Validation(format!("{}: empty property name", name)));
                }
                check_identifier(format!("{}.virtual_object.properties.{}", name, property), column.column())?;
            }
        }
    }

    let mut usernames = HashSet::new();
    for user in &config.users {
        if user.username.is_empty() || user.username.contains(':') {
            return Err(ConfigError::Validation(format!("invalid username '{}'", user.username)));
        }
        if !usernames.insert(user.username.as_str()) {
            return Err(ConfigError::DuplicateUser(user.username.clone()));
        }
    }

    Ok(())
}
