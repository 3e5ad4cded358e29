//! Access controllers: authorization policy per resource type.

use crate::config::AccessMode;
use crate::request::RestRequest;
use crate::service::Principal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied,
    /// Allowed once the request is authenticated.
    LoginRequired,
}

pub trait AccessController: Send + Sync {
    fn authorize(&self, request: &RestRequest, principal: Option<&Principal>) -> AccessDecision;
}

/// Uses the `read` mode for GET/HEAD/OPTIONS and the `write` mode otherwise.
pub struct ConfigurationAccessController {
    read: AccessMode,
    write: AccessMode,
}

impl ConfigurationAccessController {
    pub fn new(read: AccessMode, write: AccessMode) -> Self {
        ConfigurationAccessController { read, write }
    }
}

impl AccessController for ConfigurationAccessController {
    fn authorize(&self, request: &RestRequest, principal: Option<&Principal>) -> AccessDecision {
        let mode = if request.is_read() { self.read } else { self.write };
        match (mode, principal) {
            (AccessMode::Allow, _) => AccessDecision::Granted,
            (AccessMode::Deny, _) => AccessDecision::Denied,
            (AccessMode::Require, Some(_)) => AccessDecision::Granted,
            (AccessMode::Require, None) => AccessDecision::LoginRequired,
        }
    }
}
