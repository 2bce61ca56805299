//! Target authorization.
//!
//! Scanning is restricted to a fixed set of hosts. The check is a plain string
//! comparison against the host as typed, so it runs before any DNS lookup or
//! socket is created.

use std::collections::BTreeSet;
use tracing::{info, warn};

/// Host was rejected by the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("scanning of target '{host}' is not authorized, allowed targets: {allowed}")]
    Unauthorized { host: String, allowed: String },
}

/// The set of hosts a scan may target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    hosts: BTreeSet<String>,
}

impl AllowList {
    /// Hosts permitted by default.
    pub const DEFAULT_HOSTS: [&'static str; 3] = ["127.0.0.1", "localhost", "scanme.nmap.org"];

    /// Build an allow-list from explicit hosts.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-sensitive exact membership.
    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    /// Reject any host that is not on the list.
    pub fn authorize(&self, host: &str) -> Result<(), AuthorizationError> {
        if self.contains(host) {
            info!(host, "target authorized");
            Ok(())
        } else {
            warn!(host, "target rejected by allow-list");
            Err(AuthorizationError::Unauthorized {
                host: host.to_string(),
                allowed: self.to_string(),
            })
        }
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HOSTS)
    }
}

impl std::fmt::Display for AllowList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hosts: Vec<&str> = self.hosts.iter().map(String::as_str).collect();
        write!(f, "{}", hosts.join(", "))
    }
}
