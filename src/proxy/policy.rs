//! Target policy hook.
//!
//! The proxy forwards to any absolute URL unless an allow-list is
//! configured. [`OpenPolicy`] is the default.

use std::fmt::Debug;
use std::sync::Arc;

use crate::config::PolicyConfig;
use crate::proxy::resolver::ResolvedTarget;

/// Decides whether a resolved target may be used at all.
pub trait TargetPolicy: Send + Sync + Debug {
    fn permits(&self, target: &ResolvedTarget) -> bool;
}

/// Permits every target.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenPolicy;

impl TargetPolicy for OpenPolicy {
    fn permits(&self, _target: &ResolvedTarget) -> bool {
        true
    }
}

/// Permits listed hosts only. `*.example.com` matches subdomains, not the apex.
#[derive(Debug, Clone)]
pub struct HostAllowList {
    exact: Vec<String>,
    suffixes: Vec<String>,
}

impl HostAllowList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exact = Vec::new();
        let mut suffixes = Vec::new();
        for host in hosts {
            let host = host.as_ref().trim().to_ascii_lowercase();
            match host.strip_prefix("*.") {
                Some(suffix) => suffixes.push(format!(".{}", suffix)),
                None => exact.push(host),
            }
        }
        Self { exact, suffixes }
    }
}

impl TargetPolicy for HostAllowList {
    fn permits(&self, target: &ResolvedTarget) -> bool {
        let host = target.hostname().to_ascii_lowercase();
        self.exact.iter().any(|h| *h == host) || self.suffixes.iter().any(|s| host.ends_with(s.as_str()))
    }
}

/// Build the policy described by the configuration.
pub fn from_config(config: &PolicyConfig) -> Arc<dyn TargetPolicy> {
    if config.allowed_hosts.is_empty() {
        Arc::new(OpenPolicy)
    } else {
        Arc::new(HostAllowList::new(&config.allowed_hosts))
    }
}
