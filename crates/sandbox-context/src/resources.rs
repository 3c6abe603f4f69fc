//! Host-side resource limits shared by the Docker driver and the gateway's
//! pipeline-start request path.
//!
//! Grounded on `resources.rs`'s `ResourceConfig`/`CpuConfig`/
//! `MemoryConfig`/`NetworkConfig` builder family, collapsed to the fields
//! `sandbox-core::docker::RunOpts` and the Dockerfile builder actually
//! consume — its richer filesystem/rate-limit knobs have no counterpart
//! here.

use serde::{Deserialize, Serialize};

/// CPU and memory ceilings for a sandbox container, plus the set of
/// outbound hosts it's allowed to reach (the web-search proxy's
/// `host.docker.internal` address is always implicitly allowed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu_limit: String,
    pub memory_limit: String,
    pub network_allowed_hosts: Vec<String>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_limit: "2".to_string(),
            memory_limit: "2g".to_string(),
            network_allowed_hosts: Vec::new(),
        }
    }
}

impl ResourceLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cpu_limit(mut self, cpu_limit: impl Into<String>) -> Self {
        self.cpu_limit = cpu_limit.into();
        self
    }

    pub fn with_memory_limit(mut self, memory_limit: impl Into<String>) -> Self {
        self.memory_limit = memory_limit.into();
        self
    }

    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.network_allowed_hosts.push(host.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_docker_config_defaults() {
        let limits = ResourceLimits::default();
        assert_eq!(limits.cpu_limit, "2");
        assert_eq!(limits.memory_limit, "2g");
        assert!(limits.network_allowed_hosts.is_empty());
    }

    #[test]
    fn builder_overrides_defaults() {
        let limits = ResourceLimits::new()
            .with_cpu_limit("4")
            .with_memory_limit("4g")
            .allow_host("api.example.com");
        assert_eq!(limits.cpu_limit, "4");
        assert_eq!(limits.memory_limit, "4g");
        assert_eq!(limits.network_allowed_hosts, vec!["api.example.com"]);
    }
}
