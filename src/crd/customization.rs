//! # Build Customization
//!
//! Host, protocol and routing options threaded into package templating and
//! admin API URL derivation. Packages receive these values through the
//! registry only; no package reads global process state.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::spec::{default_host, default_port, default_protocol};

/// URL and routing customization for generated platform endpoints
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildCustomization {
    /// Domain used for generated URLs (e.g. "localtest.me")
    #[serde(default = "default_host")]
    pub host: String,
    /// Scheme for generated URLs: "http" or "https"
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Listening port in string form (e.g. "443")
    #[serde(default = "default_port")]
    pub port: String,
    /// Choose path-style URLs ("host/gitea") over subdomain-style URLs
    /// ("gitea.host") for platform services
    #[serde(default)]
    pub use_path_routing: bool,
    /// Optional override for the domain used in generated URLs; when empty
    /// the host is used as-is
    #[serde(default)]
    pub target_domain: String,
}

impl Default for BuildCustomization {
    fn default() -> Self {
        Self {
            host: default_host(),
            protocol: default_protocol(),
            port: default_port(),
            use_path_routing: false,
            target_domain: String::new(),
        }
    }
}

impl BuildCustomization {
    /// Domain for generated URLs, honoring the target-domain override
    pub fn domain(&self) -> &str {
        if self.target_domain.is_empty() {
            &self.host
        } else {
            &self.target_domain
        }
    }

    /// Hostname routed to the given platform service
    pub fn service_host(&self, service: &str) -> String {
        if self.use_path_routing {
            self.domain().to_string()
        } else {
            format!("{}.{}", service, self.domain())
        }
    }

    /// External base URL for the given platform service
    pub fn service_url(&self, service: &str) -> String {
        let host = self.service_host(service);
        if self.use_path_routing {
            format!("{}://{}:{}/{}", self.protocol, host, self.port, service)
        } else {
            format!("{}://{}:{}", self.protocol, host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomain_routing_prefixes_service() {
        let build = BuildCustomization::default();
        assert_eq!(build.service_host("gitea"), "gitea.localtest.me");
        assert_eq!(build.service_url("gitea"), "https://gitea.localtest.me:443");
    }

    #[test]
    fn path_routing_appends_service_path() {
        let build = BuildCustomization {
            use_path_routing: true,
            ..Default::default()
        };
        assert_eq!(build.service_host("argocd"), "localtest.me");
        assert_eq!(
            build.service_url("argocd"),
            "https://localtest.me:443/argocd"
        );
    }

    #[test]
    fn target_domain_overrides_host() {
        let build = BuildCustomization {
            target_domain: "platform.example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(build.service_host("gitea"), "gitea.platform.example.com");
    }
}
