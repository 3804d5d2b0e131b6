//! Process configuration read from the environment once at startup.

use crate::constants::NWS_API_BASE;

pub const AUTH0_DOMAIN_VAR: &str = "AUTH0_DOMAIN";
pub const AUTH0_AUDIENCE_VAR: &str = "AUTH0_AUDIENCE";
pub const RESOURCE_SERVER_URL_VAR: &str = "RESOURCE_SERVER_URL";
pub const NWS_API_BASE_VAR: &str = "NWS_API_BASE";

const DEFAULT_AUTH0_DOMAIN: &str = "your-tenant.us.auth0.com";
const DEFAULT_AUTH0_AUDIENCE: &str = "https://your-api-identifier";
const DEFAULT_RESOURCE_SERVER_URL: &str = "https://your-domain.example.com/mcp";

/// Immutable server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Identity provider tenant domain, without scheme
    pub auth0_domain: String,
    /// Audience every bearer token must carry
    pub auth0_audience: String,
    /// Externally reachable URL of this server's MCP endpoint
    pub resource_server_url: String,
    /// Base URL of the weather API
    pub nws_api_base: String,
}

impl Config {
    /// Reads the configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source,
    /// falling back to the built-in defaults for anything absent
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        Self {
            auth0_domain: read(AUTH0_DOMAIN_VAR, DEFAULT_AUTH0_DOMAIN),
            auth0_audience: read(AUTH0_AUDIENCE_VAR, DEFAULT_AUTH0_AUDIENCE),
            resource_server_url: read(RESOURCE_SERVER_URL_VAR, DEFAULT_RESOURCE_SERVER_URL),
            nws_api_base: read(NWS_API_BASE_VAR, NWS_API_BASE),
        }
    }

    /// Key discovery endpoint of the identity provider
    pub fn jwks_uri(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.auth0_domain)
    }

    /// Expected token issuer. The trailing slash is mandatory.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth0_domain)
    }

    /// Authorization servers advertised in the protected resource metadata
    pub fn authorization_servers(&self) -> Vec<String> {
        vec![self.issuer()]
    }

    /// Names of the variables still carrying their placeholder default
    pub fn placeholder_vars(&self) -> Vec<&'static str> {
        let mut vars = Vec::new();
        if self.auth0_domain == DEFAULT_AUTH0_DOMAIN {
            vars.push(AUTH0_DOMAIN_VAR);
        }
        if self.auth0_audience == DEFAULT_AUTH0_AUDIENCE {
            vars.push(AUTH0_AUDIENCE_VAR);
        }
        if self.resource_server_url == DEFAULT_RESOURCE_SERVER_URL {
            vars.push(RESOURCE_SERVER_URL_VAR);
        }
        vars
    }

    /// Writes the resolved values to the log
    pub fn log_summary(&self) {
        tracing::info!("{} {}", AUTH0_DOMAIN_VAR, self.auth0_domain);
        tracing::info!("{} {}", AUTH0_AUDIENCE_VAR, self.auth0_audience);
        tracing::info!("{} {}", RESOURCE_SERVER_URL_VAR, self.resource_server_url);
        tracing::debug!("{} {}", NWS_API_BASE_VAR, self.nws_api_base);

        for var in self.placeholder_vars() {
            tracing::warn!("{} is unset; using a placeholder default that will not work in deployment", var);
        }
    }
}
