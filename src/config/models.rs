//! Configuration data structures for busgate.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and are
//! layered with `BUSGATE_*` and `NEXT_PUBLIC_*` environment variables by the loader.
//! Every section has defaults so that an absent file still yields a usable config.
use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Path prefix under which the reverse proxy is mounted.
pub const PROXY_PREFIX: &str = "/api/proxy";

/// Top level configuration shared by the proxy server and the client layer.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub proxy: ProxyConfig,
    pub client: ClientConfig,
    pub session: SessionConfig,
    pub guard: GuardConfig,
    pub logging: LoggingConfig,
}

/// Reverse proxy server settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProxyConfig {
    /// Socket address the proxy binds to
    pub listen_addr: String,
    /// Remote backend base address every proxied path is joined to
    pub backend_base_url: String,
    /// Timeout for the backend probe behind `GET /health`
    pub health_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            backend_base_url: "http://localhost:8000/api".to_string(),
            health_timeout_secs: 5,
        }
    }
}

/// HTTP client layer settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base address used when the proxy is bypassed
    pub api_base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Route every client call through the reverse proxy
    pub use_proxy: bool,
    /// Origin of the reverse proxy (without the `/api/proxy` prefix)
    pub proxy_base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            timeout_ms: 10_000,
            use_proxy: false,
            proxy_base_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

impl ClientConfig {
    /// Base address all resource paths are appended to.
    pub fn effective_base_url(&self) -> String {
        if self.use_proxy {
            format!(
                "{}{}",
                self.proxy_base_url.trim_end_matches('/'),
                PROXY_PREFIX
            )
        } else {
            self.api_base_url.trim_end_matches('/').to_string()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Where the persisted session lives.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// JSON file holding `authToken`, `userRole` and `userId`. A leading `~/` expands to `$HOME`.
    pub store_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_path: "~/.config/busgate/session.json".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match (self.store_path.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
            _ => PathBuf::from(&self.store_path),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GuardConfig {
    /// Delay before the unauthorized view sends the user on to their dashboard
    pub unauthorized_redirect_delay_secs: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            unauthorized_redirect_delay_secs: 3,
        }
    }
}

impl GuardConfig {
    pub fn unauthorized_delay(&self) -> Duration {
        Duration::from_secs(self.unauthorized_redirect_delay_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `busgate=debug,tower_http=info`
    pub level: String,
    /// Emit JSON lines instead of the pretty console format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_base_url_direct() {
        let client = ClientConfig {
            api_base_url: "http://backend:8000/api/".to_string(),
            ..Default::default()
        };
        assert_eq!(client.effective_base_url(), "http://backend:8000/api");
    }

    #[test]
    fn test_effective_base_url_through_proxy() {
        let client = ClientConfig {
            use_proxy: true,
            proxy_base_url: "http://127.0.0.1:3000/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            client.effective_base_url(),
            "http://127.0.0.1:3000/api/proxy"
        );
    }

    #[test]
    fn test_session_path_without_tilde() {
        let session = SessionConfig {
            store_path: "/tmp/busgate/session.json".to_string(),
        };
        assert_eq!(
            session.resolved_path(),
            PathBuf::from("/tmp/busgate/session.json")
        );
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.client.timeout(), Duration::from_millis(10_000));
        assert_eq!(config.guard.unauthorized_delay(), Duration::from_secs(3));
        assert!(!config.client.use_proxy);
    }
}
