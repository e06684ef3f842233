use std::{collections::HashMap, path::Path};

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::AppConfig;

/// Backend base address, shared by the client layer and the proxy.
pub const ENV_API_BASE_URL: &str = "NEXT_PUBLIC_API_BASE_URL";
/// Per-request timeout in milliseconds.
pub const ENV_API_TIMEOUT: &str = "NEXT_PUBLIC_API_TIMEOUT";
/// `"true"` routes client calls through the reverse proxy.
pub const ENV_USE_PROXY: &str = "NEXT_PUBLIC_USE_PROXY";

/// Load configuration from a file using the config crate, layered with the process environment.
/// Supports multiple formats: YAML, JSON, TOML, etc. A missing file falls back to defaults.
pub async fn load_config(config_path: &str) -> Result<AppConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<AppConfig> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_config_with_env(config_path, &env)
}

/// Load configuration against an explicit environment snapshot.
pub fn load_config_with_env(config_path: &str, env: &HashMap<String, String>) -> Result<AppConfig> {
    let path = Path::new(config_path);

    // Determine file format based on extension
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml,
    };

    let prefixed: config::Map<String, String> = env
        .iter()
        .filter(|(key, _)| key.starts_with("BUSGATE_"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let mut builder = Config::builder()
        .add_source(
            File::new(
                path.to_str()
                    .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", path.display()))?,
                format,
            )
            .required(false),
        )
        .add_source(
            Environment::with_prefix("BUSGATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(prefixed)),
        );

    if let Some(base_url) = env.get(ENV_API_BASE_URL) {
        builder = builder
            .set_override("client.api_base_url", base_url.as_str())
            .and_then(|b| b.set_override("proxy.backend_base_url", base_url.as_str()))
            .wrap_err_with(|| format!("Failed to apply {ENV_API_BASE_URL}"))?;
    }

    if let Some(raw) = env.get(ENV_API_TIMEOUT) {
        let timeout_ms: i64 = raw
            .trim()
            .parse()
            .wrap_err_with(|| format!("Invalid {ENV_API_TIMEOUT} value '{raw}'"))?;
        if timeout_ms < 0 {
            eyre::bail!("Invalid {ENV_API_TIMEOUT} value '{raw}': must not be negative");
        }
        builder = builder
            .set_override("client.timeout_ms", timeout_ms)
            .wrap_err_with(|| format!("Failed to apply {ENV_API_TIMEOUT}"))?;
    }

    if let Some(flag) = env.get(ENV_USE_PROXY) {
        builder = builder
            .set_override("client.use_proxy", flag == "true")
            .wrap_err_with(|| format!("Failed to apply {ENV_USE_PROXY}"))?;
    }

    let settings = builder
        .build()
        .with_context(|| format!("Failed to build config from {}", path.display()))?;

    let app_config: AppConfig = settings
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from {}", path.display()))?;

    tracing::debug!(
        "Loaded configuration from {} (proxy backend: {}, client base: {})",
        path.display(),
        app_config.proxy.backend_base_url,
        app_config.client.effective_base_url()
    );

    Ok(app_config)
}
