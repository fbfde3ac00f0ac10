use client::ClientConfig;
use serde::Deserialize;

use crate::{cli::Cli, error::Result};

const DEFAULT_CONFIG_PATH: &str = "config/kaizen.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub client: ClientConfig,
    /// Log level for the CLI and the client library.
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            level: "warn".to_string(),
        }
    }
}

/// Layers defaults, the config file, `KAIZEN_*` variables and command-line
/// overrides, in that order.
pub fn load(args: &Cli) -> Result<AppConfig> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(
        config::Environment::with_prefix("KAIZEN")
            .try_parsing(true)
            .ignore_empty(true),
    );
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &args.base_url {
        settings.client.base_url = base_url.clone();
    }
    if let Some(timezone) = &args.timezone {
        settings.client.timezone = timezone.clone();
    }
    if let Some(profile) = &args.profile {
        settings.client.storage_namespace = profile.clone();
    }
    if let Some(level) = &args.level {
        settings.level = level.clone();
    }

    Ok(settings)
}
