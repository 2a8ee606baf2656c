use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    APP_NAME_LOWER, CONFIG_FILE_NAME, DEFAULT_API_URL, DEFAULT_PROJECT, ENV_CONFIG, ENV_ENABLED,
};

// =============================================================================
// Backend Config
// =============================================================================

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// API base URL
    pub api_url: String,
    /// API key; kept out of serialized output when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Project name spans are filed under
    pub project: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            project: DEFAULT_PROJECT.to_string(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Application configuration, loaded from the config file with environment
/// and CLI overrides applied on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Master switch; when false the feed is drained without recording
    pub enabled: bool,
    pub backend: BackendConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: BackendConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration: file (flag, env, or platform default path), then
    /// environment overrides, then CLI overrides.
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let path = Self::resolve_path(cli);
        let mut config = match &path {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Invalid config file: {}", path.display()))?
            }
            _ => Self::default(),
        };
        config.apply_env();
        config.apply_cli(cli);
        Ok(config)
    }

    /// Config file path: `--config` flag, `TRACELINE_CONFIG`, or the
    /// platform config dir.
    pub fn resolve_path(cli: &CliConfig) -> Option<PathBuf> {
        if let Some(path) = &cli.config {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join(APP_NAME_LOWER).join(CONFIG_FILE_NAME))
    }

    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(ENV_ENABLED) {
            self.enabled = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    fn apply_cli(&mut self, cli: &CliConfig) {
        if let Some(api_url) = &cli.api_url {
            self.backend.api_url = api_url.clone();
        }
        if let Some(api_key) = &cli.api_key {
            self.backend.api_key = Some(api_key.clone());
        }
        if let Some(project) = &cli.project {
            self.backend.project = project.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn cli_with_config(path: PathBuf) -> CliConfig {
        CliConfig {
            config: Some(path),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli_with_config(dir.path().join("missing.json"));
        let config = AppConfig::load(&cli).unwrap();
        assert!(config.enabled);
        assert_eq!(config.backend.api_url, DEFAULT_API_URL);
        assert_eq!(config.backend.project, DEFAULT_PROJECT);
        assert_eq!(config.backend.api_key, None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traceline.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"enabled": false, "backend": {{"project": "my-agent", "api_key": "sk-test"}}}}"#
        )
        .unwrap();

        let config = AppConfig::load(&cli_with_config(path)).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.backend.project, "my-agent");
        assert_eq!(config.backend.api_key.as_deref(), Some("sk-test"));
        // Fields absent from the file keep their defaults.
        assert_eq!(config.backend.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traceline.json");
        fs::write(&path, "not json").unwrap();

        assert!(AppConfig::load(&cli_with_config(path)).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traceline.json");
        fs::write(&path, r#"{"backend": {"project": "from-file"}}"#).unwrap();

        let cli = CliConfig {
            config: Some(path),
            project: Some("from-cli".to_string()),
            api_key: Some("sk-cli".to_string()),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.backend.project, "from-cli");
        assert_eq!(config.backend.api_key.as_deref(), Some("sk-cli"));
    }
}
