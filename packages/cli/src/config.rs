use mailslot_editor::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "mailslot.config.json";

/// Mailslot configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding persisted `.mjml` templates
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// Markup vocabulary overrides
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to the templates directory
    pub fn get_templates_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.templates_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            engine: EngineConfig::default(),
        }
    }
}
