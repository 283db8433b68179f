use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub definition_name: Option<String>,
    pub definition_path: Option<String>,

    // Feature configs
    pub steps: Option<StepsConfig>,
    pub handlers: Option<HandlersConfig>,
}

/// Ids of the steps the engine and payload treat specially.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StepsConfig {
    pub authorization: Option<String>,
    pub renewal: Option<String>,
    pub billing: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct HandlersConfig {
    pub audit_enabled: Option<bool>,
    pub notifications_enabled: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
