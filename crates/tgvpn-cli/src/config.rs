use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_KEYS: [&str; 4] = ["server", "init_data", "format", "bot"];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    pub server: Option<String>,
    pub init_data: Option<String>,
    pub format: Option<String>,
    /// Bot username used for referral links.
    pub bot: Option<String>,
}

impl ProfileConfig {
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = Some(value.to_string());
        match key {
            "server" => self.server = value,
            "init_data" => self.init_data = value,
            "format" => self.format = value,
            "bot" => self.bot = value,
            other => anyhow::bail!(
                "Unknown config key: {other}. Valid keys: {}",
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".tgvpn");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Per-profile local state (selected platform, snapshots).
pub fn state_path(profile: &str) -> Result<PathBuf> {
    Ok(config_dir()?.join(format!("state-{profile}.json")))
}

pub fn load_all_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(cfg)
}

pub fn save_all_to(path: &Path, all: &ConfigFile) -> Result<()> {
    let content = toml::to_string_pretty(all)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    let mut all = load_all_from(&config_path()?)?;
    Ok(all.remove(profile).unwrap_or_default())
}

pub fn save_profile(profile: &str, config: &ProfileConfig) -> Result<()> {
    let path = config_path()?;
    let mut all = load_all_from(&path)?;
    all.insert(profile.to_string(), config.clone());
    save_all_to(&path, &all)
}

pub fn resolve_server(cli_server: &Option<String>, cfg: &ProfileConfig) -> Result<String> {
    // 1. --server flag / TGVPN_URL env
    if let Some(s) = cli_server {
        return Ok(s.clone());
    }
    // 2. config.toml profile
    if let Some(s) = &cfg.server {
        return Ok(s.clone());
    }
    anyhow::bail!(
        "No server URL configured. Use --server, set TGVPN_URL env var, or run: tgvpn config set server <url>"
    )
}

pub fn resolve_init_data(cli_init_data: &Option<String>, cfg: &ProfileConfig) -> Option<String> {
    cli_init_data
        .clone()
        .or_else(|| cfg.init_data.clone())
        .filter(|s| !s.trim().is_empty())
}
