//! Application configuration types
//!
//! The economy sections map one-to-one onto the `guildhall-core` config
//! structs; everything else describes where the binary keeps its data.

use anyhow::{Context, Result};
use guildhall_core::{
    BankConfig, DiplomacyConfig, EconomyConfig, GuildConfig, SweeperConfig, WarConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the database; platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Database file name inside `data_dir`
    #[serde(default = "default_database_file")]
    pub database_file: String,
    #[serde(default)]
    pub bank: BankConfig,
    #[serde(default)]
    pub war: WarConfig,
    #[serde(default)]
    pub guild: GuildConfig,
    #[serde(default)]
    pub diplomacy: DiplomacyConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

fn default_database_file() -> String {
    "guildhall.db".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: default_database_file(),
            bank: BankConfig::default(),
            war: WarConfig::default(),
            guild: GuildConfig::default(),
            diplomacy: DiplomacyConfig::default(),
            sweeper: SweeperConfig::default(),
        }
    }
}

impl AppConfig {
    /// Settings for the economy services
    pub fn economy(&self) -> EconomyConfig {
        EconomyConfig {
            bank: self.bank.clone(),
            war: self.war.clone(),
            guild: self.guild.clone(),
            diplomacy: self.diplomacy.clone(),
        }
    }

    /// Full path of the SQLite database
    pub fn database_path(&self) -> PathBuf {
        let dir = match &self.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .or_else(dirs::home_dir)
                .map(|d| d.join("guildhall"))
                .unwrap_or_else(|| PathBuf::from("data")),
        };
        dir.join(&self.database_file)
    }

    /// Write the configuration as TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}
