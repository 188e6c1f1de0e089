use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

pub const CONFIG_FILE: &str = "roulette_config.json";

pub const STARTING_BALANCE: u64 = 100_000;
const REVEAL_DELAY_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub starting_balance: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            starting_balance: STARTING_BALANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigData {
    pub table: TableConfig,
    /// How long a normal spin waits before showing the result.
    pub reveal_delay_ms: u64,
}

impl Default for ConfigData {
    fn default() -> Self {
        ConfigData {
            table: TableConfig::default(),
            reveal_delay_ms: REVEAL_DELAY_MS,
        }
    }
}

impl ConfigData {
    pub async fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE).await
    }

    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = fs::read_to_string(path).await?;
            let config = serde_json::from_str(&content)?;
            debug!("loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(ConfigData::default())
        }
    }

    pub async fn save(&self) -> Result<()> {
        self.save_to(CONFIG_FILE).await
    }

    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).await?;
        info!("saved config to {}", path.as_ref().display());
        Ok(())
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }
}
