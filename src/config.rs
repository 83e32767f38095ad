use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analytics::GridPolicy;
use crate::error::AppResult;

const APP_DIR_NAME: &str = "branch-sales";
const DB_FILE_NAME: &str = "branch_sales.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    pub currency_symbol: String,
    pub log_filter: String,
    pub grid: GridPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            currency_symbol: "₽".into(),
            log_filter: "branch_sales=info".into(),
            grid: GridPolicy::Fixed30,
        }
    }
}

impl Config {
    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if path.exists() {
            let data = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    /// Like [`Config::load`], but writes the defaults out on first run.
    pub fn load_or_init(path: &Path) -> AppResult<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Config::default();
        config.save(path)?;
        tracing::info!(path = %path.display(), "wrote default config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| app_data_dir().join(DB_FILE_NAME))
    }
}

/// Per-user data directory, falling back to the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn default_config_path() -> PathBuf {
    app_data_dir().join("config.json")
}
