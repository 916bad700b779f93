use serde::{Deserialize, Serialize};
use std::{
    env,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{currency::CurrencyCode, errors::BudgetError};

const DEFAULT_DIR_NAME: &str = ".budget_tree";
const CONFIG_FILE: &str = "config.json";
const HOME_ENV: &str = "BUDGET_TREE_HOME";
const TMP_SUFFIX: &str = "tmp";

/// Engine-wide settings shared by every line of a budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Decimal places applied to observed amounts.
    pub round_decimals: u32,
    /// Decimal places used when amounts are rendered as text.
    pub show_decimals: u32,
    /// One name per tree level; the last entry is the deepest allowed level.
    pub level_names: Vec<String>,
    pub default_currency: CurrencyCode,
    /// Unit types that pin `unit_number` to 1.
    pub lumpsum_unit_types: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            round_decimals: 2,
            show_decimals: 2,
            level_names: ["Budget", "Heading", "Sub-heading", "Activity", "Sub-activity"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            default_currency: CurrencyCode::default(),
            lumpsum_unit_types: vec!["ls".into(), "lumpsum".into()],
        }
    }
}

impl Config {
    /// Deepest level a line may occupy; the root is level 0.
    pub fn max_level(&self) -> usize {
        self.level_names.len().saturating_sub(1)
    }

    pub fn level_name(&self, level: usize) -> &str {
        self.level_names
            .get(level)
            .map(String::as_str)
            .unwrap_or("Line")
    }

    /// Fixed-point text at `show_decimals` places; unknown amounts render as `-`.
    pub fn format_amount(&self, value: f64) -> String {
        if !value.is_finite() {
            return "-".to_string();
        }
        format!("{:.*}", self.show_decimals as usize, value)
    }

    pub fn is_lumpsum(&self, unit_type: &str) -> bool {
        self.lumpsum_unit_types
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(unit_type))
    }
}

/// Loads and stores [`Config`] as JSON inside the application directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, BudgetError> {
        Self::with_base_dir(base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, BudgetError> {
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
        })
    }

    pub fn load(&self) -> Result<Config, BudgetError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), BudgetError> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Application directory, `$BUDGET_TREE_HOME` or `~/.budget_tree`.
pub fn base_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<(), BudgetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
