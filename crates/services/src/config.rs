//! Scheduler configuration: which spacing schedule to use and where sessions live.
//!
//! ```toml
//! [schedule]
//! preset = "dense"        # or "sparse"
//! # offsets = [1, 2, 4, 8] # overrides the preset
//!
//! [store]
//! kind = "csv"
//! path = "study_schedule.csv"
//! ```

use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use storage::repository::Storage;
use study_core::schedule::{IntervalPolicy, ScheduleError, SchedulePreset, SpacingSchedule};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub schedule: ScheduleConfig,
    /// Left unset by library code; the caller decides where the store lives.
    pub store: Option<StoreConfig>,
}

impl SchedulerConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML or unknown fields.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read and
    /// `ConfigError::Parse` if it is not a valid config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    pub preset: SchedulePreset,
    /// Custom day offsets; when present they replace the preset.
    pub offsets: Option<Vec<u32>>,
}

impl ScheduleConfig {
    /// Build the interval policy this config describes.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError` if custom offsets are empty, zero, or not ascending.
    pub fn build_policy(&self) -> Result<Arc<dyn IntervalPolicy>, ScheduleError> {
        let schedule = match &self.offsets {
            Some(offsets) => SpacingSchedule::custom("custom", offsets.clone())?,
            None => SpacingSchedule::preset(self.preset),
        };
        Ok(Arc::new(schedule))
    }
}

/// Where study sessions are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Csv { path: PathBuf },
    Sqlite { url: String },
    Memory,
}

impl StoreConfig {
    /// Open the configured backend. SQLite stores are migrated on open.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Sqlite` if the database cannot be opened or migrated.
    pub async fn open(&self) -> Result<Storage, ConfigError> {
        let storage = match self {
            StoreConfig::Csv { path } => Storage::csv(path.clone()),
            StoreConfig::Sqlite { url } => Storage::sqlite(url).await?,
            StoreConfig::Memory => Storage::in_memory(),
        };
        Ok(storage)
    }
}

/// Parses a store location: `memory`, an `sqlite:` URL, or a CSV file path.
impl FromStr for StoreConfig {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed {
            "memory" | ":memory:" => StoreConfig::Memory,
            url if url.starts_with("sqlite:") => StoreConfig::Sqlite {
                url: url.to_owned(),
            },
            path => StoreConfig::Csv {
                path: PathBuf::from(path),
            },
        })
    }
}
