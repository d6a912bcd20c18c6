use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::deload::DeloadAnalyzer;
use crate::logging::LogConfig;
use crate::mesocycle::{MesoCyclePlan, DEFAULT_VOLUME_INCREMENT};
use crate::weekly::DEFAULT_WINDOW_COUNT;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Where state is persisted
    #[serde(default)]
    pub storage: StorageSettings,

    /// Deload analysis settings
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Defaults for new mesocycles
    #[serde(default)]
    pub mesocycle: MesoCycleDefaults,

    /// Logging settings
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database path
    pub database_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: AppConfig::config_dir().join("liftrs.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Trailing weekly windows considered
    pub window_count: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            window_count: DEFAULT_WINDOW_COUNT,
        }
    }
}

impl AnalysisSettings {
    pub fn analyzer(&self) -> DeloadAnalyzer {
        DeloadAnalyzer::with_window_count(self.window_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MesoCycleDefaults {
    pub total_weeks: u32,
    pub workouts_per_week: u32,
    /// Sets added per muscle each week
    pub volume_increment_per_week: u32,
}

impl Default for MesoCycleDefaults {
    fn default() -> Self {
        MesoCycleDefaults {
            total_weeks: 5,
            workouts_per_week: 4,
            volume_increment_per_week: DEFAULT_VOLUME_INCREMENT,
        }
    }
}

impl MesoCycleDefaults {
    /// Plan with these defaults and no muscle priorities
    pub fn plan(&self, name: impl Into<String>) -> MesoCyclePlan {
        MesoCyclePlan {
            name: name.into(),
            total_weeks: self.total_weeks,
            workouts_per_week: self.workouts_per_week,
            muscle_priorities: Default::default(),
            volume_increment_per_week: self.volume_increment_per_week,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            storage: StorageSettings::default(),
            analysis: AnalysisSettings::default(),
            mesocycle: MesoCycleDefaults::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// `~/.liftrs`
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".liftrs")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();
        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Unusable config file, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.analysis.window_count == 0 {
            anyhow::bail!("analysis.window_count must be at least 1");
        }
        if self.mesocycle.total_weeks == 0 {
            anyhow::bail!("mesocycle.total_weeks must be at least 1");
        }
        if self.mesocycle.workouts_per_week == 0 {
            anyhow::bail!("mesocycle.workouts_per_week must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.analysis, deserialized.analysis);
        assert_eq!(config.mesocycle, deserialized.mesocycle);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let toml_str = r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [analysis]
            window_count = 8
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.analysis.window_count, 8);
        assert_eq!(config.analysis.analyzer().window_count(), 8);
        assert_eq!(config.mesocycle.total_weeks, 5);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original_config = AppConfig::default();
        original_config.storage.database_path = temp_dir.path().join("liftrs.db");
        original_config.mesocycle.total_weeks = 6;

        original_config.save_to_file(&config_path).unwrap();
        let loaded_config = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded_config.storage, original_config.storage);
        assert_eq!(loaded_config.mesocycle.total_weeks, 6);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.analysis.window_count = 0;
        config.save_to_file(&config_path).unwrap();

        assert!(AppConfig::load_from_file(&config_path).is_err());
    }

    #[test]
    fn test_defaults_build_plan() {
        let plan = MesoCycleDefaults::default().plan("Block A");
        assert_eq!(plan.total_weeks, 5);
        assert_eq!(plan.workouts_per_week, 4);
        assert!(plan.muscle_priorities.is_empty());
    }
}
