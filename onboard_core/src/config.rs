//! Configuration file support for Onboard.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/onboard/config.toml`.

use crate::progress::ProgressRules;
use crate::quiz::QuizRules;
use crate::{Error, LearnerProfile, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub quiz: QuizRules,

    #[serde(default)]
    pub progress: ProgressRules,

    #[serde(default)]
    pub learner: LearnerConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Directory holding one progress file per user
    pub fn progress_dir(&self) -> PathBuf {
        self.data_dir.join("progress")
    }
}

/// Where course content comes from
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// External catalog document; the embedded catalog is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Learner identity used on certificates
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearnerConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub department: Option<String>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            name: None,
            department: None,
        }
    }
}

impl LearnerConfig {
    /// Profile for certificates, falling back to the user ID for the name
    pub fn profile(&self, user_id: &str) -> LearnerProfile {
        LearnerProfile {
            name: self.name.clone().unwrap_or_else(|| user_id.to_string()),
            department: self.department.clone(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("onboard")
}

fn default_user_id() -> String {
    "default".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject settings the engines cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.quiz.max_attempts == 0 {
            return Err(Error::Config("quiz.max_attempts must be at least 1".into()));
        }
        if self.quiz.pass_threshold_percent > 100 {
            return Err(Error::Config(format!(
                "quiz.pass_threshold_percent must be 0..=100, got {}",
                self.quiz.pass_threshold_percent
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("onboard").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.quiz.max_attempts, 3);
        assert_eq!(config.quiz.pass_threshold_percent, 60);
        assert_eq!(config.progress.lesson_xp, 10);
        assert_eq!(config.progress.module_xp, 50);
        assert!(config.catalog.path.is_none());
        assert!(config.data.progress_dir().ends_with("onboard/progress"));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.learner.name = Some("Ana Souza".into());
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.quiz, config.quiz);
        assert_eq!(parsed.learner.name.as_deref(), Some("Ana Souza"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[quiz]
pass_threshold_percent = 70
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.quiz.pass_threshold_percent, 70);
        assert_eq!(config.quiz.max_attempts, 3); // default
        assert_eq!(config.progress.lesson_xp, 10);
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[quiz]\nmax_attempts = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_learner_profile_falls_back_to_user_id() {
        let learner = LearnerConfig::default();
        let profile = learner.profile("ana");
        assert_eq!(profile.name, "ana");
        assert!(profile.department.is_none());
    }
}
