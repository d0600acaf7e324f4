//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use karate_executor_common::{Error, Result};

/// Environment variable naming the data directory
pub const ENV_DATA_DIR: &str = "RUNNER_DATADIR";

/// Environment variable naming the Karate jar
pub const ENV_KARATE_JAR: &str = "RUNNER_KARATE_JAR";

/// Environment variable naming the Java launcher
pub const ENV_JAVA_BINARY: &str = "RUNNER_JAVA_BINARY";

/// File name the host writes single-file content to
pub const CONTENT_FILE: &str = "test-content";

/// Extension Karate requires on feature files
pub const FEATURE_EXTENSION: &str = "feature";

/// Directory under the data dir holding the repository checkout
pub const REPO_DIR: &str = "repo";

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Data directory prepared by the host
    pub data_dir: PathBuf,

    /// Path to the Karate standalone jar
    pub karate_jar: PathBuf,

    /// Java launcher used for every invocation
    pub java_binary: String,

    /// JUnit report directory, relative to the working directory
    pub report_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            karate_jar: PathBuf::from("/home/karate/karate.jar"),
            java_binary: "java".to_string(),
            report_dir: PathBuf::from("target").join("karate-reports"),
        }
    }
}

impl RunnerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::default().with_lookup(|key| std::env::var(key).ok())
    }

    /// Override fields from an environment-like lookup
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(jar) = lookup(ENV_KARATE_JAR) {
            self.karate_jar = PathBuf::from(jar);
        }
        if let Some(java) = lookup(ENV_JAVA_BINARY) {
            self.java_binary = java;
        }
        self
    }

    /// Load configuration from a TOML file, defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| {
                Error::InvalidConfig(format!("{}: {}", path.display(), e))
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_karate_jar(mut self, karate_jar: impl Into<PathBuf>) -> Self {
        self.karate_jar = karate_jar.into();
        self
    }

    pub fn with_java_binary(mut self, java_binary: impl Into<String>) -> Self {
        self.java_binary = java_binary.into();
        self
    }

    /// Get the repository checkout root
    pub fn repo_dir(&self) -> PathBuf {
        self.data_dir.join(REPO_DIR)
    }

    /// Get the raw content file the host writes
    pub fn content_file(&self) -> PathBuf {
        self.data_dir.join(CONTENT_FILE)
    }

    /// File name the content is renamed to before running
    pub fn feature_file_name(&self) -> String {
        format!("{}.{}", CONTENT_FILE, FEATURE_EXTENSION)
    }
}
