//! Configuration for seqreport

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::report::{ReportSettings, ScriptIdentity};
use crate::sink::SinkSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Directory reports are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Value written as `fixate-version=` in report headers
    #[serde(default = "default_framework_version")]
    pub framework_version: String,

    /// How long shutdown waits for the writer to make progress
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Sync every row to storage after writing it
    #[serde(default = "default_fsync")]
    pub fsync: bool,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

fn default_output_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("seqreport")
        .join("reports")
}

fn default_framework_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_shutdown_timeout_ms() -> u64 {
    crate::sink::DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64
}

fn default_fsync() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            framework_version: default_framework_version(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            fsync: default_fsync(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        debug!(?path, "Config::load: called");
        if let Some(config_path) = path {
            return Self::load_from(config_path);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("seqreport").join("seqreport.yml")),
            Some(PathBuf::from("seqreport.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_from(path);
            }
        }

        debug!("Config::load: no config file found, using defaults");
        Ok(Config::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Config::load_from: called");
        let content = std::fs::read_to_string(path).context(format!("Failed to read config {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).context(format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Read only the log level, before logging is set up
    ///
    /// Any failure yields `None`; the full load reports errors later.
    pub fn load_log_level(path: Option<&PathBuf>) -> Option<String> {
        Self::load(path).ok().and_then(|c| c.log_level)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Reporter settings for a run of `script`
    pub fn report_settings(&self, script: ScriptIdentity) -> ReportSettings {
        ReportSettings {
            output_dir: self.output_dir.clone(),
            framework_version: self.framework_version.clone(),
            script,
            sink: SinkSettings {
                shutdown_timeout: self.shutdown_timeout(),
                fsync: self.fsync,
            },
        }
    }
}
