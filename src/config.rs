//! Pipeline configuration.
//!
//! Settings come from `harvest.toml` in the work directory (or an explicit
//! `--config` path): a `[daemon]` table for the loop itself and one
//! `[[stages]]` entry per external scraper program, executed in file order.
//! Configuration is static input; it is read once at startup and never
//! reloaded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;

/// Default config file name, resolved against the work directory.
pub const CONFIG_FILE: &str = "harvest.toml";

/// Default inter-cycle sleep: two hours.
pub const DEFAULT_INTERVAL_SECS: u64 = 2 * 60 * 60;

pub const DEFAULT_STATUS_FILE: &str = "harvest_status.json";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// One external pipeline stage as declared in `[[stages]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage identifier, unique within the pipeline.
    pub name: String,
    /// Program to execute.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Optional wall-clock limit. An expired stage is killed and recorded
    /// with the timeout sentinel exit code; the cycle continues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// The `[daemon]` table of `harvest.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSection {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_status_file")]
    pub status_file: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            status_file: DEFAULT_STATUS_FILE.to_string(),
            log_dir: DEFAULT_LOG_DIR.to_string(),
        }
    }
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_status_file() -> String {
    DEFAULT_STATUS_FILE.to_string()
}

fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.to_string()
}

/// On-disk layout of `harvest.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestToml {
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

/// Resolved runtime configuration for the supervisor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory stages run in; relative paths below resolve against it.
    pub work_dir: PathBuf,
    pub status_file: PathBuf,
    pub log_dir: PathBuf,
    pub interval: Duration,
    pub stages: Vec<StageConfig>,
}

impl Config {
    /// Load and validate configuration from `config_path`, or from
    /// `harvest.toml` under `work_dir` when no explicit path is given.
    pub fn load(work_dir: &Path, config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| work_dir.join(CONFIG_FILE));

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let toml: HarvestToml =
            toml::from_str(&content).map_err(|source| ConfigError::ParseFailed { path, source })?;

        Self::from_toml(work_dir, toml)
    }

    /// Resolve a parsed config file against the work directory.
    pub fn from_toml(work_dir: &Path, toml: HarvestToml) -> Result<Self, ConfigError> {
        validate(&toml)?;
        Ok(Self {
            work_dir: work_dir.to_path_buf(),
            status_file: work_dir.join(&toml.daemon.status_file),
            log_dir: work_dir.join(&toml.daemon.log_dir),
            interval: Duration::from_secs(toml.daemon.interval_secs),
            stages: toml.stages,
        })
    }
}

/// Startup-fatal checks: the daemon must never enter the loop with an
/// empty or ambiguous pipeline.
fn validate(toml: &HarvestToml) -> Result<(), ConfigError> {
    if toml.stages.is_empty() {
        return Err(ConfigError::NoStages);
    }
    if toml.daemon.interval_secs == 0 {
        return Err(ConfigError::ZeroInterval);
    }
    let mut seen = std::collections::HashSet::new();
    for stage in &toml.stages {
        if !seen.insert(stage.name.as_str()) {
            return Err(ConfigError::DuplicateStage {
                name: stage.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
[[stages]]
name = "catalog"
command = "python3"
args = ["scraper.py"]
"#;

    #[test]
    fn load_minimal_config_applies_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), MINIMAL).unwrap();

        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(config.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(config.status_file, dir.path().join(DEFAULT_STATUS_FILE));
        assert_eq!(config.log_dir, dir.path().join(DEFAULT_LOG_DIR));
        assert_eq!(config.stages.len(), 1);
        assert_eq!(config.stages[0].name, "catalog");
        assert_eq!(config.stages[0].command, "python3");
        assert_eq!(config.stages[0].args, vec!["scraper.py"]);
        assert!(config.stages[0].timeout_secs.is_none());
    }

    #[test]
    fn load_full_config() {
        let dir = tempdir().unwrap();
        let content = r#"
[daemon]
interval_secs = 600
status_file = "state/status.json"
log_dir = "state/logs"

[[stages]]
name = "catalog"
command = "python3"
args = ["scraper.py"]
timeout_secs = 3600

[[stages]]
name = "chapters"
command = "python3"
args = ["chapters.py", "--all"]
"#;
        std::fs::write(dir.path().join(CONFIG_FILE), content).unwrap();

        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(config.interval, Duration::from_secs(600));
        assert_eq!(config.status_file, dir.path().join("state/status.json"));
        assert_eq!(config.log_dir, dir.path().join("state/logs"));
        assert_eq!(config.stages.len(), 2);
        assert_eq!(config.stages[0].timeout_secs, Some(3600));
        assert_eq!(config.stages[1].args, vec!["chapters.py", "--all"]);
    }

    #[test]
    fn load_explicit_config_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("elsewhere.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = Config::load(dir.path(), Some(&path)).unwrap();
        assert_eq!(config.stages.len(), 1);
    }

    #[test]
    fn missing_config_file_is_read_failed() {
        let dir = tempdir().unwrap();
        let err = Config::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }

    #[test]
    fn invalid_toml_is_parse_failed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[[stages").unwrap();
        let err = Config::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn empty_stage_list_is_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[daemon]\ninterval_secs = 60\n").unwrap();
        let err = Config::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::NoStages));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let dir = tempdir().unwrap();
        let content = format!("[daemon]\ninterval_secs = 0\n{MINIMAL}");
        std::fs::write(dir.path().join(CONFIG_FILE), content).unwrap();
        let err = Config::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroInterval));
    }

    #[test]
    fn duplicate_stage_names_are_rejected() {
        let dir = tempdir().unwrap();
        let content = r#"
[[stages]]
name = "catalog"
command = "true"

[[stages]]
name = "catalog"
command = "false"
"#;
        std::fs::write(dir.path().join(CONFIG_FILE), content).unwrap();
        let err = Config::load(dir.path(), None).unwrap_err();
        match err {
            ConfigError::DuplicateStage { name } => assert_eq!(name, "catalog"),
            other => panic!("Expected DuplicateStage, got {other:?}"),
        }
    }

    #[test]
    fn absolute_paths_are_kept_as_is() {
        let dir = tempdir().unwrap();
        let content = r#"
[daemon]
status_file = "/var/run/harvest/status.json"

[[stages]]
name = "catalog"
command = "true"
"#;
        std::fs::write(dir.path().join(CONFIG_FILE), content).unwrap();
        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(
            config.status_file,
            PathBuf::from("/var/run/harvest/status.json")
        );
    }
}
