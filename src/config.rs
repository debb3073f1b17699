//! Monitor configuration.
//!
//! Sources are layered, later ones winning: built-in defaults, an optional
//! YAML file, `REBUILD_MONITOR_*` environment variables (a `.env` file is
//! loaded into the environment first), then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::ConfigArgs;
use crate::error::ConfigError;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "REBUILD_MONITOR_";

/// Every setting the monitor reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// SQLite database to watch.
    pub database_path: PathBuf,
    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,
    /// Minimum seconds between the starts of two rebuilds.
    pub min_rebuild_interval_secs: u64,
    /// Shell command line that rebuilds the site.
    pub rebuild_command: String,
    /// Working directory for the rebuild command.
    pub rebuild_workdir: PathBuf,
    /// Kill the rebuild after this many seconds. Unset means wait forever.
    pub rebuild_timeout_secs: Option<u64>,
    /// Per-stream cap on captured rebuild output.
    pub max_output_bytes: usize,
    /// JSON state file.
    pub state_file: PathBuf,
    /// Append-only log file.
    pub log_file: PathBuf,
    /// Monitored tables, in reporting order.
    pub tables: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/database.sqlite"),
            poll_interval_secs: 10,
            min_rebuild_interval_secs: 60,
            rebuild_command: "docker compose up -d --build".to_string(),
            rebuild_workdir: PathBuf::from("."),
            rebuild_timeout_secs: None,
            max_output_bytes: 1024 * 1024,
            state_file: PathBuf::from("./.db-monitor-state.json"),
            log_file: PathBuf::from("./logs/db-monitor.log"),
            tables: [
                "projects",
                "project_translations",
                "team_members",
                "team_member_translations",
                "content",
                "content_translations",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl MonitorConfig {
    /// Resolves the full configuration for a command invocation.
    ///
    /// `env` looks up a variable by its full name; pass
    /// `|k| std::env::var(k).ok()` for the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, an environment
    /// value is malformed, or the merged result is invalid.
    pub fn resolve(
        args: &ConfigArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    /// Loads a YAML config file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `REBUILD_MONITOR_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |name: &str| env(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("DATABASE") {
            self.database_path = v.into();
        }
        if let Some(v) = var("POLL_INTERVAL") {
            self.poll_interval_secs = parse_env("POLL_INTERVAL", &v)?;
        }
        if let Some(v) = var("MIN_REBUILD_INTERVAL") {
            self.min_rebuild_interval_secs = parse_env("MIN_REBUILD_INTERVAL", &v)?;
        }
        if let Some(v) = var("COMMAND") {
            self.rebuild_command = v;
        }
        if let Some(v) = var("WORKDIR") {
            self.rebuild_workdir = v.into();
        }
        if let Some(v) = var("TIMEOUT") {
            self.rebuild_timeout_secs = Some(parse_env("TIMEOUT", &v)?);
        }
        if let Some(v) = var("MAX_OUTPUT_BYTES") {
            self.max_output_bytes = parse_env("MAX_OUTPUT_BYTES", &v)?;
        }
        if let Some(v) = var("STATE_FILE") {
            self.state_file = v.into();
        }
        if let Some(v) = var("LOG_FILE") {
            self.log_file = v.into();
        }
        if let Some(v) = var("TABLES") {
            self.tables = split_tables(&v);
        }
        Ok(())
    }

    /// Applies command-line overrides.
    pub fn apply_args(&mut self, args: &ConfigArgs) {
        if let Some(v) = &args.database {
            self.database_path.clone_from(v);
        }
        if let Some(v) = args.poll_interval {
            self.poll_interval_secs = v;
        }
        if let Some(v) = args.min_rebuild_interval {
            self.min_rebuild_interval_secs = v;
        }
        if let Some(v) = &args.rebuild_command {
            self.rebuild_command.clone_from(v);
        }
        if let Some(v) = &args.workdir {
            self.rebuild_workdir.clone_from(v);
        }
        if let Some(v) = args.timeout {
            self.rebuild_timeout_secs = Some(v);
        }
        if let Some(v) = args.max_output_bytes {
            self.max_output_bytes = v;
        }
        if let Some(v) = &args.state_file {
            self.state_file.clone_from(v);
        }
        if let Some(v) = &args.log_file {
            self.log_file.clone_from(v);
        }
        if !args.tables.is_empty() {
            self.tables = args.tables.iter().flat_map(|t| split_tables(t)).collect();
        }
    }

    /// Checks the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if self.tables.is_empty() {
            return invalid("at least one table must be monitored".into());
        }
        for (idx, table) in self.tables.iter().enumerate() {
            if !is_identifier(table) {
                return invalid(format!(
                    "table name {table:?} is not a plain SQL identifier"
                ));
            }
            if self.tables[..idx].contains(table) {
                return invalid(format!("table {table} is listed twice"));
            }
        }
        if self.poll_interval_secs == 0 {
            return invalid("poll interval must be at least one second".into());
        }
        if self.rebuild_command.trim().is_empty() {
            return invalid("rebuild command must not be empty".into());
        }
        if self.rebuild_timeout_secs == Some(0) {
            return invalid("rebuild timeout must be at least one second".into());
        }
        if self.max_output_bytes == 0 {
            return invalid("max output bytes must be positive".into());
        }
        Ok(())
    }

    /// Time between poll cycles.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Debounce window between rebuild starts.
    #[must_use]
    pub fn min_rebuild_interval(&self) -> Duration {
        Duration::from_secs(self.min_rebuild_interval_secs)
    }

    /// Optional kill deadline for the rebuild command.
    #[must_use]
    pub fn rebuild_timeout(&self) -> Option<Duration> {
        self.rebuild_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
    })
}

fn split_tables(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    !first.is_ascii_digit() && word(first) && chars.all(word)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_deployment_conventions() {
        let config = MonitorConfig::default();

        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.min_rebuild_interval(), Duration::from_secs(60));
        assert_eq!(config.rebuild_timeout(), None);
        assert_eq!(config.tables.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = MonitorConfig::default();
        config
            .apply_env(env(&[
                ("REBUILD_MONITOR_POLL_INTERVAL", "5"),
                ("REBUILD_MONITOR_TABLES", "projects, content ,"),
                ("REBUILD_MONITOR_TIMEOUT", "900"),
                ("REBUILD_MONITOR_COMMAND", "make deploy"),
            ]))
            .unwrap();

        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.tables, vec!["projects", "content"]);
        assert_eq!(config.rebuild_timeout(), Some(Duration::from_secs(900)));
        assert_eq!(config.rebuild_command, "make deploy");
    }

    #[test]
    fn malformed_env_number_is_rejected() {
        let mut config = MonitorConfig::default();
        let err = config
            .apply_env(env(&[("REBUILD_MONITOR_POLL_INTERVAL", "ten")]))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidEnv { ref var, .. } if var == "REBUILD_MONITOR_POLL_INTERVAL"
        ));
    }

    #[test]
    fn cli_args_win_over_env_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("monitor.yaml");
        let yaml = "poll_interval_secs: 30\nrebuild_command: ./deploy.sh\ntables: [projects]\n";
        std::fs::write(&file, yaml).unwrap();
        let args = ConfigArgs {
            config: Some(file),
            poll_interval: Some(2),
            tables: vec!["projects,content".into()],
            ..ConfigArgs::default()
        };

        let env = env(&[("REBUILD_MONITOR_POLL_INTERVAL", "20")]);
        let config = MonitorConfig::resolve(&args, env).unwrap();

        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.rebuild_command, "./deploy.sh");
        assert_eq!(config.tables, vec!["projects", "content"]);
        assert_eq!(config.min_rebuild_interval_secs, 60);
    }

    #[test]
    fn unknown_yaml_key_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("monitor.yaml");
        std::fs::write(&file, "poll_intervall: 3\n").unwrap();

        assert!(matches!(
            MonitorConfig::from_file(&file),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn validation_rejects_bad_tables() {
        let mut config = MonitorConfig {
            tables: vec!["projects; DROP TABLE x".into()],
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());

        config.tables = vec!["projects".into(), "projects".into()];
        assert!(config.validate().is_err());

        config.tables = Vec::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_intervals_and_empty_command() {
        let base = MonitorConfig::default();
        let with = |edit: fn(&mut MonitorConfig)| {
            let mut config = base.clone();
            edit(&mut config);
            config.validate()
        };

        assert!(with(|c| c.poll_interval_secs = 0).is_err());
        assert!(with(|c| c.rebuild_command = "  ".into()).is_err());
        assert!(with(|c| c.rebuild_timeout_secs = Some(0)).is_err());
        assert!(with(|c| c.max_output_bytes = 0).is_err());
        assert!(with(|c| c.min_rebuild_interval_secs = 0).is_ok());
    }
}
