//! Environment-driven configuration for the engine: where persisted state
//! lives, what the API binds to, and how often the trigger scheduler ticks.
//!
//! A `from_env()` + `validate()` split over the handful of settings this
//! engine actually has — no pricing tables, no JWT secrets, no
//! Prometheus wiring.

use crate::error::{Result, WorkflowError};
use std::env;
use std::path::PathBuf;

const DEFAULT_API_HOST: &str = "127.0.0.1";
const DEFAULT_API_PORT: u16 = 8787;
const DEFAULT_TICK_INTERVAL_SECS: u64 = 10;
const DEFAULT_HISTORY_CAP: usize = 10;

/// Engine-wide configuration, loaded once at process startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Root directory for persisted runs, history index, and the
    /// registered-workspaces list. Defaults to `~/.flowforge`.
    pub home: PathBuf,
    pub api_host: String,
    pub api_port: u16,
    /// How often the trigger scheduler checks cron/idle entries.
    pub tick_interval_secs: u64,
    /// Maximum history entries retained per `"<workspace>:<workflowPath>"` key.
    pub history_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home: default_home(),
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }
}

fn default_home() -> PathBuf {
    if let Some(dir) = dirs_home() {
        dir.join(".flowforge")
    } else {
        PathBuf::from(".flowforge")
    }
}

/// Minimal `$HOME` lookup; the engine has no other use for a full
/// directories crate.
fn dirs_home() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

impl EngineConfig {
    /// Load from environment variables (and a `.env` file, if present via
    /// `dotenvy`), falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Ok(home) = env::var("FLOWFORGE_HOME") {
            config.home = PathBuf::from(home);
        }
        if let Ok(host) = env::var("FLOWFORGE_API_HOST") {
            config.api_host = host;
        }
        if let Ok(port) = env::var("FLOWFORGE_API_PORT") {
            config.api_port = parse_env("FLOWFORGE_API_PORT", &port)?;
        }
        if let Ok(secs) = env::var("FLOWFORGE_TICK_INTERVAL_SECS") {
            config.tick_interval_secs = parse_env("FLOWFORGE_TICK_INTERVAL_SECS", &secs)?;
        }
        if let Ok(cap) = env::var("FLOWFORGE_HISTORY_CAP") {
            config.history_cap = parse_env("FLOWFORGE_HISTORY_CAP", &cap)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            return Err(WorkflowError::SchemaInvalid {
                message: "FLOWFORGE_API_PORT must be greater than 0".to_string(),
            });
        }
        if self.tick_interval_secs == 0 {
            return Err(WorkflowError::SchemaInvalid {
                message: "FLOWFORGE_TICK_INTERVAL_SECS must be greater than 0".to_string(),
            });
        }
        if self.history_cap == 0 {
            return Err(WorkflowError::SchemaInvalid {
                message: "FLOWFORGE_HISTORY_CAP must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.home.join("runs")
    }

    pub fn history_index_path(&self) -> PathBuf {
        self.home.join("history.json")
    }

    pub fn workspaces_path(&self) -> PathBuf {
        self.home.join("workspaces.json")
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| WorkflowError::SchemaInvalid {
        message: format!("{key}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval_secs, 10);
        assert_eq!(config.history_cap, 10);
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = EngineConfig::default();
        config.api_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        env::set_var("FLOWFORGE_API_PORT", "9001");
        env::set_var("FLOWFORGE_TICK_INTERVAL_SECS", "30");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.api_port, 9001);
        assert_eq!(config.tick_interval_secs, 30);
        env::remove_var("FLOWFORGE_API_PORT");
        env::remove_var("FLOWFORGE_TICK_INTERVAL_SECS");
    }

    #[test]
    fn derives_runs_and_history_paths_under_home() {
        let config = EngineConfig { home: PathBuf::from("/tmp/flowforge-test"), ..EngineConfig::default() };
        assert_eq!(config.runs_dir(), PathBuf::from("/tmp/flowforge-test/runs"));
        assert_eq!(config.history_index_path(), PathBuf::from("/tmp/flowforge-test/history.json"));
    }
}
