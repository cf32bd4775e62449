//! Shared configuration for the dispatch board.
//!
//! TOML file + `DISPATCH_` environment layering, roster and seed file
//! loading, and translation to `dispatch_core::BoardConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dispatch_core::{BoardConfig, MemoryBackend, Roster, SlotName};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Slot list and gesture tuning.
    #[serde(default)]
    pub board: BoardSection,

    /// JSON roster file: `[{ "id", "name", "status" }]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster: Option<PathBuf>,

    /// JSON assignment rows used to seed the in-memory backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,

    /// Where the TUI writes its log.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board: BoardSection::default(),
            roster: None,
            seed: None,
            log_file: default_log_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BoardSection {
    /// Ordered slot names, one column each.
    #[serde(default = "default_slots")]
    pub slots: Vec<String>,

    /// Hold time before a touch becomes a drag.
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,

    /// Cells a held touch may drift before it counts as a scroll.
    #[serde(default = "default_touch_tolerance")]
    pub touch_tolerance: u16,

    /// Refetch interval while the change feed is down. 0 disables polling.
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    /// Subscribe to the change feed.
    #[serde(default = "default_realtime")]
    pub realtime: bool,
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            slots: default_slots(),
            long_press_ms: default_long_press_ms(),
            touch_tolerance: default_touch_tolerance(),
            polling_interval_secs: default_polling_interval(),
            realtime: default_realtime(),
        }
    }
}

fn default_slots() -> Vec<String> {
    dispatch_core::config::DEFAULT_SLOTS
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}
fn default_long_press_ms() -> u64 {
    500
}
fn default_touch_tolerance() -> u16 {
    1
}
fn default_polling_interval() -> u64 {
    10
}
fn default_realtime() -> bool {
    true
}
fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("dispatch-board.log")
}

impl Config {
    /// Validate the board section and build the core runtime config.
    pub fn to_board_config(&self) -> Result<BoardConfig, ConfigError> {
        let board = &self.board;
        if board.long_press_ms == 0 {
            return Err(ConfigError::Validation {
                field: "board.long_press_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let config = BoardConfig {
            slots: board.slots.iter().map(|s| SlotName::new(s.trim())).collect(),
            long_press: Duration::from_millis(board.long_press_ms),
            touch_tolerance: board.touch_tolerance,
            polling_interval: Duration::from_secs(board.polling_interval_secs),
            realtime_enabled: board.realtime,
        };
        config.validate().map_err(|e| ConfigError::Validation {
            field: "board.slots".into(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "dispatch", "dispatch-board").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("dispatch-board");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config: defaults < TOML file < `DISPATCH_` environment.
///
/// Nested keys use a double underscore, e.g.
/// `DISPATCH_BOARD__LONG_PRESS_MS=750`. An explicit `path` must exist;
/// the default path may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(explicit) => {
            if !explicit.is_file() {
                return Err(ConfigError::Validation {
                    field: "config".into(),
                    reason: format!("{} does not exist", explicit.display()),
                });
            }
            explicit.to_path_buf()
        }
        None => config_path(),
    };

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("DISPATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config(None).unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Data files ──────────────────────────────────────────────────────

/// Read a JSON roster file.
pub fn load_roster(path: &Path) -> Result<Roster, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    Roster::from_json(&json).map_err(|e| ConfigError::Validation {
        field: "roster".into(),
        reason: e.to_string(),
    })
}

/// Read JSON assignment rows into a fresh in-memory backend.
pub fn load_seed(path: &Path) -> Result<MemoryBackend, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    MemoryBackend::from_json(&json).map_err(|e| ConfigError::Validation {
        field: "seed".into(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_produce_valid_board_config() {
        let board = Config::default().to_board_config().unwrap();
        assert_eq!(board.slots.len(), 5);
        assert_eq!(board.slots[0].as_str(), "Unassigned");
        assert_eq!(board.long_press, Duration::from_millis(500));
        assert_eq!(board.polling_interval, Duration::from_secs(10));
        assert!(board.realtime_enabled);
    }

    #[test]
    fn file_overrides_defaults_and_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "board.toml",
                r#"
                    [board]
                    slots = ["Unassigned", "North", "South"]
                    long_press_ms = 650
                    polling_interval_secs = 30
                "#,
            )?;
            jail.set_env("DISPATCH_BOARD__LONG_PRESS_MS", "800");
            jail.set_env("DISPATCH_BOARD__REALTIME", "false");

            let config = load_config(Some(Path::new("board.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.board.slots, ["Unassigned", "North", "South"]);
            assert_eq!(config.board.long_press_ms, 800);
            assert_eq!(config.board.polling_interval_secs, 30);
            assert!(!config.board.realtime);
            // Untouched keys keep their defaults.
            assert_eq!(config.board.touch_tolerance, 1);
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "config"));
    }

    #[test]
    fn duplicate_slots_fail_validation() {
        let mut config = Config::default();
        config.board.slots = vec!["Patrol".into(), "Patrol".into()];
        let err = config.to_board_config().unwrap_err();
        assert!(err.to_string().contains("board.slots"));
    }

    #[test]
    fn zero_long_press_fails_validation() {
        let mut config = Config::default();
        config.board.long_press_ms = 0;
        let err = config.to_board_config().unwrap_err();
        assert!(err.to_string().starts_with("invalid board.long_press_ms"));
    }

    #[test]
    fn save_then_load_preserves_board() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.board.slots = vec!["Alpha".into(), "Bravo".into()];
        config.roster = Some(PathBuf::from("roster.json"));

        save_config_to(&config, &path).unwrap();
        let loaded = load_config(Some(&path)).unwrap();

        assert_eq!(loaded.board, config.board);
        assert_eq!(loaded.roster, config.roster);
    }

    #[test]
    fn roster_and_seed_files_load() {
        let dir = tempfile::tempdir().unwrap();
        let roster = dir.path().join("roster.json");
        std::fs::write(
            &roster,
            r#"[{"id":"O1","name":"Ada Reyes","status":"available"}]"#,
        )
        .unwrap();
        let seed = dir.path().join("seed.json");
        std::fs::write(&seed, r#"[{"slotName":"Patrol","officerId":"O1"}]"#).unwrap();

        let roster = load_roster(&roster).unwrap();
        assert_eq!(roster.label(&"O1".into()), "Ada Reyes");
        assert!(load_seed(&seed).is_ok());
    }

    #[test]
    fn malformed_roster_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let roster = dir.path().join("roster.json");
        std::fs::write(&roster, "{not json").unwrap();
        let err = load_roster(&roster).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "roster"));
    }
}
