use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::id::MAX_NODE_ID;
use crate::store::ChoreStore;

/// Directory under the project root that holds stores and config.
pub const CHORES_DIR: &str = ".chores";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub tmux: TmuxConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Active store path, relative to the project root unless absolute.
    #[serde(default = "default_active_path")]
    pub active: PathBuf,
    /// Archive store path; derived from `active` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            active: default_active_path(),
            archive: None,
        }
    }
}

impl StoreConfig {
    /// Resolve both store paths against `project_root`.
    #[must_use]
    pub fn open(&self, project_root: &Path) -> ChoreStore {
        let active = project_root.join(&self.active);
        let archive = self.archive.as_ref().map_or_else(
            || ChoreStore::archive_path_for(&active),
            |a| project_root.join(a),
        );
        ChoreStore::new(active, archive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdConfig {
    #[serde(default = "default_node_id")]
    pub node_id: u16,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmuxConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Explicit tmux binary; skips discovery when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,
    #[serde(default = "default_session_name")]
    pub default_session: String,
    /// Session to use instead of ambient detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default = "default_verify_timeout_ms")]
    pub verify_timeout_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Typed into a new worker window after its context is injected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_command: Option<String>,
    /// Typed into a new reviewer pane after its context is injected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            binary: None,
            default_session: default_session_name(),
            session: None,
            query_timeout_ms: default_query_timeout_ms(),
            verify_timeout_ms: default_verify_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            worker_command: None,
            reviewer_command: None,
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// One problem found by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    pub code: &'static str,
    pub message: String,
}

#[must_use]
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(CHORES_DIR).join("config.toml")
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write `config` to `.chores/config.toml`, creating the directory.
pub fn save_project_config(project_root: &Path, config: &ProjectConfig) -> Result<PathBuf> {
    let path = config_path(project_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let body = toml::to_string_pretty(config).context("Failed to serialize project config")?;
    std::fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("chores/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(cli_json: bool, user_output: Option<String>, env_format: Option<String>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

/// Check value ranges that serde cannot express.
#[must_use]
pub fn validate(config: &ProjectConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if config.ids.node_id > MAX_NODE_ID {
        issues.push(ConfigIssue {
            code: "ids.node_id",
            message: format!(
                "node_id {} is out of range (0..={MAX_NODE_ID})",
                config.ids.node_id
            ),
        });
    }

    if config.store.active.as_os_str().is_empty() {
        issues.push(ConfigIssue {
            code: "store.active",
            message: "active store path must not be empty".to_string(),
        });
    }

    let tmux = &config.tmux;
    if tmux.default_session.trim().is_empty() {
        issues.push(ConfigIssue {
            code: "tmux.default_session",
            message: "default session name must not be empty".to_string(),
        });
    }
    for (code, value) in [
        ("tmux.query_timeout_ms", tmux.query_timeout_ms),
        ("tmux.verify_timeout_ms", tmux.verify_timeout_ms),
    ] {
        if value == 0 {
            issues.push(ConfigIssue {
                code,
                message: format!("{code} must be greater than zero"),
            });
        }
    }

    issues
}

const fn default_true() -> bool {
    true
}

fn default_active_path() -> PathBuf {
    PathBuf::from(CHORES_DIR).join("chores.jsonl")
}

const fn default_node_id() -> u16 {
    1
}

fn default_session_name() -> String {
    "chore-dispatcher".to_string()
}

const fn default_query_timeout_ms() -> u64 {
    2_000
}

const fn default_verify_timeout_ms() -> u64 {
    1_500
}

const fn default_settle_delay_ms() -> u64 {
    150
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = TempDir::new().unwrap();
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.store.active, PathBuf::from(".chores/chores.jsonl"));
        assert_eq!(cfg.ids.node_id, 1);
        assert!(cfg.tmux.enabled);
        assert_eq!(cfg.tmux.default_session, "chore-dispatcher");
        assert_eq!(cfg.tmux.query_timeout_ms, 2_000);
        assert!(validate(&cfg).is_empty());
    }

    #[test]
    fn archive_path_derives_from_active() {
        let cfg = StoreConfig::default();
        let store = cfg.open(Path::new("/proj"));
        assert_eq!(store.active_path(), Path::new("/proj/.chores/chores.jsonl"));
        assert_eq!(
            store.archive_path(),
            Path::new("/proj/.chores/chores_completed.jsonl")
        );

        let explicit = StoreConfig {
            active: PathBuf::from("data/a.jsonl"),
            archive: Some(PathBuf::from("data/done.jsonl")),
        };
        assert_eq!(
            explicit.open(Path::new("/proj")).archive_path(),
            Path::new("/proj/data/done.jsonl")
        );
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let cfg: ProjectConfig = toml::from_str(
            r#"
[tmux]
enabled = false
session = "agents"
"#,
        )
        .expect("parse");
        assert!(!cfg.tmux.enabled);
        assert_eq!(cfg.tmux.session.as_deref(), Some("agents"));
        assert_eq!(cfg.tmux.settle_delay_ms, 150);
        assert_eq!(cfg.ids, IdConfig::default());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let root = TempDir::new().unwrap();
        let mut cfg = ProjectConfig::default();
        cfg.tmux.worker_command = Some("claude".to_string());
        save_project_config(root.path(), &cfg).unwrap();
        assert_eq!(load_project_config(root.path()).unwrap(), cfg);
    }

    #[test]
    fn malformed_config_reports_path() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join(CHORES_DIR)).unwrap();
        std::fs::write(config_path(root.path()), "[ids\nnode_id = 1").unwrap();
        let err = load_project_config(root.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse"));
    }

    #[test]
    fn validation_flags_out_of_range_values() {
        let mut cfg = ProjectConfig::default();
        cfg.ids.node_id = 2_000;
        cfg.tmux.default_session = "  ".to_string();
        cfg.tmux.verify_timeout_ms = 0;

        let codes: Vec<&str> = validate(&cfg).iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec!["ids.node_id", "tmux.default_session", "tmux.verify_timeout_ms"]
        );
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty".to_string()), Some("text".to_string()));
        assert_eq!(output, "json");
    }

    #[test]
    fn legacy_aliases_are_normalized() {
        let pretty = resolve_output(false, Some("table".to_string()), Some("human".to_string()));
        assert_eq!(pretty, "pretty");

        let text = resolve_output(false, Some("human".to_string()), Some("table".to_string()));
        assert_eq!(text, "text");
    }
}
