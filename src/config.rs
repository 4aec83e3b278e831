use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::clipboard::DEFAULT_FEEDBACK;
use crate::layout::{
    SidebarLimits, DEFAULT_COLLAPSED_WIDTH, DEFAULT_COMPACT_BREAKPOINT, DEFAULT_MAX_WIDTH,
    DEFAULT_MIN_WIDTH, DEFAULT_RESIZE_STEP, DEFAULT_SIDEBAR_WIDTH,
};

const DEFAULT_ENV_PREFIX: &str = "INTERVIEW_OS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub sidebar: SidebarConfig,
    #[serde(default)]
    pub clipboard: ClipboardConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    pub fn sidebar_limits(&self) -> SidebarLimits {
        SidebarLimits {
            min_width: self.sidebar.min_width,
            max_width: self.sidebar.max_width,
            default_width: self.sidebar.default_width,
            collapsed_width: self.sidebar.collapsed_width,
            resize_step: self.sidebar.resize_step,
            compact_breakpoint: self.ui.compact_breakpoint,
        }
        .normalized()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    /// Terminals this many columns wide or narrower use the compact layout.
    #[serde(default = "default_compact_breakpoint")]
    pub compact_breakpoint: u16,
    #[serde(default = "default_tick_rate", with = "humantime_serde")]
    pub tick_rate: Duration,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            compact_breakpoint: default_compact_breakpoint(),
            tick_rate: default_tick_rate(),
        }
    }
}

fn default_compact_breakpoint() -> u16 {
    DEFAULT_COMPACT_BREAKPOINT
}

fn default_tick_rate() -> Duration {
    Duration::from_millis(100)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SidebarConfig {
    #[serde(default = "default_min_width")]
    pub min_width: u16,
    #[serde(default = "default_max_width")]
    pub max_width: u16,
    #[serde(default = "default_width")]
    pub default_width: u16,
    #[serde(default = "default_collapsed_width")]
    pub collapsed_width: u16,
    #[serde(default = "default_resize_step")]
    pub resize_step: u16,
}

impl Default for SidebarConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            max_width: default_max_width(),
            default_width: default_width(),
            collapsed_width: default_collapsed_width(),
            resize_step: default_resize_step(),
        }
    }
}

fn default_min_width() -> u16 {
    DEFAULT_MIN_WIDTH
}

fn default_max_width() -> u16 {
    DEFAULT_MAX_WIDTH
}

fn default_width() -> u16 {
    DEFAULT_SIDEBAR_WIDTH
}

fn default_collapsed_width() -> u16 {
    DEFAULT_COLLAPSED_WIDTH
}

fn default_resize_step() -> u16 {
    DEFAULT_RESIZE_STEP
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipboardConfig {
    #[serde(default = "default_feedback", with = "humantime_serde")]
    pub feedback: Duration,
    #[serde(default = "default_osc52_fallback")]
    pub osc52_fallback: bool,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            feedback: default_feedback(),
            osc52_fallback: default_osc52_fallback(),
        }
    }
}

fn default_feedback() -> Duration {
    DEFAULT_FEEDBACK
}

fn default_osc52_fallback() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogConfig {
    /// External catalog file. The embedded catalog is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    load_with_vars(options, env::vars())
}

/// Like [`load`], with the environment supplied by the caller.
pub fn load_with_vars<I>(options: LoadOptions, vars: I) -> Result<Config>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix, vars);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if other.ui.compact_breakpoint != 0 {
        base.ui.compact_breakpoint = other.ui.compact_breakpoint;
    }
    if !other.ui.tick_rate.is_zero() {
        base.ui.tick_rate = other.ui.tick_rate;
    }

    if other.sidebar.min_width != 0 {
        base.sidebar.min_width = other.sidebar.min_width;
    }
    if other.sidebar.max_width != 0 {
        base.sidebar.max_width = other.sidebar.max_width;
    }
    if other.sidebar.default_width != 0 {
        base.sidebar.default_width = other.sidebar.default_width;
    }
    if other.sidebar.collapsed_width != 0 {
        base.sidebar.collapsed_width = other.sidebar.collapsed_width;
    }
    if other.sidebar.resize_step != 0 {
        base.sidebar.resize_step = other.sidebar.resize_step;
    }

    if !other.clipboard.feedback.is_zero() {
        base.clipboard.feedback = other.clipboard.feedback;
    }
    base.clipboard.osc52_fallback = other.clipboard.osc52_fallback;

    if other.catalog.path.is_some() {
        base.catalog.path = other.catalog.path;
    }
    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    if !other.log.level.is_empty() {
        base.log.level = other.log.level;
    }
    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }

    base
}

/// Applies `<PREFIX>_<SECTION>__<FIELD>` variables on top of `cfg`.
fn apply_env<I>(cfg: &mut Config, prefix: &str, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            apply_env_value(cfg, &normalized, value);
        }
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    let parse_width = |value: &str| value.trim().parse::<u16>().ok().filter(|v| *v != 0);
    match key {
        "ui.compact_breakpoint" => {
            if let Some(parsed) = parse_width(&value) {
                cfg.ui.compact_breakpoint = parsed;
            }
        }
        "ui.tick_rate" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.tick_rate = duration;
            }
        }
        "sidebar.min_width" => {
            if let Some(parsed) = parse_width(&value) {
                cfg.sidebar.min_width = parsed;
            }
        }
        "sidebar.max_width" => {
            if let Some(parsed) = parse_width(&value) {
                cfg.sidebar.max_width = parsed;
            }
        }
        "sidebar.default_width" => {
            if let Some(parsed) = parse_width(&value) {
                cfg.sidebar.default_width = parsed;
            }
        }
        "sidebar.collapsed_width" => {
            if let Some(parsed) = parse_width(&value) {
                cfg.sidebar.collapsed_width = parsed;
            }
        }
        "sidebar.resize_step" => {
            if let Some(parsed) = parse_width(&value) {
                cfg.sidebar.resize_step = parsed;
            }
        }
        "clipboard.feedback" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.clipboard.feedback = duration;
            }
        }
        "clipboard.osc52_fallback" => {
            cfg.clipboard.osc52_fallback =
                matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "catalog.path" => cfg.catalog.path = Some(PathBuf::from(value)),
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("interview-os").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_layout_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.sidebar_limits(), SidebarLimits::default());
        assert_eq!(cfg.clipboard.feedback, Duration::from_secs(2));
        assert!(cfg.clipboard.osc52_fallback);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let cfg = load_with_vars(
            LoadOptions {
                config_file: Some(dir.path().join("absent.yaml")),
                env_prefix: None,
            },
            Vec::new(),
        )
        .unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "sidebar:\n  max_width: 50\n  default_width: 32\nclipboard:\n  feedback: 3s\n  osc52_fallback: false\nlog:\n  level: debug\n",
        )
        .unwrap();
        let cfg = load_with_vars(
            LoadOptions {
                config_file: Some(path),
                env_prefix: None,
            },
            Vec::new(),
        )
        .unwrap();
        assert_eq!(cfg.sidebar.max_width, 50);
        assert_eq!(cfg.sidebar.default_width, 32);
        assert_eq!(cfg.sidebar.min_width, DEFAULT_MIN_WIDTH);
        assert_eq!(cfg.clipboard.feedback, Duration::from_secs(3));
        assert!(!cfg.clipboard.osc52_fallback);
        assert_eq!(cfg.log.level, "debug");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "sidebar: [not, a, map]\n").unwrap();
        let err = load_with_vars(
            LoadOptions {
                config_file: Some(path),
                env_prefix: None,
            },
            Vec::new(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn env_values_apply_on_top() {
        let mut cfg = Config::default();
        apply_env(
            &mut cfg,
            "interview_os",
            vars(&[
                ("INTERVIEW_OS_SIDEBAR__MAX_WIDTH", "60"),
                ("INTERVIEW_OS_UI__COMPACT_BREAKPOINT", "100"),
                ("INTERVIEW_OS_CLIPBOARD__FEEDBACK", "500ms"),
                ("INTERVIEW_OS_CATALOG__PATH", "/tmp/catalog.yaml"),
                ("OTHER_SIDEBAR__MAX_WIDTH", "10"),
            ]),
        );
        assert_eq!(cfg.sidebar.max_width, 60);
        assert_eq!(cfg.ui.compact_breakpoint, 100);
        assert_eq!(cfg.clipboard.feedback, Duration::from_millis(500));
        assert_eq!(
            cfg.catalog.path.as_deref(),
            Some(Path::new("/tmp/catalog.yaml"))
        );
    }

    #[test]
    fn unparseable_env_values_are_ignored() {
        let mut cfg = Config::default();
        apply_env(
            &mut cfg,
            "INTERVIEW_OS",
            vars(&[
                ("INTERVIEW_OS_SIDEBAR__MIN_WIDTH", "wide"),
                ("INTERVIEW_OS_SIDEBAR__RESIZE_STEP", "0"),
                ("INTERVIEW_OS_UI__TICK_RATE", "soon"),
            ]),
        );
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn env_overrides_file_with_custom_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "log:\n  level: debug\nsidebar:\n  max_width: 50\n").unwrap();
        let cfg = load_with_vars(
            LoadOptions {
                config_file: Some(path),
                env_prefix: Some("STUDY".into()),
            },
            vars(&[
                ("STUDY_LOG__LEVEL", "trace"),
                ("INTERVIEW_OS_LOG__LEVEL", "error"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.log.level, "trace");
        assert_eq!(cfg.sidebar.max_width, 50);
    }

    #[test]
    fn inverted_sidebar_range_is_repaired() {
        let mut cfg = Config::default();
        cfg.sidebar.min_width = 45;
        cfg.sidebar.max_width = 25;
        let limits = cfg.sidebar_limits();
        assert_eq!((limits.min_width, limits.max_width), (25, 45));
        assert_eq!(limits.default_width, DEFAULT_SIDEBAR_WIDTH);
    }
}
