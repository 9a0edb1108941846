mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{EngineError, HashAlgorithm, ScanLimits, walk};
use crate::paths::Paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolved XDG-compliant paths (not serialized)
    #[serde(skip)]
    pub paths: Paths,

    /// File this config was loaded from, when not the default location.
    /// `save` writes back to it.
    #[serde(skip)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub alerts: AlertsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory tree to baseline. Tilde-expanded.
    #[serde(default = "default_root")]
    pub root: String,

    /// "sha256" or "sha512"
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,

    /// Wall-clock budget for one whole scan, in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Hard cap on filesystem entries visited per scan
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl ScanConfig {
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.root).to_string())
    }

    pub fn algorithm(&self) -> Result<HashAlgorithm, EngineError> {
        self.hash_algorithm.parse()
    }

    pub fn limits(&self) -> ScanLimits {
        ScanLimits {
            deadline: Duration::from_secs(self.deadline_secs),
            max_items: self.max_items,
        }
    }
}

/// Glob rules, matched against slash-separated paths relative to the scan
/// root. Precedence when a path matches several lists: excluded, then
/// critical, then whitelisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Ignored entirely: never hashed, never reported as drift
    #[serde(default = "default_excluded_patterns")]
    pub excluded_patterns: Vec<String>,

    /// Drift here is flagged as a critical violation
    #[serde(default)]
    pub critical_patterns: Vec<String>,

    /// Expected to churn: enumerated but never stored
    #[serde(default)]
    pub whitelisted_patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Fail verification when files exist that the baseline has no record
    /// of (default: false, report-only)
    #[serde(default)]
    pub fail_on_unauthorized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default)]
    pub active_hours: Option<ActiveHours>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveHours {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Override the event log location (default: under the state dir)
    #[serde(default)]
    pub events_file: Option<String>,
}

// Default value functions
fn default_root() -> String {
    ".".to_string()
}
fn default_hash_algorithm() -> String {
    "sha256".to_string()
}
fn default_deadline_secs() -> u64 {
    walk::DEFAULT_DEADLINE_SECS
}
fn default_max_items() -> usize {
    walk::DEFAULT_MAX_ITEMS
}
fn default_excluded_patterns() -> Vec<String> {
    vec![".git/**".to_string(), "**/.git/**".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_interval() -> String {
    "30m".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            hash_algorithm: default_hash_algorithm(),
            deadline_secs: default_deadline_secs(),
            max_items: default_max_items(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            excluded_patterns: default_excluded_patterns(),
            critical_patterns: Vec::new(),
            whitelisted_patterns: Vec::new(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval: default_interval(),
            active_hours: None,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            events_file: None,
        }
    }
}

/// Which rule list a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Critical,
    Whitelisted,
}

impl RuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Critical => "critical",
            RuleKind::Whitelisted => "whitelisted",
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load config, optionally from an explicit file instead of the
    /// resolved default location.
    pub fn load_from(override_path: Option<&Path>) -> Result<Self> {
        let paths = Paths::resolve()?;
        paths.ensure_dirs()?;
        let path = match override_path {
            Some(p) => p.to_path_buf(),
            None => paths.config_file(),
        };

        if !path.exists() {
            if override_path.is_some() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            // Create default config file on first run
            let config = Config {
                paths,
                ..Config::default()
            };
            config.save_with_template()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path)?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.paths = paths;
        config.source = override_path.map(Path::to_path_buf);

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = match &self.source {
            Some(p) => p.clone(),
            None => self.paths.config_file(),
        };

        // Create parent directories
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;

        Ok(())
    }

    /// Save config with a helpful template (for first-time setup)
    pub fn save_with_template(&self) -> Result<()> {
        let path = self.paths.config_file();

        // Create parent directories
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", path.display());

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let paths = Paths::resolve()?;
        Ok(paths.config_file())
    }

    /// Where the event log lives, honoring the config override.
    pub fn events_file(&self) -> PathBuf {
        match &self.alerts.events_file {
            Some(p) => PathBuf::from(shellexpand::tilde(p).to_string()),
            None => self.paths.events_file(),
        }
    }

    /// Append patterns to a rule list, skipping ones already present.
    /// Every pattern is validated before anything is stored.
    pub fn add_patterns(&mut self, kind: RuleKind, patterns: &[String]) -> Result<usize> {
        crate::engine::classify::validate_patterns(patterns)?;

        let list = match kind {
            RuleKind::Critical => &mut self.rules.critical_patterns,
            RuleKind::Whitelisted => &mut self.rules.whitelisted_patterns,
        };

        let mut added = 0;
        for pattern in patterns {
            if !list.contains(pattern) {
                list.push(pattern.clone());
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["scan", "root"] => Ok(self.scan.root.clone()),
            ["scan", "hash_algorithm"] => Ok(self.scan.hash_algorithm.clone()),
            ["scan", "deadline_secs"] => Ok(self.scan.deadline_secs.to_string()),
            ["scan", "max_items"] => Ok(self.scan.max_items.to_string()),
            ["verify", "fail_on_unauthorized"] => {
                Ok(self.verify.fail_on_unauthorized.to_string())
            }
            ["schedule", "enabled"] => Ok(self.schedule.enabled.to_string()),
            ["schedule", "interval"] => Ok(self.schedule.interval.clone()),
            ["alerts", "enabled"] => Ok(self.alerts.enabled.to_string()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["scan", "root"] => self.scan.root = value.to_string(),
            ["scan", "hash_algorithm"] => {
                value.parse::<HashAlgorithm>()?;
                self.scan.hash_algorithm = value.to_string();
            }
            ["scan", "deadline_secs"] => self.scan.deadline_secs = value.parse()?,
            ["scan", "max_items"] => self.scan.max_items = value.parse()?,
            ["verify", "fail_on_unauthorized"] => {
                self.verify.fail_on_unauthorized = value.parse()?
            }
            ["schedule", "enabled"] => self.schedule.enabled = value.parse()?,
            ["schedule", "interval"] => {
                parse_duration(value)?;
                self.schedule.interval = value.to_string();
            }
            ["alerts", "enabled"] => self.alerts.enabled = value.parse()?,
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }
}

/// Default config template with helpful comments (used for first-time setup)
pub(crate) const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Driftwatch Configuration
# Auto-created on first run. Edit as needed.

[scan]
# Directory tree to baseline, tilde-expanded (e.g. "~/projects/api")
root = "."
# sha256 | sha512
hash_algorithm = "sha256"
# Wall-clock budget for one whole scan (enumeration plus hashing)
deadline_secs = 30
# Hard cap on filesystem entries visited per scan
max_items = 10000

[rules]
# Globs match slash-separated paths relative to the scan root.
# `*` stays inside one path segment; use `**` to cross directories.
# Precedence: excluded > critical > whitelisted.
excluded_patterns = [".git/**", "**/.git/**"]
critical_patterns = []
whitelisted_patterns = []
# e.g.
# excluded_patterns = [".git/**", "**/node_modules/**", "target/**"]
# critical_patterns = ["*.key", "config/**", ".env"]
# whitelisted_patterns = ["**/*.log", "cache/**"]

[verify]
# Fail verification when files exist that the baseline has no record of
fail_on_unauthorized = false

[schedule]
enabled = true
interval = "30m"

# Only verify during these hours (optional)
# [schedule.active_hours]
# start = "09:00"
# end = "22:00"

[alerts]
enabled = true
# events_file = "~/.local/state/driftwatch/driftwatch.events.jsonl"
"#;
