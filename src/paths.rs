//! XDG Base Directory Specification compliant path resolution.
//!
//! Every directory is resolved through a three-level fallback:
//! 1. Driftwatch-specific env var (DRIFTWATCH_CONFIG_DIR, etc.)
//! 2. XDG env var (XDG_CONFIG_HOME, etc.) via `etcetera`
//! 3. Platform default (~/.config, etc.)
//!
//! All paths are absolute. Relative paths from env vars are ignored per XDG
//! spec.

use anyhow::{Context, Result};
#[cfg(unix)]
use libc::getuid;
use std::path::{Path, PathBuf};

/// Resolved directory paths for the entire application.
///
/// Created once at startup, threaded through Config.
/// All paths are absolute.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Config directory: config.toml lives here
    pub config_dir: PathBuf,

    /// Data directory: stored baselines
    pub data_dir: PathBuf,

    /// State directory: event log
    pub state_dir: PathBuf,

    /// Runtime directory: scan lock.
    /// None if no suitable runtime directory is available.
    pub runtime_dir: Option<PathBuf>,
}

impl Paths {
    /// Resolve all paths using real environment variables.
    pub fn resolve() -> Result<Self> {
        Self::resolve_with_env(|key| std::env::var(key))
    }

    /// Resolve paths with a custom env var lookup (for testing).
    pub fn resolve_with_env<F>(env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        use etcetera::BaseStrategy;

        let strategy = etcetera::choose_base_strategy()
            .map_err(|e| anyhow::anyhow!("Failed to determine base directories: {}", e))?;

        let config_dir = env_or(&env_fn, "DRIFTWATCH_CONFIG_DIR", || {
            strategy.config_dir().join("driftwatch")
        });

        let data_dir = env_or(&env_fn, "DRIFTWATCH_DATA_DIR", || {
            strategy.data_dir().join("driftwatch")
        });

        let state_dir = env_or(&env_fn, "DRIFTWATCH_STATE_DIR", || {
            // etcetera's state_dir() returns None on platforms without
            // XDG_STATE_HOME; data_dir is the documented fallback.
            let base_state = strategy.state_dir().unwrap_or_else(|| strategy.data_dir());
            base_state.join("driftwatch")
        });

        // Runtime: XDG_RUNTIME_DIR or platform fallback
        let runtime_dir = resolve_runtime_dir(&env_fn);

        Ok(Self {
            config_dir,
            data_dir,
            state_dir,
            runtime_dir,
        })
    }

    // ── Convenience accessors for specific files ──

    /// Config file: config_dir/config.toml
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Default baseline location: data_dir/baseline.json
    pub fn baseline_file(&self) -> PathBuf {
        self.data_dir.join("baseline.json")
    }

    /// Event log: state_dir/driftwatch.events.jsonl
    pub fn events_file(&self) -> PathBuf {
        self.state_dir.join("driftwatch.events.jsonl")
    }

    /// Scan lock file (in runtime_dir, falls back to state_dir)
    pub fn scan_lock(&self) -> PathBuf {
        self.runtime_dir
            .as_ref()
            .unwrap_or(&self.state_dir)
            .join("scan.lock")
    }

    /// Create all directories with appropriate permissions.
    pub fn ensure_dirs(&self) -> Result<()> {
        let dirs = [&self.config_dir, &self.data_dir, &self.state_dir];

        for dir in &dirs {
            create_dir_with_mode(dir)?;
        }

        if let Some(ref runtime) = self.runtime_dir {
            create_dir_with_mode(runtime)?;
        }

        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::resolve().unwrap_or_else(|_| {
            // Emergency fallback — should never happen in practice
            let home = etcetera::home_dir().unwrap_or_else(|_| PathBuf::from("."));
            Self {
                config_dir: home.join(".config").join("driftwatch"),
                data_dir: home.join(".local").join("share").join("driftwatch"),
                state_dir: home.join(".local").join("state").join("driftwatch"),
                runtime_dir: None,
            }
        })
    }
}

/// Resolve an env var with fallback. Ignores empty and relative paths per XDG spec.
fn env_or<F>(env_fn: &F, var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    env_fn(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.is_absolute()) // XDG spec: ignore relative paths
        .unwrap_or_else(default)
}

/// Resolve runtime directory.
fn resolve_runtime_dir<F>(env_fn: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    // Try XDG_RUNTIME_DIR first
    if let Ok(dir) = env_fn("XDG_RUNTIME_DIR")
        && !dir.is_empty()
    {
        let path = PathBuf::from(&dir);
        if path.is_absolute() {
            return Some(path.join("driftwatch"));
        }
    }

    // Fallback: $TMPDIR/driftwatch-$UID on Unix
    #[cfg(unix)]
    {
        let uid = unsafe { getuid() };
        let tmpdir = env_fn("TMPDIR").unwrap_or_else(|_| "/tmp".to_string());
        Some(PathBuf::from(tmpdir).join(format!("driftwatch-{}", uid)))
    }

    #[cfg(not(unix))]
    {
        env_fn("TEMP").ok().map(|t| {
            let user = env_fn("USERNAME").unwrap_or_else(|_| "user".into());
            PathBuf::from(t).join(format!("driftwatch-{}", user))
        })
    }
}

/// Create a directory with mode 0700 per XDG spec.
fn create_dir_with_mode(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}
