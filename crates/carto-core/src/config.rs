//! Engine configuration.
//!
//! Load order: `<config root>/config.toml` → environment variables →
//! defaults. The config root itself is `$CARTOGRAPH_HOME` when set,
//! otherwise a platform-appropriate per-user directory plus `cartograph/`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub propagation: PropagationConfig,
    pub scan: ScanConfig,
    pub diff: DiffConfig,
    pub query: QueryConfig,
    pub storage: StorageConfig,
}

/// Bounds on the cascade re-resolution that follows an export change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Maximum number of dependent files re-resolved per original edit.
    pub max_fanout: usize,
    /// Maximum cascade depth (1 = immediate dependents only).
    pub max_depth: usize,
}

/// Cold-start project scan ceilings. Files beyond either limit stay out of
/// the graph until they are edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub max_files: usize,
    pub max_duration_ms: u64,
}

/// Delta-computation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Line window within which a structure-hash match counts as a rename.
    pub rename_window: usize,
}

/// Query-side tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// BFS depth for file-level impact analysis.
    pub impact_depth: usize,
    /// Top-K size for summary degree rankings.
    pub summary_top_k: usize,
    /// Names matching any of these regexes are never reported dead.
    pub entrypoint_patterns: Vec<String>,
}

/// Snapshot storage options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Compress the snapshot with zstd. Decompression on load is automatic
    /// (detected by magic bytes).
    pub compress: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            max_fanout: 16,
            max_depth: 2,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_files: 200,
            max_duration_ms: 7_000,
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { rename_window: 10 }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            impact_depth: 5,
            summary_top_k: 10,
            entrypoint_patterns: vec!["^(main|run|start|handler|init)$".to_string()],
        }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl EngineConfig {
    /// Load config from `<config_root>/config.toml` with env overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(config_root: &Path) -> Result<Self> {
        let config_path = config_root.join("config.toml");

        let mut config: EngineConfig = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        env_override("CARTOGRAPH_MAX_FANOUT", &mut config.propagation.max_fanout);
        env_override("CARTOGRAPH_MAX_DEPTH", &mut config.propagation.max_depth);
        env_override("CARTOGRAPH_SCAN_MAX_FILES", &mut config.scan.max_files);
        env_override("CARTOGRAPH_SCAN_MAX_MS", &mut config.scan.max_duration_ms);
        env_override("CARTOGRAPH_RENAME_WINDOW", &mut config.diff.rename_window);
        env_override("CARTOGRAPH_IMPACT_DEPTH", &mut config.query.impact_depth);
        env_override("CARTOGRAPH_COMPRESS", &mut config.storage.compress);

        if config.propagation.max_fanout == 0 {
            anyhow::bail!("propagation.max_fanout must be at least 1");
        }
        if config.query.impact_depth == 0 {
            anyhow::bail!("query.impact_depth must be at least 1");
        }
        for pattern in &config.query.entrypoint_patterns {
            if regex::Regex::new(pattern).is_err() {
                anyhow::bail!("invalid entrypoint pattern '{pattern}'");
            }
        }

        Ok(config)
    }
}

/// Resolve the per-user config root: `$CARTOGRAPH_HOME`, else the platform
/// config directory plus `cartograph/`.
pub fn config_root() -> PathBuf {
    if let Ok(home) = std::env::var("CARTOGRAPH_HOME")
        && !home.is_empty()
    {
        return PathBuf::from(home);
    }
    let base = if cfg!(target_os = "windows") {
        std::env::var("APPDATA").map(PathBuf::from).ok()
    } else if cfg!(target_os = "macos") {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
            .ok()
    } else {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")).ok())
    };
    base.unwrap_or_else(|| PathBuf::from(".")).join("cartograph")
}

/// Snapshot path for a project: one file per project root under
/// `<config root>/graphs/`, named after the directory plus a short hash of
/// the absolute path so multiplexed hosts stay partitioned.
pub fn snapshot_path(config_root: &Path, project_root: &Path) -> PathBuf {
    let stem = project_root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string());
    let mut hasher = Sha256::new();
    hasher.update(project_root.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize())[..8].to_string();
    config_root.join("graphs").join(format!("{stem}-{digest}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.propagation.max_fanout, 16);
        assert_eq!(config.propagation.max_depth, 2);
        assert_eq!(config.scan.max_files, 200);
        assert_eq!(config.scan.max_duration_ms, 7_000);
        assert_eq!(config.diff.rename_window, 10);
        assert_eq!(config.query.impact_depth, 5);
        assert!(!config.storage.compress);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[propagation]
max_fanout = 32

[scan]
max_files = 500

[storage]
compress = true
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.propagation.max_fanout, 32);
        assert_eq!(config.scan.max_files, 500);
        assert!(config.storage.compress);
        // Defaults for unspecified fields
        assert_eq!(config.propagation.max_depth, 2);
        assert_eq!(config.diff.rename_window, 10);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let config = EngineConfig::load(Path::new("/nonexistent/path")).unwrap();
        assert_eq!(config.scan.max_files, 200);
    }

    #[test]
    fn test_config_rejects_zero_fanout() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("config.toml"), "[propagation]\nmax_fanout = 0\n").unwrap();
        assert!(EngineConfig::load(tmp.path()).is_err());
    }

    #[test]
    fn test_config_rejects_bad_entrypoint_pattern() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[query]\nentrypoint_patterns = [\"([\"]\n",
        )
        .unwrap();
        assert!(EngineConfig::load(tmp.path()).is_err());
    }

    #[test]
    fn test_snapshot_path_partitions_projects() {
        let root = Path::new("/tmp/carto-config");
        let a = snapshot_path(root, Path::new("/work/alpha"));
        let b = snapshot_path(root, Path::new("/other/alpha"));
        assert_ne!(a, b);
        assert!(a.to_string_lossy().contains("alpha-"));
        assert!(a.starts_with(root.join("graphs")));
    }
}
