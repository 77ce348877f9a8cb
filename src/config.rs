//! Scan configuration.
//!
//! An optional `routescout.yaml` (or `.routescout.yaml`) in the project root
//! tunes entry detection and the walk. Every field has a default, so an
//! absent or empty file means "scan with heuristics".

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// Config file names looked up in the project root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["routescout.yaml", ".routescout.yaml"];

/// Default maximum import depth followed depth-first.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ScanConfig {
    /// Entry file, relative to the project root. Placed before any
    /// heuristically found entry.
    #[serde(default)]
    pub entry: Option<PathBuf>,
    /// Whether to look for entry points by convention and content.
    #[serde(default = "default_true")]
    pub heuristics: bool,
    /// Directory names skipped in addition to the built-in list.
    #[serde(default)]
    pub extra_skip_dirs: Vec<String>,
    /// Glob patterns (relative to the root) excluded from entry detection.
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Use worker threads for the pending-file sweep and handler inference.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            entry: None,
            heuristics: true,
            extra_skip_dirs: Vec::new(),
            excluded_paths: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            parallel: true,
        }
    }
}

impl ScanConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| DiscoveryError::io(path, e))?;
        Self::parse_str(&content, path)
    }

    /// Parse YAML text; `origin` names the source in errors.
    pub fn parse_str(content: &str, origin: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ScanConfig =
            serde_yaml::from_str(content).map_err(|e| DiscoveryError::Config {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Load the first config file found in `root`, or the defaults.
    pub fn discover(root: &Path) -> Result<Self> {
        match Self::find_in(root) {
            Some(path) => Self::parse_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn find_in(root: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.is_file())
    }

    pub fn validate(&self, origin: &Path) -> Result<()> {
        if self.max_depth == 0 {
            return Err(DiscoveryError::Config {
                path: origin.to_path_buf(),
                message: "max_depth must be at least 1".to_string(),
            });
        }
        self.excluded_matcher(origin).map(|_| ())
    }

    /// Compile `excluded_paths` into one matcher.
    pub fn excluded_matcher(&self, origin: &Path) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|e| DiscoveryError::Config {
                path: origin.to_path_buf(),
                message: format!("invalid excluded path {:?}: {}", pattern, e),
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| DiscoveryError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn skips_dir_name(&self, name: &str) -> bool {
        self.extra_skip_dirs.iter().any(|d| d == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::parse_str("", Path::new("routescout.yaml")).unwrap();
        assert_eq!(config, ScanConfig::default());
        assert!(config.heuristics);
        assert!(config.parallel);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_parse_fields() {
        let yaml = r#"
entry: src/server.ts
heuristics: false
extra_skip_dirs: [generated]
excluded_paths:
  - "**/fixtures/**"
max_depth: 8
parallel: false
"#;
        let config = ScanConfig::parse_str(yaml, Path::new("routescout.yaml")).unwrap();
        assert_eq!(config.entry, Some(PathBuf::from("src/server.ts")));
        assert!(!config.heuristics);
        assert!(config.skips_dir_name("generated"));
        assert_eq!(config.max_depth, 8);
        assert!(!config.parallel);

        let matcher = config.excluded_matcher(Path::new("routescout.yaml")).unwrap();
        assert!(matcher.is_match("test/fixtures/app.js"));
        assert!(!matcher.is_match("src/app.js"));
    }

    #[test]
    fn test_invalid_config() {
        let origin = Path::new("routescout.yaml");
        assert!(matches!(
            ScanConfig::parse_str("max_depth: 0", origin),
            Err(DiscoveryError::Config { .. })
        ));
        assert!(matches!(
            ScanConfig::parse_str("excluded_paths: ['a[']", origin),
            Err(DiscoveryError::Config { .. })
        ));
        assert!(matches!(
            ScanConfig::parse_str("max_depth: lots", origin),
            Err(DiscoveryError::Config { .. })
        ));
    }

    #[test]
    fn test_discover() {
        let dir = TempDir::new().unwrap();
        assert_eq!(ScanConfig::discover(dir.path()).unwrap(), ScanConfig::default());

        fs::write(dir.path().join(".routescout.yaml"), "max_depth: 3\n").unwrap();
        assert_eq!(ScanConfig::discover(dir.path()).unwrap().max_depth, 3);
    }
}
