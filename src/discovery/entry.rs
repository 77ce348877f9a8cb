//! Entry point location.
//!
//! Candidates come from, in priority order: the configured entry, the
//! manifest's `main` field, conventional file names in the root and in
//! conventional source directories, and finally any source file whose text
//! looks like an Express application.

use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use regex::RegexSet;
use serde::Deserialize;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;
use crate::error::Result;
use crate::parser::{is_source_file, SOURCE_EXTENSIONS};

/// Directories searched for conventional entry files after the root.
pub const CONVENTIONAL_DIRS: &[&str] = &["src", "server", "backend", "api"];

/// Conventional entry file stems, in priority order.
pub const ENTRY_FILE_STEMS: &[&str] = &["server", "index", "app", "main"];

/// Directory names never searched.
pub const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "coverage",
    ".nyc_output",
    "logs",
    "tmp",
    "temp",
    ".cache",
    "public",
    "static",
    "assets",
    "uploads",
    "__pycache__",
    ".vscode",
    ".idea",
];

lazy_static::lazy_static! {
    /// Text that marks a file as part of an Express application.
    static ref FRAMEWORK_SIGNATURES: RegexSet = RegexSet::new([
        r#"require\s*\(\s*['"]express['"]\s*\)"#,
        r#"import\s+[^;]*?\s+from\s+['"]express['"]"#,
        r"express\s*\(\s*\)",
        r"\.get\s*\(",
        r"\.post\s*\(",
        r"\.put\s*\(",
        r"\.patch\s*\(",
        r"\.delete\s*\(",
        r"\.use\s*\(",
        r"\.listen\s*\(",
        r"Router\s*\(",
    ])
    .unwrap();
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    main: Option<String>,
}

/// Returns true if `content` carries any Express signature.
pub fn looks_like_express(content: &str) -> bool {
    FRAMEWORK_SIGNATURES.is_match(content)
}

/// Finds entry files for one project root.
pub struct EntryLocator<'a> {
    root: &'a Path,
    config: &'a ScanConfig,
    excluded: GlobSet,
}

impl<'a> EntryLocator<'a> {
    pub fn new(root: &'a Path, config: &'a ScanConfig) -> Result<Self> {
        let excluded = config.excluded_matcher(root)?;
        Ok(Self {
            root,
            config,
            excluded,
        })
    }

    /// All entry candidates: canonical, de-duplicated, outside `node_modules`,
    /// in priority order.
    pub fn locate(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(entry) = &self.config.entry {
            let entry = self.root.join(entry);
            if entry.is_file() {
                candidates.push(entry);
            } else {
                debug!(entry = %entry.display(), "configured entry does not exist");
            }
        }

        if self.config.heuristics {
            candidates.extend(self.manifest_main());
            candidates.extend(self.conventional_files());
            candidates.extend(self.signature_matches());
        }

        let mut entries: Vec<PathBuf> = Vec::new();
        for candidate in candidates {
            let Ok(canonical) = candidate.canonicalize() else {
                continue;
            };
            if in_node_modules(&canonical) || entries.contains(&canonical) {
                continue;
            }
            entries.push(canonical);
        }

        info!(count = entries.len(), "entry point candidates found");
        entries
    }

    fn manifest_main(&self) -> Option<PathBuf> {
        let content = fs::read_to_string(self.root.join("package.json")).ok()?;
        let manifest: PackageManifest = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "ignoring unreadable package.json");
                return None;
            }
        };
        let main = self.root.join(manifest.main?);
        main.is_file().then_some(main)
    }

    fn conventional_files(&self) -> Vec<PathBuf> {
        let dirs = std::iter::once(self.root.to_path_buf())
            .chain(CONVENTIONAL_DIRS.iter().map(|d| self.root.join(d)));

        let mut found = Vec::new();
        for dir in dirs {
            for stem in ENTRY_FILE_STEMS {
                for ext in SOURCE_EXTENSIONS {
                    let candidate = dir.join(format!("{}.{}", stem, ext));
                    if candidate.is_file() {
                        found.push(candidate);
                    }
                }
            }
        }
        found
    }

    fn signature_matches(&self) -> Vec<PathBuf> {
        WalkDir::new(self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_descend(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_source_file(e.path()))
            .filter(|e| !self.is_excluded(e.path()))
            .filter(|e| match fs::read_to_string(e.path()) {
                Ok(content) => looks_like_express(&content),
                Err(err) => {
                    debug!(path = %e.path().display(), error = %err, "skipping unreadable file");
                    false
                }
            })
            .map(|e| e.into_path())
            .collect()
    }

    fn should_descend(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || SKIP_DIRS.contains(&name.as_ref()) || self.config.skips_dir_name(&name) {
            return false;
        }
        !self.is_excluded(entry.path())
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let relative = path.strip_prefix(self.root).unwrap_or(path);
        self.excluded.is_match(relative)
    }
}

pub(crate) fn in_node_modules(path: &Path) -> bool {
    path.components().any(|c| c.as_os_str() == "node_modules")
}

/// Entry candidates for `root` under `config`.
pub fn locate_entry_points(root: &Path, config: &ScanConfig) -> Result<Vec<PathBuf>> {
    Ok(EntryLocator::new(root, config)?.locate())
}
