//! Import specifier resolution.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::parser::SOURCE_EXTENSIONS;

/// Maps module specifiers to canonical project files.
///
/// Relative specifiers resolve against the importing file's directory and
/// root-absolute ones (`/lib/db`) against the project root. Package
/// specifiers never resolve.
#[derive(Debug, Clone)]
pub struct ImportResolver {
    project_root: PathBuf,
}

impl ImportResolver {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn resolve(&self, specifier: &str, from_file: &Path) -> Option<PathBuf> {
        let relative = matches!(specifier, "." | "..")
            || specifier.starts_with("./")
            || specifier.starts_with("../");
        let base = if relative {
            from_file.parent()?.join(specifier)
        } else if let Some(rest) = specifier.strip_prefix('/') {
            self.project_root.join(rest)
        } else {
            return None;
        };

        candidates(&base)
            .into_iter()
            .find(|c| c.is_file())
            .and_then(|c| c.canonicalize().ok())
    }
}

/// Candidate files for a specifier base, most specific first.
fn candidates(base: &Path) -> Vec<PathBuf> {
    let mut out = vec![base.to_path_buf()];
    for ext in SOURCE_EXTENSIONS {
        out.push(with_suffix(base, ext));
    }

    // compiled-output specifiers written against TypeScript sources
    if let Some(ext) = base.extension().and_then(|e| e.to_str()) {
        let swapped: &[&str] = match ext {
            "js" => &["ts", "tsx"],
            "mjs" => &["mts"],
            "cjs" => &["cts"],
            "jsx" => &["tsx"],
            _ => &[],
        };
        for alt in swapped {
            out.push(base.with_extension(alt));
        }
    }

    for ext in SOURCE_EXTENSIONS {
        out.push(base.join(format!("index.{}", ext)));
    }
    out
}

fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ImportResolver) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("routes/admin")).unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("server.js"), "").unwrap();
        fs::write(dir.path().join("routes/users.js"), "").unwrap();
        fs::write(dir.path().join("routes/admin/index.ts"), "").unwrap();
        fs::write(dir.path().join("lib/db.ts"), "").unwrap();
        let root = dir.path().canonicalize().unwrap();
        (dir, ImportResolver::new(root))
    }

    #[test]
    fn test_relative_with_extension_appended() {
        let (_dir, resolver) = setup();
        let from = resolver.project_root().join("server.js");
        let resolved = resolver.resolve("./routes/users", &from).unwrap();
        assert_eq!(resolved, resolver.project_root().join("routes/users.js"));
    }

    #[test]
    fn test_directory_index() {
        let (_dir, resolver) = setup();
        let from = resolver.project_root().join("server.js");
        let resolved = resolver.resolve("./routes/admin", &from).unwrap();
        assert_eq!(resolved, resolver.project_root().join("routes/admin/index.ts"));
    }

    #[test]
    fn test_js_specifier_for_ts_source() {
        let (_dir, resolver) = setup();
        let from = resolver.project_root().join("routes/users.js");
        let resolved = resolver.resolve("../lib/db.js", &from).unwrap();
        assert_eq!(resolved, resolver.project_root().join("lib/db.ts"));
    }

    #[test]
    fn test_root_absolute() {
        let (_dir, resolver) = setup();
        let from = resolver.project_root().join("routes/users.js");
        assert!(resolver.resolve("/lib/db", &from).is_some());
    }

    #[test]
    fn test_packages_and_missing_files() {
        let (_dir, resolver) = setup();
        let from = resolver.project_root().join("server.js");
        assert_eq!(resolver.resolve("express", &from), None);
        assert_eq!(resolver.resolve("./nope", &from), None);
    }
}
