//! Command-line interface for routescout.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::ScanConfig;
use crate::discovery::Scanner;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Static HTTP endpoint discovery for Express-style backends.
///
/// Routescout reads a JavaScript or TypeScript project without running it,
/// follows its imports from the entry point, and lists every route it
/// registers together with the request fields each handler reads.
#[derive(Parser)]
#[command(name = "routescout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover the endpoints of a project
    Scan(ScanArgs),
    /// List entry point candidates, best first
    Entries(EntriesArgs),
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Project root directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Entry file to start from (relative to the current directory), tried
    /// before any detected entry
    #[arg(short, long)]
    pub entry: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Path to config YAML file (default: auto-discover in the project root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// How many imports deep to follow before deferring files
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Arguments for the entries command.
#[derive(Parser)]
pub struct EntriesArgs {
    /// Project root directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover in the project root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("routescout={}", default_level)));
    // a second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    init_logging(args.verbose);

    let format = args.format.to_lowercase();
    if format != "pretty" && format != "json" {
        eprintln!(
            "Error: invalid format '{}' (use pretty or json)",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let mut config = load_config(&args.path, args.config.as_deref())?;
    if let Some(entry) = &args.entry {
        config.entry = Some(resolve_entry(entry)?);
    }
    if let Some(max_depth) = args.max_depth {
        config.max_depth = max_depth;
    }
    if let Err(e) = config.validate(Path::new("command line")) {
        eprintln!("Error: {}", e);
        return Ok(EXIT_ERROR);
    }

    let scanner = Scanner::with_config(&args.path, config)?;
    let outcome = scanner.scan()?;

    match format.as_str() {
        "json" => report::write_json(&outcome.endpoints)?,
        _ => report::write_pretty(
            &args.path.to_string_lossy(),
            &outcome,
            scanner.root(),
        ),
    }

    if outcome.entry_points.is_empty() || outcome.endpoints.is_empty() {
        return Ok(EXIT_FAILED);
    }
    Ok(EXIT_SUCCESS)
}

/// Run the entries command.
pub fn run_entries(args: &EntriesArgs) -> anyhow::Result<i32> {
    init_logging(args.verbose);

    let config = load_config(&args.path, args.config.as_deref())?;
    let scanner = Scanner::with_config(&args.path, config)?;
    let entries = scanner.entry_points()?;
    report::write_entries(&args.path.to_string_lossy(), &entries, scanner.root());

    if entries.is_empty() {
        return Ok(EXIT_FAILED);
    }
    Ok(EXIT_SUCCESS)
}

/// `--entry` is given relative to the current directory, not the project
/// root; an absolute path survives joining onto the root unchanged.
fn resolve_entry(entry: &Path) -> std::io::Result<PathBuf> {
    std::path::absolute(entry)
}

/// Explicit config file, else the one found in the project root, else defaults.
fn load_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<ScanConfig> {
    let config = match explicit {
        Some(path) => ScanConfig::parse_file(path)?,
        None => ScanConfig::discover(root)?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_scan_args() {
        let cli = Cli::parse_from([
            "routescout",
            "scan",
            "./api",
            "--entry",
            "src/main.ts",
            "--format",
            "json",
            "--max-depth",
            "8",
            "-vv",
        ]);
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(args.path, PathBuf::from("./api"));
        assert_eq!(args.entry, Some(PathBuf::from("src/main.ts")));
        assert_eq!(args.format, "json");
        assert_eq!(args.max_depth, Some(8));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_parse_entries_defaults() {
        let cli = Cli::parse_from(["routescout", "entries"]);
        let Commands::Entries(args) = cli.command else {
            panic!("expected entries command");
        };
        assert_eq!(args.path, PathBuf::from("."));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_invalid_format_is_error_exit() {
        let dir = TempDir::new().unwrap();
        let args = ScanArgs {
            path: dir.path().to_path_buf(),
            entry: None,
            format: "xml".to_string(),
            config: None,
            max_depth: None,
            verbose: 0,
        };
        assert_eq!(run_scan(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_zero_max_depth_is_error_exit() {
        let dir = TempDir::new().unwrap();
        let args = ScanArgs {
            path: dir.path().to_path_buf(),
            entry: None,
            format: "json".to_string(),
            config: None,
            max_depth: Some(0),
            verbose: 0,
        };
        assert_eq!(run_scan(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_entry_resolved_against_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            resolve_entry(Path::new("proj/server.js")).unwrap(),
            cwd.join("proj/server.js")
        );
        assert_eq!(
            resolve_entry(Path::new("/srv/app/boot.js")).unwrap(),
            PathBuf::from("/srv/app/boot.js")
        );
    }

    #[test]
    fn test_absolute_entry_scans() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("proj");
        fs::create_dir_all(project.join("lib")).unwrap();
        fs::write(
            project.join("lib/boot.js"),
            "module.exports = (app) => app.get('/boot', (req, res) => res.end());\n",
        )
        .unwrap();

        let args = ScanArgs {
            path: project.clone(),
            entry: Some(project.join("lib/boot.js")),
            format: "json".to_string(),
            config: None,
            max_depth: None,
            verbose: 0,
        };
        assert_eq!(run_scan(&args).unwrap(), EXIT_SUCCESS);
    }

    #[test]
    fn test_explicit_config_overrides_discovered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("routescout.yaml"), "max_depth: 3\n").unwrap();
        let explicit = dir.path().join("other.yaml");
        fs::write(&explicit, "max_depth: 9\nheuristics: false\n").unwrap();

        let discovered = load_config(dir.path(), None).unwrap();
        assert_eq!(discovered.max_depth, 3);
        let loaded = load_config(dir.path(), Some(&explicit)).unwrap();
        assert_eq!(loaded.max_depth, 9);
        assert!(!loaded.heuristics);
    }

    #[test]
    fn test_missing_root_is_error() {
        let args = EntriesArgs {
            path: PathBuf::from("/definitely/not/here"),
            config: None,
            verbose: 0,
        };
        assert!(run_entries(&args).is_err());
    }
}
