//! Error types for route discovery.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the discovery library.
///
/// Only an unusable project root or configuration aborts a scan. Failures
/// local to one file are turned into [`crate::discovery::Diagnostic`]s.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("project root {0:?} is not a readable directory")]
    InvalidRoot(PathBuf),
    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid configuration {path:?}: {message}")]
    Config { path: PathBuf, message: String },
}

impl DiscoveryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DiscoveryError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
