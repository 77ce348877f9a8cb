//! Project walk: analyze every file reachable from the entry points.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use super::entry::in_node_modules;
use super::{Diagnostic, DiagnosticKind};
use crate::analysis::{analyze_file, FileAnalysis, ImportResolver};
use crate::endpoint::EndpointDescriptor;
use crate::error::DiscoveryError;

/// All facts gathered during one scan.
#[derive(Debug)]
pub struct ProjectAnalysisState {
    pub project_root: PathBuf,
    /// Keyed by canonical absolute path.
    pub file_cache: HashMap<PathBuf, FileAnalysis>,
    /// Files in the order they were first visited.
    pub visit_order: Vec<PathBuf>,
    pub visited: HashSet<PathBuf>,
    pub aggregated_routes: Vec<EndpointDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProjectAnalysisState {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            file_cache: HashMap::new(),
            visit_order: Vec::new(),
            visited: HashSet::new(),
            aggregated_routes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn analysis(&self, path: &Path) -> Option<&FileAnalysis> {
        self.file_cache.get(path)
    }

    /// Cached analyses in visit order.
    pub fn analyses(&self) -> impl Iterator<Item = &FileAnalysis> {
        self.visit_order
            .iter()
            .filter_map(|p| self.file_cache.get(p))
    }

    /// Marks `path` visited; false if it already was.
    fn claim(&mut self, path: &Path) -> bool {
        if !self.visited.insert(path.to_path_buf()) {
            return false;
        }
        self.visit_order.push(path.to_path_buf());
        true
    }

    fn store(&mut self, path: PathBuf, result: crate::Result<FileAnalysis>) {
        let analysis = match result {
            Ok(analysis) => {
                debug!(
                    path = %path.display(),
                    routes = analysis.routes.len(),
                    mounts = analysis.route_mounts.len(),
                    "analyzed file"
                );
                analysis
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not analyze file");
                self.diagnostics.push(Diagnostic::from_error(&path, &err));
                FileAnalysis::empty(&path)
            }
        };
        self.file_cache.insert(path, analysis);
    }
}

/// Depth-first walker over resolved imports.
pub struct ProjectWalker<'a> {
    state: &'a mut ProjectAnalysisState,
    resolver: ImportResolver,
    max_depth: usize,
    parallel: bool,
    /// Files first seen beyond `max_depth`.
    pending: Vec<PathBuf>,
}

impl<'a> ProjectWalker<'a> {
    pub fn new(state: &'a mut ProjectAnalysisState, max_depth: usize, parallel: bool) -> Self {
        let resolver = ImportResolver::new(state.project_root.clone());
        Self {
            state,
            resolver,
            max_depth,
            parallel,
            pending: Vec::new(),
        }
    }

    /// Walk everything reachable from `entry`. Files already visited are not
    /// re-entered, which also breaks import cycles.
    pub fn walk_from(&mut self, entry: &Path) {
        let mut stack: Vec<(PathBuf, usize)> = vec![(entry.to_path_buf(), 0)];

        while let Some((path, depth)) = stack.pop() {
            if depth > self.max_depth {
                if !self.state.visited.contains(&path) {
                    self.pending.push(path);
                }
                continue;
            }
            if in_node_modules(&path) || !self.state.claim(&path) {
                continue;
            }

            let result = analyze_file(&path, &self.resolver);
            let imports: Vec<PathBuf> = match &result {
                Ok(analysis) => analysis.resolved_imports().map(Path::to_path_buf).collect(),
                Err(_) => Vec::new(),
            };
            self.state.store(path, result);

            // reversed so the first import is walked first
            for import in imports.into_iter().rev() {
                if !self.state.visited.contains(&import) {
                    stack.push((import, depth + 1));
                }
            }
        }
    }

    /// Analyze files left over by the depth limit, and any resolved import
    /// not yet in the cache, until nothing is missing.
    pub fn sweep_pending(&mut self) {
        loop {
            let mut batch: Vec<PathBuf> = Vec::new();
            let missing = self
                .state
                .analyses()
                .flat_map(|a| a.resolved_imports())
                .map(Path::to_path_buf)
                .collect::<Vec<_>>();
            for path in self.pending.drain(..).chain(missing) {
                if in_node_modules(&path) || batch.contains(&path) {
                    continue;
                }
                if !self.state.visited.contains(&path) {
                    batch.push(path);
                }
            }
            if batch.is_empty() {
                return;
            }
            debug!(files = batch.len(), "analyzing pending imports");

            for path in &batch {
                self.state.claim(path);
            }
            let resolver = &self.resolver;
            let results: Vec<(PathBuf, crate::Result<FileAnalysis>)> = if self.parallel {
                batch
                    .into_par_iter()
                    .map(|p| {
                        let result = analyze_file(&p, resolver);
                        (p, result)
                    })
                    .collect()
            } else {
                batch
                    .into_iter()
                    .map(|p| {
                        let result = analyze_file(&p, resolver);
                        (p, result)
                    })
                    .collect()
            };
            for (path, result) in results {
                self.state.store(path, result);
            }
        }
    }
}

impl Diagnostic {
    pub(crate) fn from_error(path: &Path, err: &DiscoveryError) -> Self {
        let kind = match err {
            DiscoveryError::Parse { .. } => DiagnosticKind::ParseFailure,
            _ => DiagnosticKind::ReadFailure,
        };
        let message = match err {
            DiscoveryError::Parse { message, .. } => message.clone(),
            DiscoveryError::Io { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        Diagnostic {
            path: path.to_path_buf(),
            kind,
            message,
        }
    }
}
