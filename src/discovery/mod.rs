//! Project-level discovery: entry points, walk, handler inference, composition.
//!
//! [`Scanner::scan`] runs the full pipeline:
//! 1. locate entry files
//! 2. walk imports depth-first from each entry, analyzing every file once
//! 3. resolve each route's handler (locally or across imports) and infer
//!    its request fields
//! 4. apply mount prefixes and de-duplicate
//!
//! Files that cannot be read or parsed become [`Diagnostic`]s; only an
//! unusable project root or configuration fails the scan.

use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

pub mod compose;
pub mod entry;
pub mod generation;
pub mod walker;

pub use compose::{compose_routes, join_url};
pub use entry::{locate_entry_points, looks_like_express, EntryLocator};
pub use generation::{ScanGenerations, ScanTicket};
pub use walker::{ProjectAnalysisState, ProjectWalker};

use crate::analysis::{infer_handler, FileAnalysis, HandlerArg, HandlerFacts, ImportBinding, RouteRecord, Span};
use crate::config::ScanConfig;
use crate::endpoint::EndpointDescriptor;
use crate::error::{DiscoveryError, Result};

/// Why a file contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ReadFailure,
    ParseFailure,
}

/// A per-file problem that did not stop the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::ReadFailure => "read failure",
            DiagnosticKind::ParseFailure => "parse failure",
        };
        write!(f, "{}: {}: {}", self.path.display(), kind, self.message)
    }
}

/// Result of one scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub endpoints: Vec<EndpointDescriptor>,
    pub entry_points: Vec<PathBuf>,
    /// Every file visited, in visit order.
    pub analyzed_files: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Discovers the endpoints of one project.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    config: ScanConfig,
}

impl Scanner {
    /// Scanner for `root`, configured from its `routescout.yaml` if present.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = canonical_root(root.as_ref())?;
        let config = ScanConfig::discover(&root)?;
        Ok(Self { root, config })
    }

    pub fn with_config<P: AsRef<Path>>(root: P, config: ScanConfig) -> Result<Self> {
        let root = canonical_root(root.as_ref())?;
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn entry_points(&self) -> Result<Vec<PathBuf>> {
        locate_entry_points(&self.root, &self.config)
    }

    pub fn scan(&self) -> Result<ScanOutcome> {
        let entry_points = self.entry_points()?;
        if entry_points.is_empty() {
            warn!(root = %self.root.display(), "no entry point found");
            return Ok(ScanOutcome::default());
        }

        let mut state = ProjectAnalysisState::new(&self.root);
        {
            let mut walker = ProjectWalker::new(&mut state, self.config.max_depth, self.config.parallel);
            for entry in &entry_points {
                debug!(entry = %entry.display(), "walking from entry point");
                walker.walk_from(entry);
            }
            walker.sweep_pending();
        }

        infer_handlers(&mut state, self.config.parallel);
        state.aggregated_routes = compose_routes(&state);

        info!(
            routes = state.aggregated_routes.len(),
            files = state.visit_order.len(),
            diagnostics = state.diagnostics.len(),
            "total routes discovered"
        );

        Ok(ScanOutcome {
            endpoints: state.aggregated_routes,
            entry_points,
            analyzed_files: state.visit_order,
            diagnostics: state.diagnostics,
        })
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    let canonical = root
        .canonicalize()
        .map_err(|_| DiscoveryError::InvalidRoot(root.to_path_buf()))?;
    if !canonical.is_dir() {
        return Err(DiscoveryError::InvalidRoot(root.to_path_buf()));
    }
    Ok(canonical)
}

/// Discover every endpoint of the project at `root`.
pub fn discover_endpoints<P: AsRef<Path>>(root: P) -> Result<Vec<EndpointDescriptor>> {
    Ok(Scanner::new(root)?.scan()?.endpoints)
}

/// Infer request fields for every route and merge them into the cached
/// routes. Inference is read-only over the state, so it runs in parallel;
/// results are applied in route order.
fn infer_handlers(state: &mut ProjectAnalysisState, parallel: bool) {
    let jobs: Vec<(PathBuf, usize)> = state
        .analyses()
        .flat_map(|a| (0..a.routes.len()).map(move |i| (a.file_path.clone(), i)))
        .collect();

    let shared: &ProjectAnalysisState = state;
    let infer = |(path, index): &(PathBuf, usize)| infer_route(shared, path, *index);
    let facts: Vec<Option<HandlerFacts>> = if parallel {
        jobs.par_iter().map(infer).collect()
    } else {
        jobs.iter().map(infer).collect()
    };

    for ((path, index), facts) in jobs.into_iter().zip(facts) {
        let Some(facts) = facts else {
            continue;
        };
        if let Some(route) = state
            .file_cache
            .get_mut(&path)
            .and_then(|a| a.routes.get_mut(index))
        {
            facts.apply_to(&mut route.endpoint);
        }
    }
}

fn infer_route(state: &ProjectAnalysisState, path: &Path, index: usize) -> Option<HandlerFacts> {
    let file = state.analysis(path)?;
    let route = file.routes.get(index)?;
    let Some((handler_file, span)) = resolve_handler(state, file, route) else {
        debug!(
            path = %path.display(),
            method = %route.endpoint.method,
            url = %route.endpoint.url,
            "no handler resolved"
        );
        return None;
    };
    let parsed = handler_file.parsed.as_ref()?;
    let function = span.locate_function(parsed)?;
    Some(infer_handler(function, &parsed.source))
}

/// Scan registration arguments from last to first. Inline functions win
/// immediately; names that resolve to no function are middleware and are
/// skipped.
fn resolve_handler<'a>(
    state: &'a ProjectAnalysisState,
    file: &'a FileAnalysis,
    route: &RouteRecord,
) -> Option<(&'a FileAnalysis, Span)> {
    route.handler_args.iter().rev().find_map(|arg| match arg {
        HandlerArg::Inline(span) => Some((file, *span)),
        HandlerArg::Identifier(name) => resolve_identifier(state, file, name),
        HandlerArg::Member { object, property } => resolve_member(state, file, object, property),
        HandlerArg::Other => None,
    })
}

fn imported_file<'a>(
    state: &'a ProjectAnalysisState,
    file: &'a FileAnalysis,
    local: &str,
) -> Option<(&'a FileAnalysis, ImportBinding<'a>)> {
    let (import, binding) = file.import_for(local)?;
    let target = state.analysis(import.resolved_path.as_deref()?)?;
    Some((target, binding))
}

fn resolve_identifier<'a>(
    state: &'a ProjectAnalysisState,
    file: &'a FileAnalysis,
    name: &str,
) -> Option<(&'a FileAnalysis, Span)> {
    if let Some(span) = file.local_functions.get(name) {
        return Some((file, *span));
    }
    let (target, binding) = imported_file(state, file, name)?;
    let span = match binding {
        ImportBinding::Named(exported) => target.find_exported_function(exported),
        ImportBinding::Default => target.default_export_function(),
        ImportBinding::Namespace => None,
    }?;
    Some((target, span))
}

/// `controller.create`: a property of a local object literal or of an
/// imported module.
fn resolve_member<'a>(
    state: &'a ProjectAnalysisState,
    file: &'a FileAnalysis,
    object: &str,
    property: &str,
) -> Option<(&'a FileAnalysis, Span)> {
    if let Some(span) = file.local_object_member(object, property) {
        return Some((file, span));
    }
    let (target, binding) = imported_file(state, file, object)?;
    let span = match binding {
        ImportBinding::Namespace => target.find_exported_function(property),
        ImportBinding::Default => target.find_object_member_function("default", property),
        ImportBinding::Named(exported) => target.find_object_member_function(exported, property),
    }?;
    Some((target, span))
}
