//! AST-backed analysis of individual source files.
//!
//! This module extracts per-file facts using tree-sitter:
//! - Imports (ES modules and `require`) and what they bind
//! - Exports (CommonJS and ES modules) and the functions behind them
//! - Route registrations (`x.get('/path', ...)`) and router mounts (`x.use('/prefix', r)`)
//! - Request fields read by a handler (params, query, body, headers)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Source File     │────▶│ analyze_file │────▶│ FileAnalysis  │
//! └─────────────────┘     │ (Collector)  │     │ (routes, mounts,
//!                         └──────────────┘     │  imports, tree)│
//!                                              └───────────────┘
//!                                                      │
//!                                                      ▼
//!                         ┌──────────────┐     ┌───────────────┐
//!                         │ HandlerFacts │◀────│ infer_handler │
//!                         └──────────────┘     └───────────────┘
//! ```
//!
//! Handler inference runs only after the whole project has been walked, so a
//! route can use a handler defined in a file analyzed later.

mod facts;
mod file;
mod handler;
mod resolve;
mod routes;

pub use facts::{
    FileAnalysis, HandlerArg, ImportBinding, ImportDescriptor, ImportedName, RouteMountDescriptor,
    RouteRecord, Span, ValueRef, VariableValue,
};
pub use file::{analyze_file, analyze_source};
pub use handler::{infer_handler, HandlerFacts};
pub use resolve::ImportResolver;
pub use routes::{mount_from_call, route_from_call};
