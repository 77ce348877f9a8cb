//! Routescout - static HTTP endpoint discovery.
//!
//! Routescout finds the HTTP endpoints of an Express-style JavaScript or
//! TypeScript backend without running it. It locates the entry file, follows
//! local imports, collects every `app.get(...)`/`router.post(...)` style
//! registration and every `app.use('/prefix', router)` mount, then reads each
//! handler body to infer which path, query, body and header fields it uses.
//!
//! # Architecture
//!
//! - `parser`: tree-sitter parsing and syntax helpers
//! - `analysis`: per-file facts (imports, exports, routes, mounts) and
//!   handler inference
//! - `discovery`: entry location, project walk, route composition
//! - `endpoint`: the emitted endpoint catalogue types
//! - `config`: optional `routescout.yaml` scan settings
//! - `report`: output formatting (pretty, JSON)
//!
//! # Example
//!
//! ```no_run
//! let endpoints = routescout::discover_endpoints("./my-api")?;
//! for endpoint in &endpoints {
//!     println!("{} {}", endpoint.method, endpoint.url);
//! }
//! # Ok::<(), routescout::DiscoveryError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod parser;
pub mod report;

pub use config::ScanConfig;
pub use discovery::{
    discover_endpoints, Diagnostic, DiagnosticKind, ScanGenerations, ScanOutcome, ScanTicket,
    Scanner,
};
pub use endpoint::{EndpointDescriptor, FieldType, HttpMethod, ParamType, RequestDataType};
pub use error::{DiscoveryError, Result};
