//! Per-file facts extracted from a parsed source.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tree_sitter::Node;

use crate::endpoint::EndpointDescriptor;
use crate::parser::{ParsedFile, SyntaxKind};

/// Source span of a node, stable across the lifetime of its `ParsedFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: Node) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: node.start_position().row + 1,
        }
    }

    /// Find the function node this span was taken from.
    pub fn locate_function<'t>(&self, parsed: &'t ParsedFile) -> Option<Node<'t>> {
        let mut node = parsed
            .root()
            .descendant_for_byte_range(self.start_byte, self.end_byte)?;
        loop {
            if SyntaxKind::of(&node).is_function()
                && node.start_byte() == self.start_byte
                && node.end_byte() == self.end_byte
            {
                return Some(node);
            }
            if node.start_byte() < self.start_byte || node.end_byte() > self.end_byte {
                return None;
            }
            node = node.parent()?;
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.start_line)
    }
}

/// A name brought in by an import, as `local` in this file and `exported` in
/// the target module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub local: String,
    pub exported: String,
}

/// One `import ... from` statement or `require(...)` binding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportDescriptor {
    /// The module specifier as written.
    pub source: String,
    pub imported_names: Vec<ImportedName>,
    pub default_import_name: Option<String>,
    pub namespace_import_name: Option<String>,
    /// Canonical project file the specifier resolved to, if any.
    pub resolved_path: Option<PathBuf>,
}

/// How a local name is bound by an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportBinding<'a> {
    Named(&'a str),
    Default,
    Namespace,
}

impl ImportDescriptor {
    pub fn binding_for(&self, local: &str) -> Option<ImportBinding<'_>> {
        if self.default_import_name.as_deref() == Some(local) {
            return Some(ImportBinding::Default);
        }
        if self.namespace_import_name.as_deref() == Some(local) {
            return Some(ImportBinding::Namespace);
        }
        self.imported_names
            .iter()
            .find(|n| n.local == local)
            .map(|n| ImportBinding::Named(n.exported.as_str()))
    }
}

/// A `x.use('/prefix', router)` registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMountDescriptor {
    pub prefix: String,
    pub router_binding_name: String,
    /// Canonical file defining the mounted router, if resolvable.
    pub resolved_router_file_path: Option<PathBuf>,
}

/// A route registration argument after the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerArg {
    /// An inline function, or the function wrapped by a call such as
    /// `asyncHandler(async (req, res) => ...)`.
    Inline(Span),
    Identifier(String),
    /// `object.property`, e.g. `controller.create`.
    Member { object: String, property: String },
    Other,
}

/// A route found in this file, before handler inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub endpoint: EndpointDescriptor,
    /// Registration arguments after the URL, in source order.
    pub handler_args: Vec<HandlerArg>,
    pub span: Span,
}

/// What an exported name or object property refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueRef {
    Function(Span),
    /// A local name to be looked up among this file's functions.
    Local(String),
}

/// What a declared variable was initialized with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    Function(Span),
    /// `require('specifier')`.
    Require(String),
    /// An object literal, by property.
    Object(HashMap<String, ValueRef>),
    Other,
}

/// Everything learned about one source file.
#[derive(Debug)]
pub struct FileAnalysis {
    pub file_path: PathBuf,
    /// The parse tree, kept for handler inference. `None` when the file
    /// could not be read or parsed.
    pub parsed: Option<ParsedFile>,
    pub imports: Vec<ImportDescriptor>,
    pub exported_names: Vec<String>,
    pub export_bindings: HashMap<String, ValueRef>,
    pub default_export: Option<ValueRef>,
    pub local_functions: HashMap<String, Span>,
    pub local_variables: HashMap<String, VariableValue>,
    pub routes: Vec<RouteRecord>,
    pub route_mounts: Vec<RouteMountDescriptor>,
}

impl FileAnalysis {
    /// The record stored for files that could not be analyzed.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
            parsed: None,
            imports: Vec::new(),
            exported_names: Vec::new(),
            export_bindings: HashMap::new(),
            default_export: None,
            local_functions: HashMap::new(),
            local_variables: HashMap::new(),
            routes: Vec::new(),
            route_mounts: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Project files this file imports, in import order.
    pub fn resolved_imports(&self) -> impl Iterator<Item = &Path> {
        self.imports
            .iter()
            .filter_map(|i| i.resolved_path.as_deref())
    }

    /// The import that binds `local`, with how it binds it.
    pub fn import_for(&self, local: &str) -> Option<(&ImportDescriptor, ImportBinding<'_>)> {
        self.imports
            .iter()
            .find_map(|i| i.binding_for(local).map(|b| (i, b)))
    }

    /// Function exported as `name` (`exports.name = ...`, `export function name`,
    /// `export { name }`).
    pub fn find_exported_function(&self, name: &str) -> Option<Span> {
        if name == "default" {
            return self.default_export_function();
        }
        self.resolve_binding(self.export_bindings.get(name)?)
    }

    /// Function assigned to `module.exports` or exported as default.
    pub fn default_export_function(&self) -> Option<Span> {
        self.resolve_binding(self.default_export.as_ref()?)
    }

    /// Function stored as `property` on the object exported as `export`
    /// (`"default"` for the default export).
    ///
    /// Covers `module.exports = { create }`, `export default { create }` and
    /// exporting a local object such as `const controller = { create() {} }`.
    pub fn find_object_member_function(&self, export: &str, property: &str) -> Option<Span> {
        let exported = if export == "default" {
            self.default_export.as_ref()
        } else {
            self.export_bindings.get(export)
        };
        match exported {
            Some(ValueRef::Local(name)) => self.local_object_member(name, property),
            Some(ValueRef::Function(_)) => None,
            None if export == "default" => self.find_exported_function(property),
            None => None,
        }
    }

    /// Function stored as `property` on a local object literal.
    pub fn local_object_member(&self, object: &str, property: &str) -> Option<Span> {
        match self.local_variables.get(object)? {
            VariableValue::Object(members) => self.resolve_binding(members.get(property)?),
            _ => None,
        }
    }

    fn resolve_binding(&self, binding: &ValueRef) -> Option<Span> {
        match binding {
            ValueRef::Function(span) => Some(*span),
            ValueRef::Local(name) => self.local_functions.get(name).copied(),
        }
    }
}
