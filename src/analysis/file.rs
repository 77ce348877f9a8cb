//! Single-file analysis: imports, exports, functions, routes and mounts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tree_sitter::Node;

use super::facts::{
    FileAnalysis, ImportDescriptor, ImportedName, RouteMountDescriptor, Span, ValueRef,
    VariableValue,
};
use super::resolve::ImportResolver;
use super::routes::{mount_from_call, route_from_call, wrapped_function};
use crate::error::{DiscoveryError, Result};
use crate::parser::text::{
    first_named, named_children, node_text, pattern_entries, string_value, unwrap_expression,
};
use crate::parser::{parse_source, walk, SyntaxKind, Visitor, Walk};

/// Read, parse and analyze one file.
pub fn analyze_file(path: &Path, resolver: &ImportResolver) -> Result<FileAnalysis> {
    let source = fs::read_to_string(path).map_err(|e| DiscoveryError::io(path, e))?;
    analyze_source(path, source, resolver)
}

/// Analyze already-loaded source text for `path`.
///
/// Import specifiers and mounted routers are resolved through `resolver`.
pub fn analyze_source(path: &Path, source: String, resolver: &ImportResolver) -> Result<FileAnalysis> {
    let parsed = parse_source(path, source)?;

    let (mut analysis, mounts) = {
        let mut collector = Collector::new(path, &parsed.source);
        walk(parsed.root(), &mut collector);
        (collector.analysis, collector.mounts)
    };

    for import in &mut analysis.imports {
        import.resolved_path = resolver.resolve(&import.source, path);
    }

    for (prefix, binding) in mounts {
        let resolved = match analysis.import_for(&binding) {
            Some((import, _)) => import.resolved_path.clone(),
            None => match analysis.local_variables.get(&binding) {
                Some(VariableValue::Require(specifier)) => resolver.resolve(specifier, path),
                _ => None,
            },
        };
        analysis.route_mounts.push(RouteMountDescriptor {
            prefix,
            router_binding_name: binding,
            resolved_router_file_path: resolved,
        });
    }

    analysis.parsed = Some(parsed);
    Ok(analysis)
}

struct Collector<'s> {
    source: &'s str,
    analysis: FileAnalysis,
    mounts: Vec<(String, String)>,
}

impl<'s> Collector<'s> {
    fn new(path: &Path, source: &'s str) -> Self {
        Self {
            source,
            analysis: FileAnalysis::empty(path),
            mounts: Vec::new(),
        }
    }

    fn text(&self, node: Node) -> String {
        node_text(node, self.source).to_string()
    }

    /// Top-level declarations replace nested ones of the same name; nested
    /// ones only fill gaps.
    fn add_function(&mut self, name: String, span: Span, top_level: bool) {
        if top_level {
            self.analysis.local_functions.insert(name, span);
        } else {
            self.analysis.local_functions.entry(name).or_insert(span);
        }
    }

    fn add_export(&mut self, name: String, value: Option<ValueRef>) {
        if !self.analysis.exported_names.contains(&name) {
            self.analysis.exported_names.push(name.clone());
        }
        if let Some(value) = value {
            self.analysis.export_bindings.insert(name, value);
        }
    }

    fn import_statement(&mut self, node: Node) {
        let Some(specifier) = node
            .child_by_field_name("source")
            .and_then(|s| string_value(s, self.source))
        else {
            return;
        };
        let mut import = ImportDescriptor {
            source: specifier,
            ..Default::default()
        };

        let clause = named_children(node)
            .into_iter()
            .find(|c| SyntaxKind::of(c) == SyntaxKind::ImportClause);
        if let Some(clause) = clause {
            for part in named_children(clause) {
                match SyntaxKind::of(&part) {
                    SyntaxKind::Identifier => import.default_import_name = Some(self.text(part)),
                    SyntaxKind::NamespaceImport => {
                        import.namespace_import_name = first_named(part).map(|n| self.text(n));
                    }
                    SyntaxKind::NamedImports => {
                        for spec in named_children(part) {
                            if SyntaxKind::of(&spec) != SyntaxKind::ImportSpecifier {
                                continue;
                            }
                            let Some(name) = spec.child_by_field_name("name") else {
                                continue;
                            };
                            let exported = string_value(name, self.source)
                                .unwrap_or_else(|| self.text(name));
                            let local = spec
                                .child_by_field_name("alias")
                                .map(|a| self.text(a))
                                .unwrap_or_else(|| exported.clone());
                            import.imported_names.push(ImportedName { local, exported });
                        }
                    }
                    _ => {}
                }
            }
        }

        self.analysis.imports.push(import);
    }

    /// `require('./setup');` evaluated for its side effects.
    fn bare_require(&mut self, node: Node) {
        let Some(expression) = first_named(node).map(unwrap_expression) else {
            return;
        };
        if SyntaxKind::of(&expression) != SyntaxKind::CallExpression {
            return;
        }
        if let Some((specifier, None)) = require_call(expression, self.source) {
            self.analysis.imports.push(ImportDescriptor {
                source: specifier,
                ..Default::default()
            });
        }
    }

    fn variable_declarator(&mut self, node: Node) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let Some(value) = node.child_by_field_name("value").map(unwrap_expression) else {
            return;
        };

        if let Some((specifier, member)) = require_call(value, self.source) {
            let mut import = ImportDescriptor {
                source: specifier.clone(),
                ..Default::default()
            };
            match SyntaxKind::of(&name) {
                SyntaxKind::Identifier => {
                    let local = self.text(name);
                    match member {
                        Some(exported) if exported != "default" => {
                            import.imported_names.push(ImportedName {
                                local: local.clone(),
                                exported,
                            });
                        }
                        _ => import.default_import_name = Some(local.clone()),
                    }
                    self.analysis
                        .local_variables
                        .insert(local, VariableValue::Require(specifier));
                }
                SyntaxKind::ObjectPattern if member.is_none() => {
                    for entry in pattern_entries(name, self.source) {
                        import.imported_names.push(ImportedName {
                            local: entry.local,
                            exported: entry.key,
                        });
                    }
                }
                _ => {}
            }
            self.analysis.imports.push(import);
            return;
        }

        if SyntaxKind::of(&name) != SyntaxKind::Identifier {
            return;
        }
        let name = self.text(name);
        let variable = match self.value_ref(value) {
            Some(ValueRef::Function(span)) => {
                self.add_function(name.clone(), span, is_top_level(node));
                VariableValue::Function(span)
            }
            _ if SyntaxKind::of(&value) == SyntaxKind::Object => {
                VariableValue::Object(self.object_members(value))
            }
            _ => VariableValue::Other,
        };
        self.analysis.local_variables.insert(name, variable);
    }

    /// `export ...` in all of its ES module forms.
    fn export_statement(&mut self, node: Node) {
        let is_default = {
            let mut cursor = node.walk();
            let found = node.children(&mut cursor).any(|c| c.kind() == "default");
            found
        };

        if is_default {
            if !self.analysis.exported_names.iter().any(|n| n == "default") {
                self.analysis.exported_names.push("default".to_string());
            }
            let target = node
                .child_by_field_name("declaration")
                .or_else(|| node.child_by_field_name("value"))
                .map(unwrap_expression);
            if let Some(target) = target {
                if SyntaxKind::of(&target) == SyntaxKind::Object {
                    for (key, value) in self.object_members(target) {
                        self.add_export(key, Some(value));
                    }
                } else {
                    self.analysis.default_export = self.value_ref(target);
                }
            }
            return;
        }

        if let Some(declaration) = node.child_by_field_name("declaration") {
            match SyntaxKind::of(&declaration) {
                SyntaxKind::FunctionDeclaration | SyntaxKind::GeneratorFunctionDeclaration => {
                    if let Some(name) = declaration.child_by_field_name("name") {
                        let name = self.text(name);
                        self.add_export(name, Some(ValueRef::Function(Span::from_node(declaration))));
                    }
                }
                SyntaxKind::LexicalDeclaration | SyntaxKind::VariableDeclaration => {
                    for declarator in named_children(declaration) {
                        let Some(name) = declarator.child_by_field_name("name") else {
                            continue;
                        };
                        if SyntaxKind::of(&name) == SyntaxKind::Identifier {
                            let name = self.text(name);
                            self.add_export(name.clone(), Some(ValueRef::Local(name)));
                        }
                    }
                }
                _ => {}
            }
            return;
        }

        let reexport = node.child_by_field_name("source").is_some();
        let clause = named_children(node)
            .into_iter()
            .find(|c| SyntaxKind::of(c) == SyntaxKind::ExportClause);
        let Some(clause) = clause else {
            return;
        };
        for spec in named_children(clause) {
            let Some(name) = spec.child_by_field_name("name") else {
                continue;
            };
            let local = self.text(name);
            let exported = spec
                .child_by_field_name("alias")
                .map(|a| self.text(a))
                .unwrap_or_else(|| local.clone());
            let value = (!reexport).then(|| ValueRef::Local(local));
            self.add_export(exported, value);
        }
    }

    /// CommonJS exports: `module.exports = ...`, `exports.x = ...` and
    /// `module.exports.x = ...`.
    fn assignment(&mut self, node: Node) {
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return;
        };
        let right = unwrap_expression(right);
        if SyntaxKind::of(&left) != SyntaxKind::MemberExpression {
            return;
        }

        if is_module_exports(left, self.source) {
            if !self.analysis.exported_names.iter().any(|n| n == "default") {
                self.analysis.exported_names.push("default".to_string());
            }
            if SyntaxKind::of(&right) == SyntaxKind::Object {
                self.analysis.default_export = None;
                for (key, value) in self.object_members(right) {
                    self.add_export(key, Some(value));
                }
            } else {
                self.analysis.default_export = self.value_ref(right);
            }
            return;
        }

        let (Some(object), Some(property)) = (
            left.child_by_field_name("object"),
            left.child_by_field_name("property"),
        ) else {
            return;
        };
        let exports_object = match SyntaxKind::of(&object) {
            SyntaxKind::Identifier => node_text(object, self.source) == "exports",
            SyntaxKind::MemberExpression => is_module_exports(object, self.source),
            _ => false,
        };
        if exports_object && SyntaxKind::of(&property) == SyntaxKind::PropertyIdentifier {
            let name = self.text(property);
            let value = self.value_ref(right);
            self.add_export(name, value);
        }
    }

    /// A function, wrapped function or identifier reference.
    fn value_ref(&self, value: Node) -> Option<ValueRef> {
        let value = unwrap_expression(value);
        let kind = SyntaxKind::of(&value);
        if kind.is_function() {
            return Some(ValueRef::Function(Span::from_node(value)));
        }
        match kind {
            SyntaxKind::Identifier => Some(ValueRef::Local(self.text(value))),
            SyntaxKind::CallExpression => {
                wrapped_function(value).map(|f| ValueRef::Function(Span::from_node(f)))
            }
            _ => None,
        }
    }

    fn object_members(&self, object: Node) -> HashMap<String, ValueRef> {
        let mut members = HashMap::new();
        for member in named_children(object) {
            match SyntaxKind::of(&member) {
                SyntaxKind::Pair => {
                    let (Some(key), Some(value)) = (
                        member.child_by_field_name("key"),
                        member.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    let key = match SyntaxKind::of(&key) {
                        SyntaxKind::PropertyIdentifier => self.text(key),
                        SyntaxKind::String => match string_value(key, self.source) {
                            Some(k) => k,
                            None => continue,
                        },
                        _ => continue,
                    };
                    if let Some(value) = self.value_ref(value) {
                        members.insert(key, value);
                    }
                }
                SyntaxKind::ShorthandPropertyIdentifier => {
                    let name = self.text(member);
                    members.insert(name.clone(), ValueRef::Local(name));
                }
                SyntaxKind::MethodDefinition => {
                    if let Some(name) = member.child_by_field_name("name") {
                        members.insert(self.text(name), ValueRef::Function(Span::from_node(member)));
                    }
                }
                _ => {}
            }
        }
        members
    }
}

impl<'tree, 's> Visitor<'tree> for Collector<'s> {
    fn enter(&mut self, node: Node<'tree>, kind: SyntaxKind) -> Walk {
        match kind {
            SyntaxKind::ImportStatement => {
                self.import_statement(node);
                return Walk::SkipChildren;
            }
            SyntaxKind::VariableDeclarator => self.variable_declarator(node),
            SyntaxKind::FunctionDeclaration | SyntaxKind::GeneratorFunctionDeclaration => {
                if let Some(name) = node.child_by_field_name("name") {
                    let name = self.text(name);
                    self.add_function(name, Span::from_node(node), is_top_level(node));
                }
            }
            SyntaxKind::ExportStatement => self.export_statement(node),
            SyntaxKind::AssignmentExpression => self.assignment(node),
            SyntaxKind::ExpressionStatement => self.bare_require(node),
            SyntaxKind::CallExpression => {
                if let Some(route) = route_from_call(node, self.source) {
                    self.analysis.routes.push(route);
                } else if let Some(mount) = mount_from_call(node, self.source) {
                    self.mounts.push(mount);
                }
            }
            _ => {}
        }
        Walk::Continue
    }
}

/// `require('x')` or `require('x').member`.
fn require_call(node: Node, source: &str) -> Option<(String, Option<String>)> {
    let (call, member) = match SyntaxKind::of(&node) {
        SyntaxKind::CallExpression => (node, None),
        SyntaxKind::MemberExpression => {
            let object = unwrap_expression(node.child_by_field_name("object")?);
            let property = node.child_by_field_name("property")?;
            (object, Some(node_text(property, source).to_string()))
        }
        _ => return None,
    };
    if SyntaxKind::of(&call) != SyntaxKind::CallExpression {
        return None;
    }
    let callee = call.child_by_field_name("function")?;
    if SyntaxKind::of(&callee) != SyntaxKind::Identifier || node_text(callee, source) != "require" {
        return None;
    }
    let args = named_children(call.child_by_field_name("arguments")?);
    let specifier = string_value(*args.first()?, source)?;
    Some((specifier, member))
}

fn is_module_exports(node: Node, source: &str) -> bool {
    let (Some(object), Some(property)) = (
        node.child_by_field_name("object"),
        node.child_by_field_name("property"),
    ) else {
        return false;
    };
    SyntaxKind::of(&node) == SyntaxKind::MemberExpression
        && node_text(object, source) == "module"
        && node_text(property, source) == "exports"
}

/// Declared directly in the program body, optionally behind `export`.
fn is_top_level(node: Node) -> bool {
    let mut parent = node.parent();
    if SyntaxKind::of(&node) == SyntaxKind::VariableDeclarator {
        parent = parent.and_then(|p| p.parent());
    }
    match parent.map(|p| (SyntaxKind::of(&p), p)) {
        Some((SyntaxKind::Program, _)) => true,
        Some((SyntaxKind::ExportStatement, p)) => {
            p.parent().map(|g| SyntaxKind::of(&g)) == Some(SyntaxKind::Program)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::facts::{HandlerArg, ImportBinding};
    use tempfile::TempDir;

    fn analyze(name: &str, source: &str) -> FileAnalysis {
        let resolver = ImportResolver::new("/nonexistent");
        analyze_source(Path::new(name), source.to_string(), &resolver).unwrap()
    }

    #[test]
    fn test_es_imports() {
        let analysis = analyze(
            "a.ts",
            "import express, { Router as R, json } from 'express';\nimport * as ctrl from './ctrl';\nimport './side-effect';\n",
        );
        assert_eq!(analysis.imports.len(), 3);
        let first = &analysis.imports[0];
        assert_eq!(first.source, "express");
        assert_eq!(first.default_import_name.as_deref(), Some("express"));
        assert_eq!(first.binding_for("R"), Some(ImportBinding::Named("Router")));
        assert_eq!(first.binding_for("json"), Some(ImportBinding::Named("json")));
        assert_eq!(
            analysis.imports[1].namespace_import_name.as_deref(),
            Some("ctrl")
        );
        assert!(analysis.imports[2].imported_names.is_empty());
    }

    #[test]
    fn test_bare_require_is_import() {
        let analysis = analyze("a.js", "require('./db');\nrequire('./routes')(app);\n");
        assert_eq!(analysis.imports.len(), 1);
        assert_eq!(analysis.imports[0].source, "./db");
    }

    #[test]
    fn test_require_bindings() {
        let analysis = analyze(
            "a.js",
            "const users = require('./routes/users');\nconst { create, remove: del } = require('./ctrl');\nconst helper = require('./util').helper;\n",
        );
        assert_eq!(analysis.imports.len(), 3);
        assert_eq!(
            analysis.import_for("users").map(|(i, b)| (i.source.as_str(), b)),
            Some(("./routes/users", ImportBinding::Default))
        );
        assert_eq!(
            analysis.import_for("del").map(|(_, b)| b),
            Some(ImportBinding::Named("remove"))
        );
        assert_eq!(
            analysis.import_for("helper").map(|(_, b)| b),
            Some(ImportBinding::Named("helper"))
        );
        assert_eq!(
            analysis.local_variables.get("users"),
            Some(&VariableValue::Require("./routes/users".to_string()))
        );
    }

    #[test]
    fn test_commonjs_exports() {
        let analysis = analyze(
            "c.js",
            "function create(req, res) {}\nexports.list = (req, res) => {};\nmodule.exports.create = create;\n",
        );
        assert!(analysis.find_exported_function("list").is_some());
        assert_eq!(
            analysis.find_exported_function("create"),
            analysis.local_functions.get("create").copied()
        );
        assert!(analysis.exported_names.contains(&"list".to_string()));
    }

    #[test]
    fn test_module_exports_object_and_function() {
        let analysis = analyze(
            "c.js",
            "const update = async (req, res) => {};\nmodule.exports = { update, remove(req, res) {}, 'show': function (req, res) {} };\n",
        );
        assert!(analysis.find_exported_function("update").is_some());
        assert!(analysis.find_exported_function("remove").is_some());
        assert!(analysis.find_exported_function("show").is_some());
        assert!(analysis.find_object_member_function("default", "update").is_some());

        let analysis = analyze("h.js", "module.exports = function (req, res) {};\n");
        assert!(analysis.default_export_function().is_some());
        assert!(analysis.exported_names.contains(&"default".to_string()));
    }

    #[test]
    fn test_es_exports() {
        let analysis = analyze(
            "c.ts",
            "export function a(req, res) {}\nexport const b = (req, res) => {};\nconst c = function (req, res) {};\nexport { c as see };\nexport default b;\n",
        );
        assert!(analysis.find_exported_function("a").is_some());
        assert!(analysis.find_exported_function("b").is_some());
        assert!(analysis.find_exported_function("see").is_some());
        assert!(analysis.find_exported_function("c").is_none());
        assert_eq!(
            analysis.default_export_function(),
            analysis.find_exported_function("b")
        );
    }

    #[test]
    fn test_exported_controller_object() {
        let analysis = analyze(
            "c.js",
            "const controller = { create: asyncHandler(async (req, res) => {}), list(req, res) {} };\nexport default controller;\n",
        );
        assert!(analysis.find_object_member_function("default", "create").is_some());
        assert!(analysis.find_object_member_function("default", "list").is_some());
        assert!(analysis.find_object_member_function("default", "missing").is_none());
    }

    #[test]
    fn test_top_level_function_wins() {
        let analysis = analyze(
            "f.js",
            "function outer() { function handler() { return 1; } }\nfunction handler(req, res) {}\n",
        );
        let span = analysis.local_functions["handler"];
        assert_eq!(span.start_line, 2);
    }

    #[test]
    fn test_routes_and_mount_resolution() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("routes")).unwrap();
        fs::write(dir.path().join("routes/users.js"), "").unwrap();
        let root = dir.path().canonicalize().unwrap();
        let server = root.join("server.js");
        fs::write(
            &server,
            "const express = require('express');\nconst users = require('./routes/users');\nconst app = express();\napp.use(express.json());\napp.use('/api/users', users);\napp.use('/ghost', ghost);\napp.get('/health', (req, res) => res.send('ok'));\n",
        )
        .unwrap();

        let analysis = analyze_file(&server, &ImportResolver::new(&root)).unwrap();
        assert_eq!(analysis.routes.len(), 1);
        assert_eq!(analysis.routes[0].endpoint.url, "/health");
        assert!(matches!(analysis.routes[0].handler_args[0], HandlerArg::Inline(_)));

        assert_eq!(analysis.route_mounts.len(), 2);
        assert_eq!(analysis.route_mounts[0].prefix, "/api/users");
        assert_eq!(
            analysis.route_mounts[0].resolved_router_file_path,
            Some(root.join("routes/users.js"))
        );
        assert_eq!(analysis.route_mounts[1].resolved_router_file_path, None);
        assert_eq!(analysis.resolved_imports().count(), 1);
        assert!(analysis.parsed.is_some());
    }

    #[test]
    fn test_parse_failure_is_error() {
        let resolver = ImportResolver::new("/nonexistent");
        let result = analyze_source(Path::new("x.js"), "router.get('/x', (".to_string(), &resolver);
        assert!(matches!(result, Err(DiscoveryError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let resolver = ImportResolver::new("/nonexistent");
        let result = analyze_file(Path::new("/nonexistent/none.js"), &resolver);
        assert!(matches!(result, Err(DiscoveryError::Io { .. })));
    }
}
