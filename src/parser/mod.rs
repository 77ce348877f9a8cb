//! Tree-sitter front end for JavaScript and TypeScript sources.
//!
//! This module provides:
//! - `SourceLanguage`: grammar selection by file extension
//! - `ParsedFile`: an owned tree plus the source text it was built from
//! - `SyntaxKind`: the closed set of node kinds the analyzers dispatch on
//! - `walk`: an iterative pre-order traversal over any subtree

use std::path::{Path, PathBuf};

use tree_sitter::{Language, Node, Parser, Point, Tree};

use crate::error::{DiscoveryError, Result};

pub mod kind;
pub mod text;
pub mod visit;

pub use kind::SyntaxKind;
pub use visit::{walk, Visitor, Walk};

/// File extensions treated as analyzable sources, in import resolution order.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "ts", "mjs", "cjs", "jsx", "tsx", "mts", "cts"];

/// Grammar used for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    JavaScript,
    TypeScript,
    Tsx,
}

impl SourceLanguage {
    /// Pick the grammar for an extension (without dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" | "cjs" | "jsx" => Some(SourceLanguage::JavaScript),
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    fn grammar(&self) -> Language {
        match self {
            SourceLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Returns true when the path has one of [`SOURCE_EXTENSIONS`].
pub fn is_source_file(path: &Path) -> bool {
    SourceLanguage::from_path(path).is_some()
}

/// Holds a parsed tree-sitter tree and the text it was parsed from.
///
/// Kept alive for the whole scan so handler inference can revisit function
/// bodies after every file has been analyzed.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: Tree,
    /// Source text the tree was parsed from.
    pub source: String,
    /// The file path (for diagnostics).
    pub path: PathBuf,
    pub language: SourceLanguage,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

impl std::fmt::Debug for ParsedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFile")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("bytes", &self.source.len())
            .finish()
    }
}

/// Parse `source` with the grammar chosen from `path`'s extension.
///
/// A tree containing error or missing nodes counts as a failed parse: the
/// analyzers only ever see complete trees.
pub fn parse_source(path: &Path, source: String) -> Result<ParsedFile> {
    let language = SourceLanguage::from_path(path).ok_or_else(|| DiscoveryError::Parse {
        path: path.to_path_buf(),
        message: "unsupported file extension".to_string(),
    })?;

    let mut parser = Parser::new();
    parser
        .set_language(&language.grammar())
        .map_err(|e| DiscoveryError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| DiscoveryError::Parse {
            path: path.to_path_buf(),
            message: "parser produced no tree".to_string(),
        })?;

    if tree.root_node().has_error() {
        let at = first_error_position(tree.root_node());
        return Err(DiscoveryError::Parse {
            path: path.to_path_buf(),
            message: format!("syntax error at line {}, column {}", at.row + 1, at.column + 1),
        });
    }

    Ok(ParsedFile {
        tree,
        source,
        path: path.to_path_buf(),
        language,
    })
}

/// Descend along children that contain errors until the offending node.
fn first_error_position(root: Node) -> Point {
    let mut node = root;
    loop {
        if node.is_error() || node.is_missing() {
            return node.start_position();
        }
        let next = {
            let mut cursor = node.walk();
            let found = node
                .children(&mut cursor)
                .find(|c| c.has_error() || c.is_missing());
            found
        };
        match next {
            Some(child) => node = child,
            None => return node.start_position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_by_extension() {
        assert_eq!(
            SourceLanguage::from_path(Path::new("a/server.cjs")),
            Some(SourceLanguage::JavaScript)
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("routes.mts")),
            Some(SourceLanguage::TypeScript)
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("View.tsx")),
            Some(SourceLanguage::Tsx)
        );
        assert_eq!(SourceLanguage::from_path(Path::new("main.py")), None);
        assert!(!is_source_file(Path::new("package.json")));
    }

    #[test]
    fn test_parse_javascript() {
        let parsed = parse_source(
            Path::new("app.js"),
            "const app = require('express')();\napp.get('/', (req, res) => res.send('ok'));\n"
                .to_string(),
        )
        .unwrap();
        assert_eq!(parsed.root().kind(), "program");
        assert_eq!(parsed.language, SourceLanguage::JavaScript);
    }

    #[test]
    fn test_parse_typescript_annotations() {
        let parsed = parse_source(
            Path::new("app.ts"),
            "import { Request, Response } from 'express';\nexport const h = (req: Request, res: Response): void => { res.json(req.body as any); };\n"
                .to_string(),
        );
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_syntax_error_rejected() {
        let err = parse_source(Path::new("broken.js"), "app.get('/x', (req, res => {\n".to_string())
            .unwrap_err();
        match err {
            DiscoveryError::Parse { message, .. } => assert!(message.contains("syntax error")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(parse_source(Path::new("notes.md"), "# hi".to_string()).is_err());
    }
}
