//! Literal and pattern helpers shared by the analyzers.

use tree_sitter::Node;

use super::SyntaxKind;

/// Stands in for every `${...}` substitution of a template URL.
pub const TEMPLATE_PLACEHOLDER: &str = "${...}";

pub fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Contents of a quoted string literal, without the quotes.
pub fn string_value(node: Node, source: &str) -> Option<String> {
    if SyntaxKind::of(&node) != SyntaxKind::String {
        return None;
    }
    let text = node_text(node, source);
    if text.len() < 2 {
        return None;
    }
    text.get(1..text.len() - 1).map(str::to_string)
}

/// Render a template literal, replacing each substitution with
/// [`TEMPLATE_PLACEHOLDER`].
pub fn template_value(node: Node, source: &str) -> Option<String> {
    if SyntaxKind::of(&node) != SyntaxKind::TemplateString {
        return None;
    }
    let start = node.start_byte() + 1;
    let end = node.end_byte().saturating_sub(1);
    if end < start {
        return None;
    }

    let mut rendered = String::new();
    let mut cursor_at = start;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if SyntaxKind::of(&child) == SyntaxKind::TemplateSubstitution {
            rendered.push_str(source.get(cursor_at..child.start_byte())?);
            rendered.push_str(TEMPLATE_PLACEHOLDER);
            cursor_at = child.end_byte();
        }
    }
    rendered.push_str(source.get(cursor_at..end)?);
    Some(rendered)
}

/// A string or template literal's value.
pub fn literal_value(node: Node, source: &str) -> Option<String> {
    string_value(node, source).or_else(|| template_value(node, source))
}

/// Strip parentheses and type-only wrappers (`as`, `!`, `satisfies`).
pub fn unwrap_expression(node: Node) -> Node {
    let mut current = node;
    while SyntaxKind::of(&current).is_transparent() {
        match current.named_child(0) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

/// The first non-comment named child.
pub fn first_named(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| SyntaxKind::of(c) != SyntaxKind::Comment);
    found
}

/// Named children excluding comments.
pub fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| SyntaxKind::of(c) != SyntaxKind::Comment)
        .collect()
}

/// One binding introduced by an object destructuring pattern.
#[derive(Debug, Clone)]
pub struct PatternEntry<'tree> {
    /// Property read from the source object.
    pub key: String,
    /// Local name it is bound to.
    pub local: String,
    /// Default value expression, if any.
    pub default: Option<Node<'tree>>,
}

/// Flatten the top level of an `object_pattern`.
///
/// Rest elements and nested patterns bind no single property and are skipped.
pub fn pattern_entries<'tree>(pattern: Node<'tree>, source: &str) -> Vec<PatternEntry<'tree>> {
    let mut entries = Vec::new();
    for prop in named_children(pattern) {
        match SyntaxKind::of(&prop) {
            SyntaxKind::ShorthandPropertyIdentifierPattern => {
                let name = node_text(prop, source).to_string();
                entries.push(PatternEntry {
                    key: name.clone(),
                    local: name,
                    default: None,
                });
            }
            SyntaxKind::ObjectAssignmentPattern => {
                let Some(left) = prop.child_by_field_name("left") else {
                    continue;
                };
                if SyntaxKind::of(&left) != SyntaxKind::ShorthandPropertyIdentifierPattern {
                    continue;
                }
                let name = node_text(left, source).to_string();
                entries.push(PatternEntry {
                    key: name.clone(),
                    local: name,
                    default: prop.child_by_field_name("right"),
                });
            }
            SyntaxKind::PairPattern => {
                let (Some(key), Some(value)) = (
                    prop.child_by_field_name("key"),
                    prop.child_by_field_name("value"),
                ) else {
                    continue;
                };
                let key = match SyntaxKind::of(&key) {
                    SyntaxKind::String => match string_value(key, source) {
                        Some(k) => k,
                        None => continue,
                    },
                    SyntaxKind::PropertyIdentifier => node_text(key, source).to_string(),
                    _ => continue,
                };
                let (local, default) = match SyntaxKind::of(&value) {
                    SyntaxKind::Identifier => (node_text(value, source).to_string(), None),
                    SyntaxKind::AssignmentPattern => {
                        match value.child_by_field_name("left") {
                            Some(left) if SyntaxKind::of(&left) == SyntaxKind::Identifier => (
                                node_text(left, source).to_string(),
                                value.child_by_field_name("right"),
                            ),
                            _ => continue,
                        }
                    }
                    _ => continue,
                };
                entries.push(PatternEntry {
                    key,
                    local,
                    default,
                });
            }
            _ => {}
        }
    }
    entries
}
