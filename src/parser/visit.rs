//! Iterative pre-order traversal.
//!
//! Deeply nested sources (long promise chains, generated bundles) must not
//! overflow the stack, so the walk drives a `TreeCursor` instead of recursing.

use tree_sitter::Node;

use super::SyntaxKind;

/// What the walk does after a node has been entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
}

/// Callback invoked once per node, parents before children.
pub trait Visitor<'tree> {
    fn enter(&mut self, node: Node<'tree>, kind: SyntaxKind) -> Walk;
}

impl<'tree, F> Visitor<'tree> for F
where
    F: FnMut(Node<'tree>, SyntaxKind) -> Walk,
{
    fn enter(&mut self, node: Node<'tree>, kind: SyntaxKind) -> Walk {
        self(node, kind)
    }
}

/// Visit `root` and all of its descendants in source order.
///
/// `root` may be any node; the cursor never leaves its subtree.
pub fn walk<'tree, V>(root: Node<'tree>, visitor: &mut V)
where
    V: Visitor<'tree> + ?Sized,
{
    let mut cursor = root.walk();
    let mut depth = 0usize;

    loop {
        let node = cursor.node();
        let descend = visitor.enter(node, SyntaxKind::of(&node)) == Walk::Continue;
        if descend && cursor.goto_first_child() {
            depth += 1;
            continue;
        }

        loop {
            if depth == 0 {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            cursor.goto_parent();
            depth -= 1;
        }
    }
}
