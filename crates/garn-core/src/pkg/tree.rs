//! The resolved dependency tree.

use serde::Serialize;

/// One package in the resolved tree.
///
/// The root denotes the project being installed and has an empty reference;
/// every other node carries a pinned reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    pub name: String,
    pub reference: String,
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    #[must_use]
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            children: Vec::new(),
        }
    }

    /// Whether this node is the project root rather than a fetched package.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.reference.is_empty()
    }

    /// Find a direct child by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&DependencyNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Number of nodes in this subtree, excluding `self`.
    #[must_use]
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    /// Visit every node in pre-order with its depth.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a DependencyNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a DependencyNode, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }

    /// Render as an indented `name@reference` listing.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |node, depth| {
            out.push_str(&"  ".repeat(depth));
            if node.is_root() {
                out.push_str(&node.name);
            } else {
                out.push_str(&format!("{}@{}", node.name, node.reference));
            }
            out.push('\n');
        });
        out
    }
}
