//! Method declarations: locating them in a tree and matching them across versions.
//!
//! A changed method is paired with the first pre-change method carrying the
//! same identifier. Parameters are ignored, so overloads collapse onto the
//! first declaration with that name.

use crate::hunks::LineRange;
use crate::treesitter::SyntaxTree;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use tree_sitter::Node;

/// A 0-based (row, column) position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    /// Human-facing `line:col`, both 1-based.
    pub fn one_based(self) -> String {
        format!("{}:{}", self.row + 1, self.column + 1)
    }
}

impl From<tree_sitter::Point> for Position {
    fn from(point: tree_sitter::Point) -> Self {
        Self {
            row: point.row,
            column: point.column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// A node handed to the locator or matcher broke the parser contract.
///
/// This is never returned for "nothing found"; that outcome is an empty
/// `Vec` or `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MethodError {
    #[error("`{kind}` node at {at} is anonymous syntax, not a named node")]
    UnnamedNode { kind: &'static str, at: Position },
    #[error("`{kind}` node at {at} is not a {grammar} method declaration")]
    NotAMethod {
        kind: &'static str,
        grammar: &'static str,
        at: Position,
    },
    #[error("method declaration at {at} has no identifier child")]
    MissingIdentifier { at: Position },
    #[error("method declaration at {at} has {count} identifier children")]
    AmbiguousIdentifier { at: Position, count: usize },
    #[error("identifier of the method declaration at {at} is not valid UTF-8")]
    NonUtf8Identifier { at: Position },
}

/// A method-declaration node together with its declared name.
///
/// Only [`MethodDeclaration::from_node`] builds one, so every instance is a
/// named node of a method kind with exactly one identifier child.
#[derive(Clone, Copy)]
pub struct MethodDeclaration<'t> {
    tree: &'t SyntaxTree,
    node: Node<'t>,
    name: &'t str,
}

impl<'t> MethodDeclaration<'t> {
    /// Check `node` against the method contract of the tree's grammar.
    pub fn from_node(tree: &'t SyntaxTree, node: Node<'t>) -> Result<Self, MethodError> {
        let at = Position::from(node.start_position());
        if !node.is_named() {
            return Err(MethodError::UnnamedNode {
                kind: node.kind(),
                at,
            });
        }
        let grammar = tree.grammar();
        if !grammar.is_method_kind(node.kind()) {
            return Err(MethodError::NotAMethod {
                kind: node.kind(),
                grammar: grammar.name(),
                at,
            });
        }

        let mut cursor = node.walk();
        let identifiers: Vec<Node<'t>> = node
            .children(&mut cursor)
            .filter(|child| grammar.is_name_kind(child.kind()) && !child.is_missing())
            .collect();
        let ident = match identifiers.as_slice() {
            [] => return Err(MethodError::MissingIdentifier { at }),
            [only] => *only,
            many => {
                return Err(MethodError::AmbiguousIdentifier {
                    at,
                    count: many.len(),
                });
            }
        };
        let name = tree
            .text(&ident)
            .ok_or(MethodError::NonUtf8Identifier { at })?;

        Ok(Self { tree, node, name })
    }

    pub fn name(&self) -> &'t str {
        self.name
    }

    pub fn node(&self) -> Node<'t> {
        self.node
    }

    pub fn start(&self) -> Position {
        self.node.start_position().into()
    }

    pub fn end(&self) -> Position {
        self.node.end_position().into()
    }

    /// Full declaration text, signature and body. Invalid UTF-8 sequences
    /// become U+FFFD, in which case the text is `Cow::Owned`.
    pub fn text(&self) -> Cow<'t, str> {
        let bytes = self.tree.source().get(self.node.byte_range()).unwrap_or_default();
        String::from_utf8_lossy(bytes)
    }

    /// The asymmetric boundary test: true when this method's first or last
    /// row lies inside `range`. A method that merely surrounds the range is
    /// not considered to overlap it.
    pub fn touches(&self, range: &LineRange) -> bool {
        touches_rows(&self.node, range)
    }
}

fn touches_rows(node: &Node<'_>, range: &LineRange) -> bool {
    range.contains_row(node.start_position().row) || range.contains_row(node.end_position().row)
}

impl PartialEq for MethodDeclaration<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.name == other.name
    }
}

impl Eq for MethodDeclaration<'_> {}

impl fmt::Debug for MethodDeclaration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDeclaration")
            .field("name", &self.name)
            .field("kind", &self.node.kind())
            .field("start", &self.start())
            .field("end", &self.end())
            .finish()
    }
}

/// Every method declaration in traversal order.
pub fn collect_all_methods(tree: &SyntaxTree) -> Result<Vec<MethodDeclaration<'_>>, MethodError> {
    let grammar = tree.grammar();
    tree.preorder()
        .filter(|node| node.is_named() && grammar.is_method_kind(node.kind()))
        .map(|node| MethodDeclaration::from_node(tree, node))
        .collect()
}

/// Method declarations whose start or end row falls inside any of `ranges`,
/// in traversal order.
pub fn collect_methods_in_ranges<'t>(
    tree: &'t SyntaxTree,
    ranges: &[LineRange],
) -> Result<Vec<MethodDeclaration<'t>>, MethodError> {
    if ranges.is_empty() {
        return Ok(Vec::new());
    }
    let grammar = tree.grammar();
    tree.preorder()
        .filter(|node| node.is_named() && grammar.is_method_kind(node.kind()))
        .filter(|node| ranges.iter().any(|r| touches_rows(node, r)))
        .map(|node| MethodDeclaration::from_node(tree, node))
        .collect()
}

/// First pre-change method whose identifier is byte-equal to `post`'s.
pub fn find_pre_change_match<'a, 't>(
    post: &MethodDeclaration<'_>,
    pre_methods: &'a [MethodDeclaration<'t>],
) -> Option<&'a MethodDeclaration<'t>> {
    pre_methods.iter().find(|pre| pre.name() == post.name())
}
