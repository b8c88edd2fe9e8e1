//! Tree-sitter integration: an explicit syntax tree provider and pre-order traversal.

use crate::languages::Grammar;
use std::fmt;
use tree_sitter::{Node, TreeCursor};

/// Errors from building a provider or parsing a buffer.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to load the {grammar} grammar: {reason}")]
    Grammar {
        grammar: &'static str,
        reason: String,
    },
    #[error("tree-sitter produced no tree for {grammar} source")]
    NoTree { grammar: &'static str },
}

/// Parses source buffers with one fixed grammar.
///
/// Construct once and share: the provider holds no parser state, every
/// [`parse`](Self::parse) call gets a fresh `tree_sitter::Parser`, so a single
/// instance can be used from several threads.
#[derive(Clone)]
pub struct SyntaxTreeProvider {
    grammar: Grammar,
    language: tree_sitter::Language,
}

impl SyntaxTreeProvider {
    /// Load the grammar. Fails if the compiled grammar is incompatible with
    /// the linked tree-sitter runtime.
    pub fn new(grammar: Grammar) -> Result<Self, ParseError> {
        let language = grammar.ts_language();
        new_parser(grammar, &language)?;
        Ok(Self { grammar, language })
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Parse a source buffer. Syntax errors in the input still yield a tree;
    /// tree-sitter recovers and marks the damaged region with `ERROR` nodes.
    pub fn parse(&self, source: &[u8]) -> Result<SyntaxTree, ParseError> {
        let mut parser = new_parser(self.grammar, &self.language)?;
        let tree = parser.parse(source, None).ok_or(ParseError::NoTree {
            grammar: self.grammar.name(),
        })?;
        Ok(SyntaxTree {
            grammar: self.grammar,
            source: source.to_vec(),
            tree,
        })
    }
}

impl fmt::Debug for SyntaxTreeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTreeProvider")
            .field("grammar", &self.grammar)
            .finish()
    }
}

fn new_parser(
    grammar: Grammar,
    language: &tree_sitter::Language,
) -> Result<tree_sitter::Parser, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(language)
        .map_err(|e| ParseError::Grammar {
            grammar: grammar.name(),
            reason: e.to_string(),
        })?;
    Ok(parser)
}

/// A parsed file: the immutable tree plus the bytes it was parsed from.
pub struct SyntaxTree {
    grammar: Grammar,
    source: Vec<u8>,
    tree: tree_sitter::Tree,
}

impl SyntaxTree {
    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Whether tree-sitter had to recover from syntax errors anywhere.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Source text covered by `node`, or `None` if it is not valid UTF-8.
    pub fn text(&self, node: &Node<'_>) -> Option<&str> {
        self.source
            .get(node.byte_range())
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Depth-first pre-order walk over every node, named or anonymous.
    ///
    /// Each call starts a new walk from the root.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            cursor: self.tree.walk(),
            finished: false,
        }
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("grammar", &self.grammar)
            .field("bytes", &self.source.len())
            .field("root", &self.tree.root_node().kind())
            .finish()
    }
}

/// Iterator returned by [`SyntaxTree::preorder`].
pub struct Preorder<'t> {
    cursor: TreeCursor<'t>,
    finished: bool,
}

impl<'t> Iterator for Preorder<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let node = self.cursor.node();

        if !self.cursor.goto_first_child() {
            loop {
                if self.cursor.goto_next_sibling() {
                    break;
                }
                if !self.cursor.goto_parent() {
                    self.finished = true;
                    break;
                }
            }
        }

        Some(node)
    }
}
