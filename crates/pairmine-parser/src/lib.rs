//! Tree-sitter based method location for commit mining.
//!
//! Parses pre- and post-change versions of a source file, finds the method
//! declarations touched by a diff's hunks, and pairs each of them with its
//! pre-change counterpart by declared name.

pub mod hunks;
pub mod languages;
pub mod methods;
pub mod treesitter;

pub use hunks::{LineRange, extract_post_change_ranges};
pub use languages::Grammar;
pub use methods::{
    MethodDeclaration, MethodError, Position, collect_all_methods, collect_methods_in_ranges,
    find_pre_change_match,
};
pub use treesitter::{ParseError, SyntaxTree, SyntaxTreeProvider};
